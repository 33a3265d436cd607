//! Unified error types for the crate.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error for vector index operations.
#[derive(Debug, Error)]
pub enum IndexError {
    /// I/O or filesystem errors.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// No index exists at the given path.
    #[error("index not found: {0}")]
    NotFound(PathBuf),

    /// The on-disk index failed deserialization or a consistency check.
    #[error("index corrupt: {0}")]
    Corrupt(String),

    /// The embedding capability failed while building or querying.
    #[error("embedding error: {0}")]
    Embedding(String),

    /// Mismatch in vector dimensionality across records.
    #[error("vector size mismatch: got {got}, want {want}")]
    VectorSizeMismatch { got: usize, want: usize },

    /// The index was built with a different embedding provider/model than
    /// the one querying it.
    #[error("embedder mismatch: index built with `{stored}`, querying with `{active}`")]
    EmbedderMismatch { stored: String, active: String },
}
