//! Typed error for the answerer crate.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnswerError {
    /// Errors from the underlying vector store (retrieval, embedder
    /// mismatch, corrupt index).
    #[error("index error: {0}")]
    Index(#[from] vector_store::IndexError),

    /// The generation capability failed (timeout, quota, transport,
    /// malformed response).
    #[error("generation error: {0}")]
    Generation(#[from] llm_gateway::LlmError),
}
