//! Document ingestion: format dispatch, text extraction, and chunking.
//!
//! This crate turns an uploaded file into an ordered sequence of [`Chunk`]s:
//! - [`DocumentFormat`] is a closed set of supported formats (PDF, DOCX);
//!   anything else fails fast with [`IngestError::UnsupportedFormat`] before
//!   any chunking is attempted.
//! - [`extract_text`] / [`load_document`] produce plain text per format.
//! - [`split_text`] cuts the text into fixed-size overlapping chunks that
//!   preserve source order and provenance.

mod chunker;
mod errors;
mod loader;

pub use chunker::{Chunk, ChunkingConfig, split_text};
pub use errors::IngestError;
pub use loader::{DocumentFormat, extract_text, load_document};
