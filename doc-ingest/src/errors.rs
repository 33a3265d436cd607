//! Unified error type for document ingestion.

use thiserror::Error;

/// Top-level error for loading and chunking documents.
#[derive(Debug, Error)]
pub enum IngestError {
    /// File extension is not one of the supported formats.
    #[error("unsupported document format: {0}")]
    UnsupportedFormat(String),

    /// I/O or filesystem errors while reading the uploaded file.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// PDF text extraction failed.
    #[error("pdf extraction error: {0}")]
    Pdf(String),

    /// DOCX archive or XML parsing failed.
    #[error("docx extraction error: {0}")]
    Docx(String),

    /// The file parsed but contained no extractable text.
    #[error("document contains no extractable text")]
    EmptyDocument,
}
