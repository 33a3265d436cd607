//! Application error type and the error → HTTP mapping.
//!
//! Every failure surfaces as `{success: false, error: {code, message}}` with
//! a distinguishable code; internal details stay in the logs.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::warn;

use crate::core::http::response_envelope::ApiResponse;

/// Public application error type.
#[derive(Debug, Error)]
pub enum AppError {
    // --- Request / routing ---
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("no document found for this user and file name")]
    DocumentNotFound,

    #[error("file already uploaded")]
    DuplicateUpload,

    /// The on-disk session registry failed to parse or serialize. Startup
    /// and persistence condition, not a client mistake.
    #[error("session registry corrupt: {0}")]
    RegistryCorrupt(String),

    // --- Core pipeline ---
    #[error(transparent)]
    Ingest(#[from] doc_ingest::IngestError),

    #[error(transparent)]
    Index(#[from] vector_store::IndexError),

    #[error(transparent)]
    Answer(#[from] answerer::AnswerError),

    // --- IO / server ---
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) | AppError::DuplicateUpload => StatusCode::BAD_REQUEST,
            AppError::DocumentNotFound => StatusCode::NOT_FOUND,
            AppError::RegistryCorrupt(_) => StatusCode::INTERNAL_SERVER_ERROR,

            AppError::Ingest(doc_ingest::IngestError::UnsupportedFormat(_)) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Ingest(doc_ingest::IngestError::EmptyDocument) => StatusCode::BAD_REQUEST,
            AppError::Ingest(_) => StatusCode::UNPROCESSABLE_ENTITY,

            AppError::Index(vector_store::IndexError::NotFound(_)) => StatusCode::NOT_FOUND,
            AppError::Index(vector_store::IndexError::Corrupt(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Index(vector_store::IndexError::EmbedderMismatch { .. }) => {
                StatusCode::CONFLICT
            }
            AppError::Index(_) => StatusCode::BAD_GATEWAY,

            AppError::Answer(answerer::AnswerError::Generation(_)) => StatusCode::BAD_GATEWAY,
            AppError::Answer(answerer::AnswerError::Index(e)) => match e {
                vector_store::IndexError::NotFound(_) => StatusCode::NOT_FOUND,
                vector_store::IndexError::EmbedderMismatch { .. } => StatusCode::CONFLICT,
                _ => StatusCode::BAD_GATEWAY,
            },

            AppError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::DocumentNotFound => "DOC_NOT_FOUND",
            AppError::DuplicateUpload => "DUPLICATE_UPLOAD",
            AppError::RegistryCorrupt(_) => "REGISTRY_CORRUPT",

            AppError::Ingest(doc_ingest::IngestError::UnsupportedFormat(_)) => {
                "UNSUPPORTED_FORMAT"
            }
            AppError::Ingest(_) => "EXTRACTION_ERROR",

            AppError::Index(vector_store::IndexError::NotFound(_)) => "INDEX_NOT_FOUND",
            AppError::Index(vector_store::IndexError::Corrupt(_)) => "INDEX_CORRUPT",
            AppError::Index(vector_store::IndexError::EmbedderMismatch { .. }) => {
                "EMBEDDER_MISMATCH"
            }
            AppError::Index(_) => "EMBEDDING_ERROR",

            AppError::Answer(answerer::AnswerError::Generation(_)) => "GENERATION_ERROR",
            AppError::Answer(answerer::AnswerError::Index(e)) => match e {
                vector_store::IndexError::NotFound(_) => "INDEX_NOT_FOUND",
                vector_store::IndexError::EmbedderMismatch { .. } => "EMBEDDER_MISMATCH",
                _ => "EMBEDDING_ERROR",
            },

            AppError::Io(_) => "IO_ERROR",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();
        warn!("request failed: {code} ({status}): {self}");
        ApiResponse::<()>::error(code, self.to_string()).into_response_with_status(status)
    }
}
