//! `POST /ask`: answer a question, grounded in an uploaded document when
//! one is named, direct to the model otherwise.

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::Response};
use serde::{Deserialize, Serialize};
use tokio::task;
use tracing::{debug, instrument};

use vector_store::VectorIndex;

use crate::core::app_state::AppState;
use crate::core::http::response_envelope::ApiResponse;
use crate::error_handler::AppError;

/// Longest source excerpt echoed back per hit.
const SOURCE_PREVIEW_CHARS: usize = 240;

#[derive(Deserialize)]
pub struct AskRequest {
    pub user_id: String,
    pub question: String,
    /// When present, the answer is grounded in this document's index.
    #[serde(default)]
    pub file_name: Option<String>,
}

#[derive(Serialize)]
pub struct AskResponse {
    pub answer: String,
    pub sources: Vec<SourcePreview>,
}

/// A retrieved chunk, trimmed for the response body.
#[derive(Serialize)]
pub struct SourcePreview {
    pub preview: String,
    pub source_offset: usize,
    pub score: f32,
}

#[instrument(skip_all, fields(user_id = %req.user_id))]
pub async fn ask_question(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AskRequest>,
) -> Result<Response, AppError> {
    if req.question.trim().is_empty() {
        return Err(AppError::BadRequest("question must not be empty".into()));
    }

    let index = match &req.file_name {
        Some(file_name) => {
            let vector_path = state
                .registry
                .resolve_vector_path(&req.user_id, file_name)
                .await
                .ok_or(AppError::DocumentNotFound)?;
            let index = task::spawn_blocking(move || VectorIndex::load(&vector_path))
                .await
                .map_err(|e| AppError::Io(std::io::Error::other(e)))??;
            debug!("ask: loaded index with {} records", index.len());
            Some(index)
        }
        None => None,
    };

    let answer = answerer::answer(
        index.as_ref(),
        &state.embedder,
        &*state.llm,
        &req.question,
    )
    .await?;

    let sources = answer
        .source_chunks
        .iter()
        .map(|hit| SourcePreview {
            preview: preview(&hit.chunk.text),
            source_offset: hit.chunk.source_offset,
            score: hit.score,
        })
        .collect();

    let body = AskResponse {
        answer: answer.text,
        sources,
    };
    Ok(ApiResponse::success(body).into_response_with_status(StatusCode::OK))
}

fn preview(text: &str) -> String {
    if text.chars().count() <= SOURCE_PREVIEW_CHARS {
        return text.to_string();
    }
    text.chars().take(SOURCE_PREVIEW_CHARS).collect()
}
