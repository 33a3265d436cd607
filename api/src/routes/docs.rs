//! `POST /loaddocs` and `POST /getdocs`: index health check and the
//! per-user document listing.

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::Response};
use serde::{Deserialize, Serialize};
use tokio::task;
use tracing::instrument;

use vector_store::VectorIndex;

use crate::core::app_state::AppState;
use crate::core::http::response_envelope::ApiResponse;
use crate::error_handler::AppError;

#[derive(Deserialize)]
pub struct LoadDocsRequest {
    pub user_id: String,
    pub file_name: String,
}

#[derive(Serialize)]
pub struct LoadDocsResponse {
    pub file_name: String,
    pub records: usize,
    pub embedder: String,
}

/// Resolves a document's index and verifies it loads cleanly.
///
/// A corrupt or missing index surfaces here rather than on the first
/// question asked against it.
#[instrument(skip_all, fields(user_id = %req.user_id))]
pub async fn load_docs(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoadDocsRequest>,
) -> Result<Response, AppError> {
    let vector_path = state
        .registry
        .resolve_vector_path(&req.user_id, &req.file_name)
        .await
        .ok_or(AppError::DocumentNotFound)?;

    let index = task::spawn_blocking(move || VectorIndex::load(&vector_path))
        .await
        .map_err(|e| AppError::Io(std::io::Error::other(e)))??;

    let body = LoadDocsResponse {
        file_name: req.file_name,
        records: index.len(),
        embedder: index.meta().embedder.clone(),
    };
    Ok(ApiResponse::success(body).into_response_with_status(StatusCode::OK))
}

#[derive(Deserialize)]
pub struct GetDocsRequest {
    pub user_id: String,
}

#[derive(Serialize)]
pub struct GetDocsResponse {
    pub files: Vec<String>,
}

#[instrument(skip_all, fields(user_id = %req.user_id))]
pub async fn get_docs(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GetDocsRequest>,
) -> Result<Response, AppError> {
    let files = state.registry.list_files(&req.user_id).await;
    let body = GetDocsResponse { files };
    Ok(ApiResponse::success(body).into_response_with_status(StatusCode::OK))
}
