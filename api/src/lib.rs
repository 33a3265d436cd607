//! HTTP layer: routing, shared state, and the session registry.
//!
//! Core semantics (chunking, indexing, retrieval, answering) live in the
//! member crates; this crate only parses requests, drives the pipeline and
//! maps errors to a stable JSON envelope.

use std::{env, error::Error, sync::Arc};

mod core;
mod error_handler;
mod registry;
mod routes;

use axum::{Router, routing::post};
use tokio::signal;
use tracing::info;

use crate::core::app_state::AppState;
use crate::routes::{
    ask::ask_question,
    docs::{get_docs, load_docs},
    upload::upload_document,
};

pub use crate::registry::{SessionRecord, SessionRegistry};

/// Binds the listener and serves until ctrl-c.
///
/// `API_ADDRESS` (e.g. `127.0.0.1:8080`) must be set in the environment.
pub async fn start() -> Result<(), Box<dyn Error>> {
    let host_url = env::var("API_ADDRESS").expect("API_ADDRESS must be set in environment");

    let state = Arc::new(AppState::from_env()?);

    let app = Router::new()
        .route("/upload", post(upload_document))
        .route("/ask", post(ask_question))
        .route("/loaddocs", post(load_docs))
        .route("/getdocs", post(get_docs))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&host_url).await?;
    info!("listening on {host_url}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Returns a future that resolves when Ctrl+C is pressed.
async fn shutdown_signal() {
    signal::ctrl_c()
        .await
        .expect("Failed to listen for shutdown signal");
}
