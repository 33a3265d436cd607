//! Embedding provider seam.
//!
//! The index never talks to a model backend directly; it goes through
//! [`EmbeddingsProvider`]. The production implementation wraps the
//! `llm-gateway` client; tests plug in a deterministic in-process double.

use std::sync::Arc;
use std::{future::Future, pin::Pin};

use llm_gateway::LlmClient;

use crate::errors::IndexError;

/// Asynchronous embedding provider.
///
/// The same provider (same model and configuration) must be used at build
/// time and at query time; [`EmbeddingsProvider::fingerprint`] is stored in
/// the index metadata to enforce that.
pub trait EmbeddingsProvider: Send + Sync {
    /// Embeds a single text into a fixed-dimension vector.
    fn embed<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<f32>, IndexError>> + Send + 'a>>;

    /// Stable identifier of the embedding space (provider + model).
    fn fingerprint(&self) -> String;
}

/// Production provider backed by the LLM gateway's embedding profile.
#[derive(Clone)]
pub struct GatewayEmbedder {
    svc: Arc<LlmClient>,
    /// Expected embedding dimension; `None` accepts whatever the model returns.
    dim: Option<usize>,
}

impl GatewayEmbedder {
    pub fn new(svc: Arc<LlmClient>, dim: Option<usize>) -> Self {
        Self { svc, dim }
    }
}

impl EmbeddingsProvider for GatewayEmbedder {
    fn embed<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<f32>, IndexError>> + Send + 'a>> {
        Box::pin(async move {
            let v = self
                .svc
                .embed(text)
                .await
                .map_err(|e| IndexError::Embedding(e.to_string()))?;

            if let Some(want) = self.dim {
                if v.len() != want {
                    return Err(IndexError::VectorSizeMismatch { got: v.len(), want });
                }
            }
            Ok(v)
        })
    }

    fn fingerprint(&self) -> String {
        self.svc.embedding_fingerprint()
    }
}
