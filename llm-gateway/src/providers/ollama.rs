//! Thin client for the local Ollama API.
//!
//! - `POST {endpoint}/api/generate`   — non-streaming text generation
//! - `POST {endpoint}/api/embeddings` — embeddings retrieval

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::config::LlmModelConfig;
use crate::errors::LlmError;

pub struct OllamaProvider {
    client: reqwest::Client,
    cfg: LlmModelConfig,
    url_generate: String,
    url_embeddings: String,
}

impl OllamaProvider {
    /// # Errors
    /// Returns [`LlmError::Transport`] if the HTTP client cannot be built.
    pub fn new(cfg: LlmModelConfig) -> Result<Self, LlmError> {
        let timeout = cfg
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or_else(|| Duration::from_secs(60));

        let client = reqwest::Client::builder().timeout(timeout).build()?;

        let base = cfg.endpoint.trim_end_matches('/').to_string();
        let url_generate = format!("{base}/api/generate");
        let url_embeddings = format!("{base}/api/embeddings");

        Ok(Self {
            client,
            cfg,
            url_generate,
            url_embeddings,
        })
    }

    /// Non-streaming generation via `/api/generate`.
    ///
    /// # Errors
    /// [`LlmError::HttpStatus`] for non-2xx responses, [`LlmError::Decode`]
    /// if the body cannot be parsed.
    #[instrument(skip_all, fields(model = %self.cfg.model))]
    pub async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let body = GenerateRequest {
            model: &self.cfg.model,
            prompt,
            stream: false,
            options: Some(GenerateOptions {
                temperature: self.cfg.temperature,
                num_predict: self.cfg.max_tokens,
            }),
        };

        debug!("POST {}", self.url_generate);
        let resp = self
            .client
            .post(&self.url_generate)
            .json(&body)
            .send()
            .await?;

        let resp = check_status(resp, &self.url_generate).await?;
        let out: GenerateResponse = resp.json().await.map_err(|e| {
            LlmError::Decode(format!("serde error: {e}; ensure stream=false is used"))
        })?;

        Ok(out.response)
    }

    /// Embeddings via `/api/embeddings`.
    #[instrument(skip_all, fields(model = %self.cfg.model))]
    pub async fn embeddings(&self, input: &str) -> Result<Vec<f32>, LlmError> {
        let body = EmbeddingsRequest {
            model: &self.cfg.model,
            prompt: input,
        };

        debug!("POST {}", self.url_embeddings);
        let resp = self
            .client
            .post(&self.url_embeddings)
            .json(&body)
            .send()
            .await?;

        let resp = check_status(resp, &self.url_embeddings).await?;
        let out: EmbeddingsResponse = resp
            .json()
            .await
            .map_err(|e| LlmError::Decode(format!("serde error: {e}; expected {{ embedding: number[] }}")))?;

        Ok(out.embedding)
    }
}

async fn check_status(resp: reqwest::Response, url: &str) -> Result<reqwest::Response, LlmError> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status();
    let text = resp.text().await.unwrap_or_default();
    let snippet = text.chars().take(240).collect::<String>();
    Err(LlmError::HttpStatus {
        status,
        url: url.to_string(),
        snippet,
    })
}

/* ==========================
HTTP payloads & options
========================== */

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<GenerateOptions>,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    embedding: Vec<f32>,
}
