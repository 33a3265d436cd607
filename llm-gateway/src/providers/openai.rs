//! Minimal non-streaming client for the OpenAI REST API.
//!
//! - `POST {endpoint}/v1/chat/completions` — chat completion
//! - `POST {endpoint}/v1/embeddings`       — embeddings retrieval
//!
//! Constructor validation: the API key must be present and the endpoint must
//! use an http/https scheme.

use std::time::Duration;

use reqwest::header;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::config::LlmModelConfig;
use crate::errors::{ConfigError, LlmError};

pub struct OpenAiProvider {
    client: reqwest::Client,
    cfg: LlmModelConfig,
    url_chat: String,
    url_embeddings: String,
}

impl OpenAiProvider {
    /// # Errors
    /// - [`ConfigError::MissingApiKey`] if no key is configured.
    /// - [`LlmError::Transport`] if the HTTP client cannot be built.
    pub fn new(cfg: LlmModelConfig) -> Result<Self, LlmError> {
        let api_key = cfg
            .api_key
            .clone()
            .ok_or(ConfigError::MissingApiKey)?;

        let timeout = cfg
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or_else(|| Duration::from_secs(60));

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bearer {api_key}"))
                .map_err(|e| LlmError::Decode(format!("invalid API key header: {e}")))?,
        );
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        let base = cfg.endpoint.trim_end_matches('/').to_string();
        let url_chat = format!("{base}/v1/chat/completions");
        let url_embeddings = format!("{base}/v1/embeddings");

        Ok(Self {
            client,
            cfg,
            url_chat,
            url_embeddings,
        })
    }

    /// Non-streaming chat completion.
    ///
    /// # Errors
    /// [`LlmError::HttpStatus`] for non-2xx responses, [`LlmError::Decode`]
    /// on unparseable or empty-choice replies.
    #[instrument(skip_all, fields(model = %self.cfg.model))]
    pub async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let body = ChatRequest {
            model: &self.cfg.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.cfg.temperature,
            max_tokens: self.cfg.max_tokens,
        };

        debug!("POST {}", self.url_chat);
        let resp = self.client.post(&self.url_chat).json(&body).send().await?;
        let resp = check_status(resp, &self.url_chat).await?;

        let out: ChatResponse = resp
            .json()
            .await
            .map_err(|e| LlmError::Decode(format!("serde error: {e}")))?;

        out.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| LlmError::Decode("no choices in completion response".into()))
    }

    /// Single embeddings vector retrieval.
    #[instrument(skip_all, fields(model = %self.cfg.model))]
    pub async fn embeddings(&self, input: &str) -> Result<Vec<f32>, LlmError> {
        let body = EmbeddingsRequest {
            model: &self.cfg.model,
            input,
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
            .map_err(|e| LlmError::Decode(format!("serde error: {e}")))?;

        out.data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| LlmError::Decode("no data in embeddings response".into()))
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
HTTP payloads
========================== */

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingsDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsDatum {
    embedding: Vec<f32>,
}
