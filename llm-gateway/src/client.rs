//! Provider-agnostic client holding the chat and embedding profiles.

use std::time::Duration;

use tracing::{info, warn};

use crate::config::{LlmModelConfig, LlmProvider};
use crate::errors::LlmError;
use crate::providers::{ollama::OllamaProvider, openai::OpenAiProvider};

/// Maximum attempts per capability call (initial try + bounded retries).
const MAX_ATTEMPTS: u32 = 3;
/// Base backoff between attempts; multiplied by the attempt number.
const RETRY_BACKOFF: Duration = Duration::from_millis(300);

enum Backend {
    Ollama(OllamaProvider),
    OpenAi(OpenAiProvider),
}

impl Backend {
    fn new(cfg: LlmModelConfig) -> Result<Self, LlmError> {
        match cfg.provider {
            LlmProvider::Ollama => Ok(Self::Ollama(OllamaProvider::new(cfg)?)),
            LlmProvider::OpenAi => Ok(Self::OpenAi(OpenAiProvider::new(cfg)?)),
        }
    }

    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        match self {
            Self::Ollama(p) => p.generate(prompt).await,
            Self::OpenAi(p) => p.generate(prompt).await,
        }
    }

    async fn embeddings(&self, input: &str) -> Result<Vec<f32>, LlmError> {
        match self {
            Self::Ollama(p) => p.embeddings(input).await,
            Self::OpenAi(p) => p.embeddings(input).await,
        }
    }
}

/// Shared LLM client with a **chat** profile and an **embedding** profile.
///
/// Construct once, wrap in `Arc`, pass clones of the `Arc` to dependents.
/// Both capabilities retry transient transport failures a bounded number of
/// times; after that the error is terminal for the request — never an
/// infinite retry loop.
pub struct LlmClient {
    chat: Backend,
    embedding: Backend,
    embedding_cfg: LlmModelConfig,
}

impl LlmClient {
    /// Builds a client from explicit profile configs.
    ///
    /// # Errors
    /// Returns [`LlmError`] if either provider client fails validation.
    pub fn new(
        chat_cfg: LlmModelConfig,
        embedding_cfg: LlmModelConfig,
    ) -> Result<Self, LlmError> {
        info!(
            chat = %chat_cfg.fingerprint(),
            embedding = %embedding_cfg.fingerprint(),
            "LlmClient initialized"
        );
        Ok(Self {
            chat: Backend::new(chat_cfg)?,
            embedding: Backend::new(embedding_cfg.clone())?,
            embedding_cfg,
        })
    }

    /// Builds a client from environment variables (see [`LlmModelConfig`]).
    pub fn from_env() -> Result<Self, LlmError> {
        let (chat, embedding) = LlmModelConfig::pair_from_env()?;
        Self::new(chat, embedding)
    }

    /// `generate(prompt) -> text` via the chat profile.
    ///
    /// # Errors
    /// Returns the last [`LlmError`] once retries are exhausted.
    pub async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        with_retry("generate", || self.chat.generate(prompt)).await
    }

    /// `embed(text) -> vector` via the embedding profile.
    ///
    /// Deterministic for a given input text (embedding temperature is
    /// pinned), which index reproducibility relies on.
    pub async fn embed(&self, input: &str) -> Result<Vec<f32>, LlmError> {
        with_retry("embed", || self.embedding.embeddings(input)).await
    }

    /// Identifier of the embedding space (provider + model); persisted in
    /// index metadata and compared on every retrieval.
    pub fn embedding_fingerprint(&self) -> String {
        self.embedding_cfg.fingerprint()
    }
}

/// Runs `op` up to [`MAX_ATTEMPTS`] times, backing off between attempts.
///
/// Only errors classified retryable by [`LlmError::is_retryable`] are
/// retried; everything else returns immediately.
async fn with_retry<T, F, Fut>(what: &str, mut op: F) -> Result<T, LlmError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, LlmError>>,
{
    let mut attempt = 1u32;
    loop {
        match op().await {
            Ok(v) => return Ok(v),
            Err(e) if e.is_retryable() && attempt < MAX_ATTEMPTS => {
                warn!("{what} attempt {attempt}/{MAX_ATTEMPTS} failed: {e}; retrying");
                tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn server_error() -> LlmError {
        LlmError::HttpStatus {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            url: "http://test".into(),
            snippet: String::new(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn retry_recovers_from_transient_failures() {
        let calls = AtomicU32::new(0);
        let out = with_retry("test", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 { Err(server_error()) } else { Ok("ok") }
            }
        })
        .await
        .unwrap();

        assert_eq!(out, "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_is_bounded() {
        let calls = AtomicU32::new(0);
        let res: Result<(), _> = with_retry("test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(server_error()) }
        })
        .await;

        assert!(res.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), MAX_ATTEMPTS);
    }

    #[tokio::test]
    async fn non_retryable_errors_fail_fast() {
        let calls = AtomicU32::new(0);
        let res: Result<(), _> = with_retry("test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(LlmError::Decode("broken".into())) }
        })
        .await;

        assert!(res.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
