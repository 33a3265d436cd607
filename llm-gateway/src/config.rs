//! Model configs loaded strictly from environment variables.
//!
//! Two roles are wired:
//! - **chat**      → answer/quiz generation
//! - **embedding** → vector generation for the index
//!
//! # Environment variables
//!
//! Common:
//! - `LLM_KIND`       = provider kind (`ollama` | `openai`), default `ollama`
//! - `LLM_MAX_TOKENS` = optional max tokens (u32)
//!
//! Ollama:
//! - `OLLAMA_URL` or `OLLAMA_PORT` = endpoint (mandatory)
//! - `OLLAMA_MODEL`                = chat model (mandatory)
//! - `EMBEDDING_MODEL`             = embedding model (mandatory)
//!
//! OpenAI:
//! - `OPENAI_API_KEY`         (mandatory)
//! - `OPENAI_URL`             (default `https://api.openai.com`)
//! - `OPENAI_MODEL`           = chat model (mandatory)
//! - `OPENAI_EMBEDDING_MODEL` = embedding model (mandatory)

use crate::errors::{ConfigError, env_opt_u32, must_env, validate_http_endpoint};

/// The provider (backend) used for LLM inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LlmProvider {
    /// Local Ollama runtime.
    Ollama,
    /// OpenAI REST API.
    OpenAi,
}

impl LlmProvider {
    /// Lowercase wire/env name, also used in index fingerprints.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ollama => "ollama",
            Self::OpenAi => "openai",
        }
    }

    fn from_env_kind(kind: &str) -> Result<Self, ConfigError> {
        match kind.trim().to_ascii_lowercase().as_str() {
            "" | "ollama" => Ok(Self::Ollama),
            "openai" | "chatgpt" => Ok(Self::OpenAi),
            other => Err(ConfigError::UnsupportedProvider(other.to_string())),
        }
    }
}

/// Configuration for one model role.
#[derive(Debug, Clone)]
pub struct LlmModelConfig {
    pub provider: LlmProvider,
    /// Model identifier (e.g. `"llama3"`, `"gpt-4o-mini"`).
    pub model: String,
    /// Inference endpoint base URL.
    pub endpoint: String,
    /// API key for providers that require authentication.
    pub api_key: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    /// Request timeout in seconds.
    pub timeout_secs: Option<u64>,
}

impl LlmModelConfig {
    /// Stable identifier of the embedding space this config produces.
    ///
    /// Persisted in index metadata; two configs with the same fingerprint
    /// are interchangeable for retrieval.
    pub fn fingerprint(&self) -> String {
        format!("{}/{}", self.provider.as_str(), self.model)
    }

    /// Loads the `(chat, embedding)` profile pair from the environment.
    ///
    /// # Errors
    /// Returns [`ConfigError`] if a mandatory variable is missing or a value
    /// fails validation.
    pub fn pair_from_env() -> Result<(Self, Self), ConfigError> {
        let kind = std::env::var("LLM_KIND").unwrap_or_default();
        let provider = LlmProvider::from_env_kind(&kind)?;
        match provider {
            LlmProvider::Ollama => Ok((ollama_chat()?, ollama_embedding()?)),
            LlmProvider::OpenAi => Ok((openai_chat()?, openai_embedding()?)),
        }
    }
}

/// Resolves the Ollama endpoint strictly from environment.
///
/// Precedence: `OLLAMA_URL` if present, otherwise `OLLAMA_PORT` →
/// `http://localhost:{port}`.
fn ollama_endpoint() -> Result<String, ConfigError> {
    if let Ok(url) = std::env::var("OLLAMA_URL") {
        if !url.trim().is_empty() {
            validate_http_endpoint("OLLAMA_URL", &url)?;
            return Ok(url);
        }
    }
    if let Ok(port) = std::env::var("OLLAMA_PORT") {
        if !port.trim().is_empty() {
            let _ = port
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidNumber {
                    var: "OLLAMA_PORT",
                    reason: "expected u16 (1..=65535)",
                })?;
            return Ok(format!("http://localhost:{port}"));
        }
    }
    Err(ConfigError::MissingVar("OLLAMA_URL or OLLAMA_PORT"))
}

fn ollama_chat() -> Result<LlmModelConfig, ConfigError> {
    Ok(LlmModelConfig {
        provider: LlmProvider::Ollama,
        model: must_env("OLLAMA_MODEL")?,
        endpoint: ollama_endpoint()?,
        api_key: None,
        max_tokens: env_opt_u32("LLM_MAX_TOKENS")?,
        temperature: Some(0.5),
        timeout_secs: Some(120),
    })
}

fn ollama_embedding() -> Result<LlmModelConfig, ConfigError> {
    Ok(LlmModelConfig {
        provider: LlmProvider::Ollama,
        model: must_env("EMBEDDING_MODEL")?,
        endpoint: ollama_endpoint()?,
        api_key: None,
        max_tokens: None,
        // Deterministic: the same chunk text must always embed to the same
        // vector, index reproducibility depends on it.
        temperature: Some(0.0),
        timeout_secs: Some(30),
    })
}

fn openai_endpoint() -> Result<String, ConfigError> {
    let url =
        std::env::var("OPENAI_URL").unwrap_or_else(|_| "https://api.openai.com".to_string());
    validate_http_endpoint("OPENAI_URL", &url)?;
    Ok(url)
}

fn openai_chat() -> Result<LlmModelConfig, ConfigError> {
    Ok(LlmModelConfig {
        provider: LlmProvider::OpenAi,
        model: must_env("OPENAI_MODEL")?,
        endpoint: openai_endpoint()?,
        api_key: Some(must_env("OPENAI_API_KEY")?),
        max_tokens: env_opt_u32("LLM_MAX_TOKENS")?,
        temperature: Some(0.5),
        timeout_secs: Some(120),
    })
}

fn openai_embedding() -> Result<LlmModelConfig, ConfigError> {
    Ok(LlmModelConfig {
        provider: LlmProvider::OpenAi,
        model: must_env("OPENAI_EMBEDDING_MODEL")?,
        endpoint: openai_endpoint()?,
        api_key: Some(must_env("OPENAI_API_KEY")?),
        max_tokens: None,
        temperature: None,
        timeout_secs: Some(30),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_kind_parsing() {
        assert_eq!(LlmProvider::from_env_kind("ollama").unwrap(), LlmProvider::Ollama);
        assert_eq!(LlmProvider::from_env_kind("").unwrap(), LlmProvider::Ollama);
        assert_eq!(LlmProvider::from_env_kind("OpenAI").unwrap(), LlmProvider::OpenAi);
        assert!(LlmProvider::from_env_kind("bedrock").is_err());
    }

    #[test]
    fn fingerprint_is_provider_and_model() {
        let cfg = LlmModelConfig {
            provider: LlmProvider::Ollama,
            model: "nomic-embed-text".into(),
            endpoint: "http://localhost:11434".into(),
            api_key: None,
            max_tokens: None,
            temperature: Some(0.0),
            timeout_secs: Some(30),
        };
        assert_eq!(cfg.fingerprint(), "ollama/nomic-embed-text");
    }
}
