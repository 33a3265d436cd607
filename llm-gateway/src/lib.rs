//! Pluggable LLM capability: `generate(prompt) -> text` and
//! `embed(text) -> vector`.
//!
//! Two provider backends are supported (Ollama and OpenAI) behind a single
//! [`LlmClient`] holding a **chat** profile and an **embedding** profile.
//! Construct once from environment variables, wrap in `Arc`, pass clones to
//! dependents. Transient transport failures are retried a bounded number of
//! times; a capability failure after that is terminal for the request.

mod client;
mod config;
mod errors;
mod providers;

pub use client::LlmClient;
pub use config::{LlmModelConfig, LlmProvider};
pub use errors::{ConfigError, LlmError};
