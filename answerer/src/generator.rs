//! Generation capability seam.

use std::{future::Future, pin::Pin};

use llm_gateway::LlmClient;

use crate::error::AnswerError;

/// Asynchronous `generate(prompt) -> text` capability.
///
/// The production implementation is [`LlmClient`]; tests plug in scripted
/// doubles so answer and quiz logic can be exercised without a model.
pub trait TextGenerator: Send + Sync {
    fn generate<'a>(
        &'a self,
        prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String, AnswerError>> + Send + 'a>>;
}

impl TextGenerator for LlmClient {
    fn generate<'a>(
        &'a self,
        prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String, AnswerError>> + Send + 'a>> {
        Box::pin(async move { Ok(LlmClient::generate(self, prompt).await?) })
    }
}
