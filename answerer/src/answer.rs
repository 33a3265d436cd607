//! Answer synthesis: retrieve, ground, generate.

use serde::Serialize;
use tracing::{debug, info};
use vector_store::{DEFAULT_TOP_K, EmbeddingsProvider, ScoredChunk, VectorIndex, retrieve};

use crate::error::AnswerError;
use crate::generator::TextGenerator;
use crate::prompt;

/// A generated answer with optional source attribution.
#[derive(Debug, Serialize)]
pub struct Answer {
    pub text: String,
    /// Chunks the answer was grounded in; empty in the ungrounded fallback.
    pub source_chunks: Vec<ScoredChunk>,
}

/// Answers `question`, grounded in `index` when one is available.
///
/// With an index: top-k retrieval, strict grounding prompt, one generation
/// call, sources attached. Without an index (nothing indexed yet for this
/// session): a direct ungrounded generation call — a deliberate degraded
/// mode, not an error.
///
/// # Errors
/// - [`AnswerError::Index`] on retrieval failures (including embedder
///   mismatch).
/// - [`AnswerError::Generation`] if the generation capability fails; the
///   caller maps this to its transport, this function never panics.
pub async fn answer(
    index: Option<&VectorIndex>,
    embedder: &dyn EmbeddingsProvider,
    generator: &dyn TextGenerator,
    question: &str,
) -> Result<Answer, AnswerError> {
    let Some(index) = index else {
        info!("answer: no index available, ungrounded fallback");
        let text = generator.generate(question).await?;
        return Ok(Answer {
            text,
            source_chunks: Vec::new(),
        });
    };

    let hits = retrieve(index, embedder, question, DEFAULT_TOP_K).await?;
    debug!("answer: grounded with {} chunks", hits.len());

    let grounded_prompt = prompt::build_answer_prompt(question, &hits);
    let text = generator.generate(&grounded_prompt).await?;

    Ok(Answer {
        text,
        source_chunks: hits,
    })
}
