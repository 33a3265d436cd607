//! Retrieval: embed the question, search the index.

use tracing::{debug, trace};

use crate::embed::EmbeddingsProvider;
use crate::errors::IndexError;
use crate::index::VectorIndex;
use crate::record::ScoredChunk;

/// Default number of chunks fed to the answer prompt.
pub const DEFAULT_TOP_K: usize = 4;

/// Embeds `question` and returns the top-k most similar chunks.
///
/// The provider must be the one the index was built with; the persisted
/// fingerprint is checked first, because a mismatched embedding space does
/// not error on its own — it silently degrades retrieval quality.
///
/// # Errors
/// - [`IndexError::EmbedderMismatch`] on fingerprint disagreement.
/// - [`IndexError::Embedding`] if the query embedding fails.
pub async fn retrieve(
    index: &VectorIndex,
    provider: &dyn EmbeddingsProvider,
    question: &str,
    k: usize,
) -> Result<Vec<ScoredChunk>, IndexError> {
    trace!("retrieve k={} question_len={}", k, question.len());

    let active = provider.fingerprint();
    if active != index.meta().embedder {
        return Err(IndexError::EmbedderMismatch {
            stored: index.meta().embedder.clone(),
            active,
        });
    }

    let qv = provider.embed(question).await?;
    let hits = index.search(&qv, k);
    debug!("retrieve hits={}", hits.len());
    Ok(hits)
}
