//! Fixed-size overlapping chunker.
//!
//! Windows are measured in characters and aligned to char boundaries, so
//! multi-byte text never splits mid-codepoint. Consecutive chunks overlap by
//! a configured amount: the duplication is intentional, it preserves context
//! across chunk boundaries for retrieval.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// A bounded contiguous slice of document text with provenance.
///
/// Immutable once created; `source_offset` is the character offset of the
/// chunk start within the extracted document text.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    pub text: String,
    pub source_offset: usize,
    pub source_doc_id: String,
}

/// Chunk window geometry.
#[derive(Clone, Copy, Debug)]
pub struct ChunkingConfig {
    /// Maximum chunk length in characters.
    pub chunk_size: usize,
    /// Characters shared between consecutive chunks.
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            overlap: 100,
        }
    }
}

/// Splits `text` into ordered overlapping chunks.
///
/// Guarantees:
/// - The chunks cover the entire input with no gaps; every chunk except the
///   first starts at `previous_end - overlap`.
/// - No chunk exceeds `chunk_size` characters.
/// - Input shorter than `chunk_size` yields exactly one chunk equal to the
///   whole input; empty input yields no chunks.
///
/// An `overlap >= chunk_size` would stall the window, so the forward step is
/// clamped to at least one character.
pub fn split_text(text: &str, doc_id: &str, cfg: &ChunkingConfig) -> Vec<Chunk> {
    if text.is_empty() || cfg.chunk_size == 0 {
        trace!("split_text: empty input or zero chunk_size; nothing to do");
        return Vec::new();
    }

    // Byte offset of every char boundary, plus the end of the string, so we
    // can slice windows by character counts.
    let bounds: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let total_chars = bounds.len() - 1;

    let step = cfg.chunk_size.saturating_sub(cfg.overlap).max(1);

    let mut out = Vec::new();
    let mut start = 0usize;
    loop {
        let end = (start + cfg.chunk_size).min(total_chars);
        out.push(Chunk {
            text: text[bounds[start]..bounds[end]].to_string(),
            source_offset: start,
            source_doc_id: doc_id.to_string(),
        });

        if end == total_chars {
            break;
        }
        start += step;
    }

    debug!(
        "split_text: {} chars -> {} chunks (size={}, overlap={})",
        total_chars,
        out.len(),
        cfg.chunk_size,
        cfg.overlap
    );
    out
}
