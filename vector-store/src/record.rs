//! Core data models used by the index.

use doc_ingest::Chunk;
use serde::{Deserialize, Serialize};

/// One (embedding, chunk) pair, persisted as a JSONL row.
///
/// Records keep the chunk order from ingestion; the Nth record's embedding
/// belongs to the Nth chunk.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IndexRecord {
    pub chunk: Chunk,
    pub embedding: Vec<f32>,
}

/// A single retrieval hit: the chunk plus its cosine similarity score.
#[derive(Clone, Debug, Serialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}
