//! Index lifecycle: build, save, load, search.
//!
//! On-disk layout is a directory per document:
//! - `meta.json`    — [`IndexMeta`]: format version, embedder fingerprint,
//!   dimension, record count, creation time.
//! - `records.jsonl` — one [`IndexRecord`] per line, in insertion order.
//!
//! Saves are atomic at the directory level: the new index is fully written
//! under a temporary sibling name and then renamed into place, so a reader
//! sees either the previous complete index or the new complete one.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use doc_ingest::Chunk;
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::embed::EmbeddingsProvider;
use crate::errors::IndexError;
use crate::record::{IndexRecord, ScoredChunk};

/// Current on-disk format version.
const FORMAT_VERSION: u32 = 1;

/// Concurrent embedding calls during build. Ordering is preserved
/// regardless of this value.
const EMBED_CONCURRENCY: usize = 8;

/// Grace period before an index path is declared missing. A save replacing
/// an existing index swaps directories with two renames; a reader can land
/// in the instant between them.
const SWAP_RETRY_DELAY: Duration = Duration::from_millis(50);

const META_FILE: &str = "meta.json";
const RECORDS_FILE: &str = "records.jsonl";

/// Metadata persisted beside the records.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IndexMeta {
    pub format_version: u32,
    /// Fingerprint of the embedding provider/model the index was built with.
    pub embedder: String,
    /// Embedding dimensionality (0 for an empty index).
    pub dim: usize,
    pub records: usize,
    pub created_at: DateTime<Utc>,
}

/// Nearest-neighbor-searchable structure over chunk embeddings.
///
/// Owns its embeddings and records exclusively; chunks are never mutated
/// after creation.
#[derive(Debug)]
pub struct VectorIndex {
    meta: IndexMeta,
    records: Vec<IndexRecord>,
}

impl VectorIndex {
    /// Embeds every chunk and constructs the search structure.
    ///
    /// Embedding calls run with bounded concurrency but results are
    /// collected in order: the Nth embedding belongs to the Nth chunk.
    ///
    /// # Errors
    /// - [`IndexError::Embedding`] if any embedding call fails; nothing is
    ///   persisted in that case.
    /// - [`IndexError::VectorSizeMismatch`] if the provider returns vectors
    ///   of differing dimensions.
    pub async fn build(
        chunks: Vec<Chunk>,
        provider: &dyn EmbeddingsProvider,
    ) -> Result<Self, IndexError> {
        info!("VectorIndex::build chunks={}", chunks.len());

        // Futures are created eagerly (nothing runs until polled) so the
        // borrowing closure stays out of the async state machine; otherwise
        // rustc rejects handler futures built on this with "implementation
        // of `FnOnce` is not general enough".
        let embed_calls: Vec<_> = chunks.iter().map(|c| provider.embed(&c.text)).collect();
        let embeddings: Vec<Vec<f32>> = stream::iter(embed_calls)
            .buffered(EMBED_CONCURRENCY)
            .try_collect()
            .await?;

        let dim = embeddings.first().map_or(0, Vec::len);
        for v in &embeddings {
            if v.len() != dim {
                return Err(IndexError::VectorSizeMismatch {
                    got: v.len(),
                    want: dim,
                });
            }
        }

        let records = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| IndexRecord { chunk, embedding })
            .collect::<Vec<_>>();

        Ok(Self {
            meta: IndexMeta {
                format_version: FORMAT_VERSION,
                embedder: provider.fingerprint(),
                dim,
                records: records.len(),
                created_at: Utc::now(),
            },
            records,
        })
    }

    /// Number of indexed records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn meta(&self) -> &IndexMeta {
        &self.meta
    }

    /// Read-only view of the indexed chunks, in insertion order.
    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.records.iter().map(|r| &r.chunk)
    }

    /// Returns the top-k records by cosine similarity, closest first.
    ///
    /// Ties keep insertion order (the sort is stable). `k` larger than the
    /// index size is clamped, never an error.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<ScoredChunk> {
        let mut hits: Vec<ScoredChunk> = self
            .records
            .iter()
            .map(|r| ScoredChunk {
                chunk: r.chunk.clone(),
                score: cosine_similarity(query, &r.embedding),
            })
            .collect();

        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(k.min(self.records.len()));
        hits
    }

    /// Writes the index to `path` atomically.
    ///
    /// The directory is fully materialized under a temporary sibling name
    /// and renamed into place. An existing index at `path` is replaced
    /// (last-writer-wins; the path is the sole consistency key).
    ///
    /// # Errors
    /// Returns [`IndexError::Io`] on filesystem failures. A failed save
    /// never leaves a partial index at `path`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), IndexError> {
        let path = path.as_ref();
        info!("VectorIndex::save path={:?} records={}", path, self.records.len());

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let staging = staging_path(path, "tmp");
        fs::create_dir_all(&staging)?;

        let result = self.write_contents(&staging);
        if let Err(e) = result {
            let _ = fs::remove_dir_all(&staging);
            return Err(e);
        }

        if path.exists() {
            let retired = staging_path(path, "old");
            fs::rename(path, &retired)?;
            fs::rename(&staging, path)?;
            let _ = fs::remove_dir_all(&retired);
        } else {
            fs::rename(&staging, path)?;
        }

        debug!("VectorIndex::save done path={:?}", path);
        Ok(())
    }

    fn write_contents(&self, dir: &Path) -> Result<(), IndexError> {
        let meta = serde_json::to_vec_pretty(&self.meta)
            .map_err(|e| IndexError::Corrupt(format!("meta serialization: {e}")))?;
        fs::write(dir.join(META_FILE), meta)?;

        let mut w = BufWriter::new(File::create(dir.join(RECORDS_FILE))?);
        for r in &self.records {
            let line = serde_json::to_string(r)
                .map_err(|e| IndexError::Corrupt(format!("record serialization: {e}")))?;
            w.write_all(line.as_bytes())?;
            w.write_all(b"\n")?;
        }
        w.flush()?;
        Ok(())
    }

    /// Reconstitutes an index from durable storage.
    ///
    /// Embeddings are deserialized as stored, never recomputed. The path is
    /// treated as trusted input; do not point this at files from untrusted
    /// sources.
    ///
    /// # Errors
    /// - [`IndexError::NotFound`] if `path` does not exist (checked twice,
    ///   [`SWAP_RETRY_DELAY`] apart, to ride out a concurrent replacing
    ///   save).
    /// - [`IndexError::Corrupt`] if metadata or any record fails to parse,
    ///   or the contents disagree with the metadata (count, dimension).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, IndexError> {
        let path = path.as_ref();
        if !path.exists() {
            // A replacing save retires the old directory before the new one
            // lands; during that instant the path is absent even though the
            // index exists before and after. Retry once before giving up.
            std::thread::sleep(SWAP_RETRY_DELAY);
            if !path.exists() {
                return Err(IndexError::NotFound(path.to_path_buf()));
            }
        }
        info!("VectorIndex::load path={:?}", path);

        let meta_bytes = fs::read(path.join(META_FILE))
            .map_err(|e| IndexError::Corrupt(format!("missing or unreadable meta.json: {e}")))?;
        let meta: IndexMeta = serde_json::from_slice(&meta_bytes)
            .map_err(|e| IndexError::Corrupt(format!("bad meta.json: {e}")))?;

        if meta.format_version != FORMAT_VERSION {
            return Err(IndexError::Corrupt(format!(
                "unsupported format version {}",
                meta.format_version
            )));
        }

        let file = File::open(path.join(RECORDS_FILE))
            .map_err(|e| IndexError::Corrupt(format!("missing records.jsonl: {e}")))?;
        let reader = BufReader::new(file);

        let mut records = Vec::with_capacity(meta.records);
        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let r: IndexRecord = serde_json::from_str(&line)
                .map_err(|e| IndexError::Corrupt(format!("record line {}: {e}", i + 1)))?;
            if r.embedding.len() != meta.dim {
                return Err(IndexError::Corrupt(format!(
                    "record line {}: dim {} != meta dim {}",
                    i + 1,
                    r.embedding.len(),
                    meta.dim
                )));
            }
            records.push(r);
        }

        if records.len() != meta.records {
            warn!(
                "VectorIndex::load count mismatch: meta={} actual={}",
                meta.records,
                records.len()
            );
            return Err(IndexError::Corrupt(format!(
                "record count {} disagrees with meta {}",
                records.len(),
                meta.records
            )));
        }

        debug!("VectorIndex::load done records={}", records.len());
        Ok(Self { meta, records })
    }
}

/// Cosine similarity; zero vectors score 0.0 instead of NaN.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut na = 0.0f32;
    let mut nb = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    dot / (na.sqrt() * nb.sqrt())
}

/// Unique sibling path for staging/retiring an index directory.
fn staging_path(path: &Path, tag: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "index".to_string());
    path.with_file_name(format!(".{name}.{tag}.{nanos}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{HashEmbedder, TEST_DIM};

    fn chunk(text: &str, offset: usize) -> Chunk {
        Chunk {
            text: text.to_string(),
            source_offset: offset,
            source_doc_id: "doc-1".to_string(),
        }
    }

    fn sample_chunks() -> Vec<Chunk> {
        vec![
            chunk("the mitochondria is the powerhouse of the cell", 0),
            chunk("photosynthesis converts light into chemical energy", 400),
            chunk("the krebs cycle produces ATP in the matrix", 800),
        ]
    }

    #[tokio::test]
    async fn build_preserves_chunk_order_and_dim() {
        let idx = VectorIndex::build(sample_chunks(), &HashEmbedder::new())
            .await
            .unwrap();
        assert_eq!(idx.len(), 3);
        assert_eq!(idx.meta().dim, TEST_DIM);
        let offsets: Vec<usize> = idx.chunks().map(|c| c.source_offset).collect();
        assert_eq!(offsets, vec![0, 400, 800]);
    }

    #[tokio::test]
    async fn build_fails_when_embedding_fails() {
        let provider = HashEmbedder {
            fail: true,
            ..HashEmbedder::new()
        };
        let err = VectorIndex::build(sample_chunks(), &provider).await.unwrap_err();
        assert!(matches!(err, IndexError::Embedding(_)));
    }

    #[tokio::test]
    async fn save_load_search_round_trip_self_retrieval() {
        let provider = HashEmbedder::new();
        let idx = VectorIndex::build(sample_chunks(), &provider).await.unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("faiss_index").join("biology");
        idx.save(&path).unwrap();

        let loaded = VectorIndex::load(&path).unwrap();
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded.meta().embedder, provider.fingerprint());

        // Each chunk's own text must come back as the top-1 hit.
        for source in sample_chunks() {
            let qv = provider.embed(&source.text).await.unwrap();
            let hits = loaded.search(&qv, 1);
            assert_eq!(hits.len(), 1);
            assert_eq!(hits[0].chunk.text, source.text);
            assert!(hits[0].score > 0.99);
        }
    }

    #[tokio::test]
    async fn search_clamps_k_and_orders_descending() {
        let idx = VectorIndex::build(sample_chunks(), &HashEmbedder::new())
            .await
            .unwrap();
        let qv = HashEmbedder::new()
            .embed("powerhouse of the cell")
            .await
            .unwrap();

        let hits = idx.search(&qv, 50);
        assert_eq!(hits.len(), 3);
        for pair in hits.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn load_missing_path_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = VectorIndex::load(dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, IndexError::NotFound(_)));
    }

    #[test]
    fn load_garbage_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken");
        fs::create_dir_all(&path).unwrap();
        fs::write(path.join("meta.json"), b"not json at all").unwrap();

        let err = VectorIndex::load(&path).unwrap_err();
        assert!(matches!(err, IndexError::Corrupt(_)));
    }

    #[tokio::test]
    async fn save_replaces_existing_index_completely() {
        let provider = HashEmbedder::new();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc");

        let first = VectorIndex::build(sample_chunks(), &provider).await.unwrap();
        first.save(&path).unwrap();

        let second = VectorIndex::build(vec![chunk("entirely new content", 0)], &provider)
            .await
            .unwrap();
        second.save(&path).unwrap();

        // The reader sees the complete new index, nothing stale, nothing torn.
        let loaded = VectorIndex::load(&path).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.chunks().next().unwrap().text, "entirely new content");
        // No staging/retired leftovers beside the index.
        let siblings: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(siblings.len(), 1);
    }

    #[tokio::test]
    async fn load_rides_out_a_concurrent_swap() {
        let provider = HashEmbedder::new();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc");

        let idx = VectorIndex::build(sample_chunks(), &provider).await.unwrap();
        idx.save(&path).unwrap();

        // Freeze the instant between a replacing save's two renames: the
        // old directory is retired, the new one is not yet in place.
        let retired = dir.path().join(".doc.old.swap");
        fs::rename(&path, &retired).unwrap();

        let restore_to = path.clone();
        let restorer = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(10));
            fs::rename(&retired, &restore_to).unwrap();
        });

        let loaded = VectorIndex::load(&path).unwrap();
        restorer.join().unwrap();
        assert_eq!(loaded.len(), 3);
    }

    #[tokio::test]
    async fn empty_chunk_set_builds_an_empty_index() {
        let idx = VectorIndex::build(Vec::new(), &HashEmbedder::new())
            .await
            .unwrap();
        assert!(idx.is_empty());
        assert_eq!(idx.meta().dim, 0);
        assert!(idx.search(&[1.0, 0.0], 4).is_empty());
    }

    #[test]
    fn cosine_handles_zero_vectors() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        let s = cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]);
        assert!((s - 1.0).abs() < 1e-6);
    }
}
