//! Shared state for all HTTP handlers.

use std::path::PathBuf;
use std::sync::Arc;

use doc_ingest::ChunkingConfig;
use llm_gateway::LlmClient;
use vector_store::GatewayEmbedder;

use crate::registry::SessionRegistry;

/// Process-wide handler state. No index lives here: every query resolves
/// its own index fresh from disk by path, so requests stay isolated.
pub struct AppState {
    /// Shared LLM gateway (chat + embedding profiles).
    pub llm: Arc<LlmClient>,
    /// Embedding provider handed to index build and retrieval.
    pub embedder: GatewayEmbedder,
    /// Where raw uploads are stored.
    pub upload_dir: PathBuf,
    /// Where index directories are stored; one subdirectory per document.
    pub index_dir: PathBuf,
    /// Upload bookkeeping.
    pub registry: SessionRegistry,
    pub chunking: ChunkingConfig,
}

impl AppState {
    /// Loads shared state from environment variables.
    ///
    /// - `DATA_DIR` (default `data`): root for uploads, indexes and the
    ///   session registry file.
    /// - `EMBEDDING_DIM` (optional): enforced embedding dimension.
    /// - `CHUNK_SIZE` / `CHUNK_OVERLAP` (optional): chunker geometry.
    /// - LLM provider variables: see `llm-gateway`.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let data_dir = PathBuf::from(std::env::var("DATA_DIR").unwrap_or_else(|_| "data".into()));

        let llm = Arc::new(LlmClient::from_env()?);
        let dim = env_opt_usize("EMBEDDING_DIM")?;
        let embedder = GatewayEmbedder::new(llm.clone(), dim);

        let mut chunking = ChunkingConfig::default();
        if let Some(size) = env_opt_usize("CHUNK_SIZE")? {
            chunking.chunk_size = size;
        }
        if let Some(overlap) = env_opt_usize("CHUNK_OVERLAP")? {
            chunking.overlap = overlap;
        }

        let registry = SessionRegistry::open(data_dir.join("sessions.json"))?;

        Ok(Self {
            llm,
            embedder,
            upload_dir: data_dir.join("uploads"),
            index_dir: data_dir.join("indexes"),
            registry,
            chunking,
        })
    }
}

fn env_opt_usize(name: &str) -> Result<Option<usize>, Box<dyn std::error::Error>> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(Some(
            v.parse::<usize>()
                .map_err(|_| format!("{name} must be a positive integer"))?,
        )),
        _ => Ok(None),
    }
}
