//! Persisted nearest-neighbor index over chunk embeddings.
//!
//! The [`VectorIndex`] owns an ordered collection of (embedding, chunk)
//! pairs. It is created by [`VectorIndex::build`], persisted with
//! [`VectorIndex::save`] (atomic directory swap), and reconstituted with
//! [`VectorIndex::load`] without recomputing any embedding.
//!
//! Loading deserializes whatever is at the given path. Only load indexes
//! from paths this service wrote itself; the on-disk format carries no
//! authentication.
//!
//! Retrieval ([`retrieve`]) embeds the query with the same provider the
//! index was built with and returns the top-k chunks by cosine similarity.
//! The provider identity is persisted in [`IndexMeta`] and enforced on
//! retrieval: querying one embedding space with vectors from another does
//! not fail loudly on its own, it just silently returns junk, so a
//! fingerprint mismatch is a hard error here.

mod embed;
mod errors;
mod index;
mod record;
mod retrieve;

pub use embed::{EmbeddingsProvider, GatewayEmbedder};
pub use errors::IndexError;
pub use index::{IndexMeta, VectorIndex};
pub use record::{IndexRecord, ScoredChunk};
pub use retrieve::{DEFAULT_TOP_K, retrieve};

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};
    use std::{future::Future, pin::Pin};

    use crate::embed::EmbeddingsProvider;
    use crate::errors::IndexError;

    pub const TEST_DIM: usize = 16;

    /// Deterministic bag-of-words embedder: same text, same vector.
    pub struct HashEmbedder {
        pub name: &'static str,
        pub fail: bool,
    }

    impl HashEmbedder {
        pub fn new() -> Self {
            Self {
                name: "test-hash/16",
                fail: false,
            }
        }
    }

    impl EmbeddingsProvider for HashEmbedder {
        fn embed<'a>(
            &'a self,
            text: &'a str,
        ) -> Pin<Box<dyn Future<Output = Result<Vec<f32>, IndexError>> + Send + 'a>> {
            Box::pin(async move {
                if self.fail {
                    return Err(IndexError::Embedding("scripted failure".into()));
                }
                let mut v = vec![0.0f32; TEST_DIM];
                for word in text.split_whitespace() {
                    let mut h = DefaultHasher::new();
                    word.hash(&mut h);
                    v[(h.finish() % TEST_DIM as u64) as usize] += 1.0;
                }
                Ok(v)
            })
        }

        fn fingerprint(&self) -> String {
            self.name.to_string()
        }
    }
}
