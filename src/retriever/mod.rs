
use std::sync::Arc;

use tracing::debug;

use crate::database::{SearchResult, VectorStore};
use crate::embeddings::Embedder;
use crate::{RagError, Result};

pub const DEFAULT_TOP_K: usize = 3;

/// Ordered retrieval hits for one question, best first.
pub type QueryResult = Vec<SearchResult>;

/// Fixed top-k retrieval over an embedder and an open store.
///
/// Deliberately thin: query-time policy (filters, thresholds, reranking)
/// belongs here, layered on top of the store rather than inside it.
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    store: VectorStore,
    top_k: usize,
}

impl Retriever {
    /// Pair an embedder with a store, re-checking that the store was built
    /// with the same model and dimension.
    #[inline]
    pub fn new(embedder: Arc<dyn Embedder>, store: VectorStore, top_k: usize) -> Result<Self> {
        store.check_compat(embedder.model(), embedder.dimension())?;

        if top_k == 0 {
            return Err(RagError::Config(
                "top_k must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            embedder,
            store,
            top_k,
        })
    }

    /// Embed the question and return its top-k most similar chunks.
    #[inline]
    pub fn retrieve(&self, question: &str) -> Result<QueryResult> {
        let query_vector = self.embedder.embed(question)?;
        let hits = self.store.search(&query_vector, self.top_k)?;

        debug!(
            "Retrieved {} chunks for question ({} chars)",
            hits.len(),
            question.len()
        );

        Ok(hits)
    }

    #[inline]
    pub fn top_k(&self) -> usize {
        self.top_k
    }

    #[inline]
    pub fn store(&self) -> &VectorStore {
        &self.store
    }
}
