#[cfg(test)]
mod tests;

use std::sync::Arc;

use tracing::{debug, info};

use crate::Result;
use crate::answer::{AnswerAssembler, AnswerEnvelope};
use crate::config::Config;
use crate::database::VectorStore;
use crate::embeddings::{Embedder, OllamaClient};
use crate::generation::{Generator, OllamaGenerator};
use crate::retriever::Retriever;

/// Everything needed to answer a question: the retriever over an opened
/// store and the answer assembler around a generation backend.
///
/// Callers construct one per store and pass it around explicitly; nothing
/// here is cached globally, so tests can build an engine from in-memory
/// doubles via [`RagEngine::from_parts`].
pub struct RagEngine {
    retriever: Retriever,
    assembler: AnswerAssembler,
}

impl RagEngine {
    /// Open the store at `store_dir` and wire up Ollama-backed embedding
    /// and generation from the configuration.
    #[inline]
    pub fn open(config: &Config, store_dir: &std::path::Path) -> Result<Self> {
        let store = VectorStore::open(store_dir)?;
        info!(
            "Opened store with {} entries (model '{}', dimension {})",
            store.len(),
            store.model(),
            store.dimension()
        );

        let embedder: Arc<dyn Embedder> = Arc::new(OllamaClient::new(config)?);
        let generator: Arc<dyn Generator> = Arc::new(OllamaGenerator::new(config)?);

        Self::from_parts(embedder, generator, store, config.retrieval.top_k)
    }

    /// Assemble an engine from explicit collaborators.
    #[inline]
    pub fn from_parts(
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
        store: VectorStore,
        top_k: usize,
    ) -> Result<Self> {
        let retriever = Retriever::new(embedder, store, top_k)?;
        let assembler = AnswerAssembler::new(generator);
        Ok(Self {
            retriever,
            assembler,
        })
    }

    /// Answer a question: retrieve the top-k chunks, then generate a
    /// grounded answer with citations.
    #[inline]
    pub fn ask(&self, question: &str) -> Result<AnswerEnvelope> {
        let hits = self.retriever.retrieve(question)?;
        debug!(
            "Retrieved {} chunks for question ({} chars)",
            hits.len(),
            question.len()
        );
        self.assembler.assemble(question, &hits)
    }

    #[inline]
    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }
}
