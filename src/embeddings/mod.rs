// Embeddings module
// Defines the embedding capability and its Ollama-backed implementation

pub mod chunking;
pub mod ollama;

pub use chunking::{ChunkingConfig, TextChunk, split_text};
pub use ollama::OllamaClient;

use crate::Result;

/// Maps text to fixed-dimension vectors.
///
/// The same implementation (and underlying model) must be used at ingestion
/// and at query time; the store records the model identity and dimension so
/// a mismatched embedder is rejected at open instead of silently producing
/// incomparable similarities.
pub trait Embedder {
    /// Identity of the underlying model, persisted in the store manifest.
    fn model(&self) -> &str;

    /// Dimension of every vector this embedder produces.
    fn dimension(&self) -> usize;

    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed several texts, preserving order.
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|text| self.embed(text)).collect()
    }
}
