// Database module
// Persisted vector store: embedding records plus their chunk metadata

pub mod vector_store;

pub use vector_store::{SearchResult, StoreBuilder, StoreManifest, VectorStore};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One persisted embedding with the chunk it represents.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingRecord {
    /// Unique identifier for this embedding.
    pub id: String,
    /// The vector, L2-normalized at insert time.
    pub vector: Vec<f32>,
    pub metadata: ChunkMetadata,
}

/// Metadata stored alongside each embedding.
///
/// The knowledge-base fields are typed; anything else from the source row
/// rides along in the `extra` map.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkMetadata {
    /// Row index of the source record in the knowledge base.
    pub record_id: u32,
    pub category: String,
    pub question: String,
    pub answer: String,
    /// The chunk text that was embedded.
    pub content: String,
    /// Position of this chunk within its record.
    pub chunk_index: u32,
    /// Char offset of this chunk within the record text.
    pub offset: u32,
    /// Timestamp when this embedding was created.
    pub created_at: String,
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}
