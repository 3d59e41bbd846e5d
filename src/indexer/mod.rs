
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::database::{ChunkMetadata, EmbeddingRecord, StoreBuilder, VectorStore};
use crate::embeddings::{ChunkingConfig, Embedder, split_text};
use crate::loader::{Record, load_records};
use crate::{RagError, Result};

/// Chunks sent to the embedding backend per progress tick.
const EMBED_PROGRESS_BATCH: usize = 32;

/// Summary of one ingestion run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestStats {
    pub records: usize,
    pub chunks: usize,
    pub duration: Duration,
}

/// Guard file preventing two ingestion runs from racing on the same store.
///
/// Created with `create_new` so a second run fails fast instead of both
/// building staging directories against the same target. Removed on drop.
pub struct IngestLock {
    path: PathBuf,
}

impl IngestLock {
    #[inline]
    pub fn acquire(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(_) => Ok(Self {
                path: path.to_path_buf(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(RagError::Ingestion(format!(
                    "Another ingestion appears to be running (lock file {} exists); \
                     remove it if the previous run crashed",
                    path.display()
                )))
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl Drop for IngestLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!("Failed to remove ingest lock {}: {}", self.path.display(), e);
        }
    }
}

/// Builds a vector store from a CSV knowledge base: load, chunk, embed,
/// then atomically swap the finished store into place.
pub struct Indexer {
    embedder: Arc<dyn Embedder>,
    chunking: ChunkingConfig,
}

impl Indexer {
    #[inline]
    pub fn new(embedder: Arc<dyn Embedder>, chunking: ChunkingConfig) -> Self {
        Self { embedder, chunking }
    }

    /// Run a full ingestion of `csv_path` into the store at `store_dir`.
    ///
    /// Builds in a staging directory and replaces any existing store only
    /// once every chunk has been embedded, so a failed run leaves the
    /// previous store readable.
    #[inline]
    pub fn ingest(&self, csv_path: &Path, store_dir: &Path) -> Result<(VectorStore, IngestStats)> {
        let start = Instant::now();

        let records = load_records(csv_path)?;
        info!("Loaded {} records from {}", records.len(), csv_path.display());

        let chunks = self.chunk_records(&records)?;
        if chunks.is_empty() {
            return Err(RagError::Ingestion(format!(
                "No chunks produced from {}; the file has no usable rows",
                csv_path.display()
            )));
        }
        debug!(
            "Split {} records into {} chunks (max {} chars, overlap {})",
            records.len(),
            chunks.len(),
            self.chunking.max_size,
            self.chunking.overlap
        );

        let mut builder = StoreBuilder::create(self.embedder.model(), self.embedder.dimension());

        let bar = if console::user_attended_stderr() {
            ProgressBar::new(chunks.len() as u64).with_style(
                ProgressStyle::with_template("{bar:40} [{pos}/{len}] Embedding chunks")
                    .expect("style template is valid"),
            )
        } else {
            ProgressBar::hidden()
        };

        let created_at = Utc::now().to_rfc3339();
        for batch in chunks.chunks(EMBED_PROGRESS_BATCH) {
            let texts: Vec<String> = batch.iter().map(|chunk| chunk.content.clone()).collect();
            let vectors = self.embedder.embed_batch(&texts)?;
            if vectors.len() != batch.len() {
                return Err(RagError::Embedding(format!(
                    "Embedding backend returned {} vectors for {} chunks",
                    vectors.len(),
                    batch.len()
                )));
            }

            for (chunk, vector) in batch.iter().zip(vectors) {
                builder.push(EmbeddingRecord {
                    id: Uuid::new_v4().to_string(),
                    vector,
                    metadata: ChunkMetadata {
                        record_id: chunk.record.row,
                        category: chunk.record.category.clone(),
                        question: chunk.record.question.clone(),
                        answer: chunk.record.answer.clone(),
                        content: chunk.content.clone(),
                        chunk_index: chunk.index as u32,
                        offset: chunk.offset as u32,
                        created_at: created_at.clone(),
                        extra: chunk.record.extra.clone(),
                    },
                })?;
                bar.inc(1);
            }
        }
        bar.finish_and_clear();

        let chunk_count = builder.len();
        let store = builder.finish(store_dir)?;

        let stats = IngestStats {
            records: records.len(),
            chunks: chunk_count,
            duration: start.elapsed(),
        };
        info!(
            "Ingested {} records as {} chunks in {:.1}s",
            stats.records,
            stats.chunks,
            stats.duration.as_secs_f64()
        );

        Ok((store, stats))
    }

    fn chunk_records<'a>(&self, records: &'a [Record]) -> Result<Vec<RecordChunk<'a>>> {
        let mut chunks = Vec::new();
        for record in records {
            for chunk in split_text(&record.text(), &self.chunking)? {
                chunks.push(RecordChunk {
                    record,
                    content: chunk.content,
                    offset: chunk.offset,
                    index: chunk.index,
                });
            }
        }
        Ok(chunks)
    }
}

struct RecordChunk<'a> {
    record: &'a Record,
    content: String,
    offset: usize,
    index: usize,
}
