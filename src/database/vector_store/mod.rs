#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{ChunkMetadata, EmbeddingRecord};
use crate::{RagError, Result};

const MANIFEST_FILE: &str = "manifest.json";
const ENTRIES_FILE: &str = "entries.json";
const FORMAT_VERSION: u32 = 1;
const EPSILON: f32 = 1e-10;

/// Self-describing header for a persisted store.
///
/// The manifest pins the embedding model and dimension the store was built
/// with, so opening it with a different embedder fails loudly instead of
/// silently comparing incomparable vectors.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreManifest {
    pub format_version: u32,
    pub model: String,
    pub dimension: usize,
    pub entry_count: usize,
    pub created_at: String,
}

/// Read-only vector store with brute-force cosine search.
///
/// Search takes `&self` only; once opened, the store is never mutated, so
/// concurrent readers need no locking.
pub struct VectorStore {
    manifest: StoreManifest,
    entries: Vec<EmbeddingRecord>,
}

/// One search hit: chunk metadata plus its cosine similarity to the query.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub id: String,
    pub metadata: ChunkMetadata,
    pub similarity: f32,
}

/// Accumulates embedding records and persists them atomically.
///
/// The build is written to a sibling temp directory and swapped into place
/// only once complete, so a reader opening the target path never observes
/// a partial build.
pub struct StoreBuilder {
    model: String,
    dimension: usize,
    entries: Vec<EmbeddingRecord>,
}

impl StoreBuilder {
    #[inline]
    pub fn create(model: &str, dimension: usize) -> Self {
        Self {
            model: model.to_string(),
            dimension,
            entries: Vec::new(),
        }
    }

    /// Add a record, validating its dimension and normalizing its vector.
    #[inline]
    pub fn push(&mut self, mut record: EmbeddingRecord) -> Result<()> {
        if record.vector.len() != self.dimension {
            return Err(RagError::Ingestion(format!(
                "Embedding for chunk {} of record {} has dimension {} but the store expects {}",
                record.metadata.chunk_index,
                record.metadata.record_id,
                record.vector.len(),
                self.dimension
            )));
        }

        normalize(&mut record.vector);
        self.entries.push(record);
        Ok(())
    }

    #[inline]
    pub fn push_all<I: IntoIterator<Item = EmbeddingRecord>>(&mut self, records: I) -> Result<()> {
        for record in records {
            self.push(record)?;
        }
        Ok(())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Persist the accumulated entries at `dir`, replacing any previous
    /// store there in a single atomic swap.
    #[inline]
    pub fn finish<P: AsRef<Path>>(self, dir: P) -> Result<VectorStore> {
        let dir = dir.as_ref();

        let manifest = StoreManifest {
            format_version: FORMAT_VERSION,
            model: self.model,
            dimension: self.dimension,
            entry_count: self.entries.len(),
            created_at: chrono::Utc::now().to_rfc3339(),
        };

        let staging = staging_path(dir)?;
        fs::create_dir_all(&staging)?;

        let write_result = write_store_files(&staging, &manifest, &self.entries);
        if let Err(e) = write_result {
            let _ = fs::remove_dir_all(&staging);
            return Err(e);
        }

        swap_into_place(&staging, dir)?;

        info!(
            "Persisted {} embeddings to {} (model {}, dimension {})",
            manifest.entry_count,
            dir.display(),
            manifest.model,
            manifest.dimension
        );

        Ok(VectorStore {
            manifest,
            entries: self.entries,
        })
    }
}

impl VectorStore {
    /// Open a persisted store, verifying its manifest and entry integrity.
    ///
    /// A missing or inconsistent store is a `StoreOpen` error telling the
    /// operator to re-run ingestion; partial results are never returned.
    #[inline]
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let manifest_path = dir.join(MANIFEST_FILE);

        if !manifest_path.exists() {
            return Err(RagError::StoreOpen(format!(
                "No vector store found at {}; run `faqrag ingest` first",
                dir.display()
            )));
        }

        let manifest_text = fs::read_to_string(&manifest_path).map_err(|e| {
            RagError::StoreOpen(format!(
                "Failed to read store manifest at {}: {}",
                manifest_path.display(),
                e
            ))
        })?;

        let manifest: StoreManifest = serde_json::from_str(&manifest_text).map_err(|e| {
            RagError::StoreOpen(format!(
                "Corrupt store manifest at {}: {}",
                manifest_path.display(),
                e
            ))
        })?;

        if manifest.format_version != FORMAT_VERSION {
            return Err(RagError::StoreOpen(format!(
                "Store at {} uses format version {} but this build expects {}; re-run `faqrag ingest`",
                dir.display(),
                manifest.format_version,
                FORMAT_VERSION
            )));
        }

        let entries_path = dir.join(ENTRIES_FILE);
        let entries_text = fs::read_to_string(&entries_path).map_err(|e| {
            RagError::StoreOpen(format!(
                "Failed to read store entries at {}: {}",
                entries_path.display(),
                e
            ))
        })?;

        let entries: Vec<EmbeddingRecord> = serde_json::from_str(&entries_text).map_err(|e| {
            RagError::StoreOpen(format!(
                "Corrupt store entries at {}: {}",
                entries_path.display(),
                e
            ))
        })?;

        if entries.len() != manifest.entry_count {
            return Err(RagError::StoreOpen(format!(
                "Store at {} is inconsistent: manifest says {} entries but {} were found; re-run `faqrag ingest`",
                dir.display(),
                manifest.entry_count,
                entries.len()
            )));
        }

        if let Some(bad) = entries.iter().find(|e| e.vector.len() != manifest.dimension) {
            return Err(RagError::StoreOpen(format!(
                "Store at {} is inconsistent: entry {} has dimension {} but the manifest says {}; re-run `faqrag ingest`",
                dir.display(),
                bad.id,
                bad.vector.len(),
                manifest.dimension
            )));
        }

        debug!(
            "Opened vector store at {} ({} entries, model {}, dimension {})",
            dir.display(),
            entries.len(),
            manifest.model,
            manifest.dimension
        );

        Ok(Self { manifest, entries })
    }

    /// Reject embedders that don't match what this store was built with.
    #[inline]
    pub fn check_compat(&self, model: &str, dimension: usize) -> Result<()> {
        if self.manifest.model != model {
            return Err(RagError::StoreOpen(format!(
                "Store was built with embedding model '{}' but '{}' is configured; re-run `faqrag ingest`",
                self.manifest.model, model
            )));
        }

        if self.manifest.dimension != dimension {
            return Err(RagError::StoreOpen(format!(
                "Store was built with dimension {} but the embedder declares {}; re-run `faqrag ingest`",
                self.manifest.dimension, dimension
            )));
        }

        Ok(())
    }

    /// Return the `k` entries most similar to the query vector, ordered by
    /// decreasing cosine similarity; ties keep insertion order.
    #[inline]
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        if query.len() != self.manifest.dimension {
            return Err(RagError::StoreOpen(format!(
                "Query vector has dimension {} but the store was built with {}",
                query.len(),
                self.manifest.dimension
            )));
        }

        let mut normalized_query = query.to_vec();
        normalize(&mut normalized_query);

        let mut results: Vec<SearchResult> = self
            .entries
            .iter()
            .map(|entry| SearchResult {
                id: entry.id.clone(),
                metadata: entry.metadata.clone(),
                // Entries are normalized at insert, so the dot product is
                // the cosine similarity.
                similarity: dot(&normalized_query, &entry.vector).clamp(-1.0, 1.0),
            })
            .collect();

        // Stable sort keeps insertion order for equal similarities.
        results.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(k);

        debug!("Search returned {} of {} entries", results.len(), self.entries.len());
        Ok(results)
    }

    #[inline]
    pub fn manifest(&self) -> &StoreManifest {
        &self.manifest
    }

    #[inline]
    pub fn model(&self) -> &str {
        &self.manifest.model
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.manifest.dimension
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn staging_path(dir: &Path) -> Result<PathBuf> {
    let name = dir
        .file_name()
        .ok_or_else(|| RagError::Ingestion(format!("Invalid store path: {}", dir.display())))?;

    let staging_name = format!("{}.build-{}", name.to_string_lossy(), Uuid::new_v4());
    Ok(dir.with_file_name(staging_name))
}

fn write_store_files(
    staging: &Path,
    manifest: &StoreManifest,
    entries: &[EmbeddingRecord],
) -> Result<()> {
    let entries_json = serde_json::to_string(entries)
        .map_err(|e| RagError::Ingestion(format!("Failed to serialize store entries: {}", e)))?;
    fs::write(staging.join(ENTRIES_FILE), entries_json)?;

    let manifest_json = serde_json::to_string_pretty(manifest)
        .map_err(|e| RagError::Ingestion(format!("Failed to serialize store manifest: {}", e)))?;
    fs::write(staging.join(MANIFEST_FILE), manifest_json)?;

    Ok(())
}

/// Move a completed staging directory to its final location. An existing
/// store is renamed aside first so the target path is swapped, never
/// partially overwritten.
fn swap_into_place(staging: &Path, dir: &Path) -> Result<()> {
    if let Some(parent) = dir.parent() {
        fs::create_dir_all(parent)?;
    }

    if dir.exists() {
        let retired = staging.with_extension("old");
        if retired.exists() {
            let _ = fs::remove_dir_all(&retired);
        }
        fs::rename(dir, &retired)?;

        if let Err(e) = fs::rename(staging, dir) {
            // Put the previous store back so the path stays usable.
            let _ = fs::rename(&retired, dir);
            return Err(e.into());
        }

        if let Err(e) = fs::remove_dir_all(&retired) {
            warn!("Failed to remove retired store {}: {}", retired.display(), e);
        }
    } else {
        fs::rename(staging, dir)?;
    }

    Ok(())
}

/// Scale a vector to unit length; zero vectors are left untouched.
pub(crate) fn normalize(vector: &mut [f32]) {
    let magnitude: f32 = vector.iter().map(|&x| x * x).sum::<f32>().sqrt();
    if magnitude > EPSILON {
        for x in vector.iter_mut() {
            *x /= magnitude;
        }
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}
