use super::*;
use crate::RagError;
use std::collections::BTreeMap;
use tempfile::TempDir;

const TEST_MODEL: &str = "test-embed";

fn test_metadata(record_id: u32, chunk_index: u32, content: &str) -> ChunkMetadata {
    ChunkMetadata {
        record_id,
        category: "Visa".to_string(),
        question: "Do I need a visa?".to_string(),
        answer: "EU citizens do not need a visa.".to_string(),
        content: content.to_string(),
        chunk_index,
        offset: 0,
        created_at: "2024-01-01T00:00:00Z".to_string(),
        extra: BTreeMap::new(),
    }
}

fn test_record(id: &str, vector: Vec<f32>) -> EmbeddingRecord {
    EmbeddingRecord {
        id: id.to_string(),
        vector,
        metadata: test_metadata(0, 0, &format!("content for {}", id)),
    }
}

fn build_store(dir: &std::path::Path, vectors: &[(&str, Vec<f32>)]) -> VectorStore {
    let mut builder = StoreBuilder::create(TEST_MODEL, vectors[0].1.len());
    for (id, vector) in vectors {
        builder
            .push(test_record(id, vector.clone()))
            .expect("should push record");
    }
    builder.finish(dir).expect("should finish store")
}

#[test]
fn build_and_reopen() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let store_dir = temp_dir.path().join("store");

    let store = build_store(
        &store_dir,
        &[("a", vec![1.0, 0.0, 0.0]), ("b", vec![0.0, 1.0, 0.0])],
    );
    assert_eq!(store.len(), 2);

    let reopened = VectorStore::open(&store_dir).expect("should reopen store");
    assert_eq!(reopened.len(), 2);
    assert_eq!(reopened.model(), TEST_MODEL);
    assert_eq!(reopened.dimension(), 3);
    assert_eq!(reopened.manifest().entry_count, 2);
}

#[test]
fn missing_store_is_store_open_error() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let result = VectorStore::open(temp_dir.path().join("absent"));

    match result {
        Err(RagError::StoreOpen(msg)) => assert!(msg.contains("ingest")),
        Err(other) => panic!("expected StoreOpen error, got {:?}", other),
        Ok(_) => panic!("expected StoreOpen error, got a store"),
    }
}

#[test]
fn search_ranks_by_similarity() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let store_dir = temp_dir.path().join("store");

    let store = build_store(
        &store_dir,
        &[
            ("x", vec![1.0, 0.0, 0.0]),
            ("y", vec![0.0, 1.0, 0.0]),
            ("near-x", vec![0.9, 0.1, 0.0]),
        ],
    );

    let results = store.search(&[1.0, 0.0, 0.0], 3).expect("should search");

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].id, "x");
    assert_eq!(results[1].id, "near-x");
    assert_eq!(results[2].id, "y");
    assert!(results[0].similarity >= results[1].similarity);
    assert!(results[1].similarity >= results[2].similarity);
}

#[test]
fn self_retrieval_is_near_perfect() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let store_dir = temp_dir.path().join("store");

    let indexed = vec![0.3, -0.2, 0.8, 0.1];
    let store = build_store(
        &store_dir,
        &[("self", indexed.clone()), ("other", vec![-0.5, 0.5, 0.0, 0.7])],
    );

    let results = store.search(&indexed, 1).expect("should search");

    assert_eq!(results[0].id, "self");
    assert!(results[0].similarity > 0.99);
}

#[test]
fn k_limits_result_count() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let store_dir = temp_dir.path().join("store");

    let store = build_store(
        &store_dir,
        &[
            ("a", vec![1.0, 0.0]),
            ("b", vec![0.0, 1.0]),
            ("c", vec![0.7, 0.7]),
        ],
    );

    let results = store.search(&[1.0, 0.0], 2).expect("should search");
    assert_eq!(results.len(), 2);

    let results = store.search(&[1.0, 0.0], 10).expect("should search");
    assert_eq!(results.len(), 3);
}

#[test]
fn ties_keep_insertion_order() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let store_dir = temp_dir.path().join("store");

    // Identical vectors produce identical similarities.
    let store = build_store(
        &store_dir,
        &[
            ("first", vec![0.5, 0.5]),
            ("second", vec![0.5, 0.5]),
            ("third", vec![0.5, 0.5]),
        ],
    );

    let results = store.search(&[0.5, 0.5], 3).expect("should search");

    assert_eq!(results[0].id, "first");
    assert_eq!(results[1].id, "second");
    assert_eq!(results[2].id, "third");
}

#[test]
fn compat_check_rejects_wrong_dimension() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let store_dir = temp_dir.path().join("store");

    let store = build_store(&store_dir, &[("a", vec![1.0, 0.0, 0.0])]);

    assert!(store.check_compat(TEST_MODEL, 3).is_ok());
    assert!(matches!(
        store.check_compat(TEST_MODEL, 768),
        Err(RagError::StoreOpen(_))
    ));
}

#[test]
fn compat_check_rejects_wrong_model() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let store_dir = temp_dir.path().join("store");

    let store = build_store(&store_dir, &[("a", vec![1.0, 0.0, 0.0])]);

    match store.check_compat("different-model", 3) {
        Err(RagError::StoreOpen(msg)) => {
            assert!(msg.contains(TEST_MODEL));
            assert!(msg.contains("different-model"));
        }
        other => panic!("expected StoreOpen error, got {:?}", other),
    }
}

#[test]
fn search_rejects_mismatched_query_dimension() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let store_dir = temp_dir.path().join("store");

    let store = build_store(&store_dir, &[("a", vec![1.0, 0.0, 0.0])]);

    let result = store.search(&[1.0, 0.0], 1);
    assert!(matches!(result, Err(RagError::StoreOpen(_))));
}

#[test]
fn builder_rejects_mismatched_vector() {
    let mut builder = StoreBuilder::create(TEST_MODEL, 3);

    let result = builder.push(test_record("bad", vec![1.0, 0.0]));
    assert!(matches!(result, Err(RagError::Ingestion(_))));
    assert!(builder.is_empty());
}

#[test]
fn rebuild_replaces_previous_store_atomically() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let store_dir = temp_dir.path().join("store");

    build_store(&store_dir, &[("old-a", vec![1.0, 0.0]), ("old-b", vec![0.0, 1.0])]);

    let mut builder = StoreBuilder::create(TEST_MODEL, 2);
    builder
        .push(test_record("new", vec![1.0, 0.0]))
        .expect("should push record");
    builder.finish(&store_dir).expect("should finish rebuild");

    let reopened = VectorStore::open(&store_dir).expect("should reopen store");
    assert_eq!(reopened.len(), 1);
    let results = reopened.search(&[1.0, 0.0], 5).expect("should search");
    assert_eq!(results[0].id, "new");

    // No staging or retired directories left behind.
    let names: Vec<String> = std::fs::read_dir(temp_dir.path())
        .expect("should list dir")
        .map(|entry| entry.expect("should read entry").file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["store".to_string()]);
}

#[test]
fn truncated_entries_detected_on_open() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let store_dir = temp_dir.path().join("store");

    build_store(&store_dir, &[("a", vec![1.0, 0.0]), ("b", vec![0.0, 1.0])]);

    // Drop one entry without touching the manifest.
    let entries_path = store_dir.join("entries.json");
    let text = std::fs::read_to_string(&entries_path).expect("should read entries");
    let mut entries: Vec<EmbeddingRecord> =
        serde_json::from_str(&text).expect("should parse entries");
    entries.pop();
    std::fs::write(
        &entries_path,
        serde_json::to_string(&entries).expect("should serialize"),
    )
    .expect("should write entries");

    let result = VectorStore::open(&store_dir);
    match result {
        Err(RagError::StoreOpen(msg)) => assert!(msg.contains("inconsistent")),
        Err(other) => panic!("expected StoreOpen error, got {:?}", other),
        Ok(_) => panic!("expected StoreOpen error, got a store"),
    }
}

#[test]
fn vectors_are_normalized_on_insert() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let store_dir = temp_dir.path().join("store");

    // Magnitude differences must not affect ranking.
    let store = build_store(
        &store_dir,
        &[("long", vec![100.0, 0.0]), ("short", vec![0.0, 0.1])],
    );

    let results = store.search(&[0.0, 1.0], 2).expect("should search");
    assert_eq!(results[0].id, "short");
    assert!(results[0].similarity > 0.99);
}

#[test]
fn normalize_handles_zero_vector() {
    let mut vector = vec![0.0_f32, 0.0, 0.0];
    normalize(&mut vector);
    assert_eq!(vector, vec![0.0, 0.0, 0.0]);
}
