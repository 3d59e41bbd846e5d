use super::*;
use crate::answer::REFUSAL_PHRASE;
use crate::database::{ChunkMetadata, EmbeddingRecord, StoreBuilder};
use std::collections::BTreeMap;
use tempfile::TempDir;

const DIMENSION: usize = 8;

struct HashEmbedder;

fn fnv1a(word: &str) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in word.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

impl Embedder for HashEmbedder {
    fn model(&self) -> &str {
        "hash-embed"
    }

    fn dimension(&self) -> usize {
        DIMENSION
    }

    fn embed(&self, text: &str) -> crate::Result<Vec<f32>> {
        let mut vector = vec![0.0_f32; DIMENSION];
        for word in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let index = (fnv1a(word) % DIMENSION as u64) as usize;
            vector[index] += 1.0;
        }
        Ok(vector)
    }
}

/// Echoes the prompt back so the test can inspect what the engine built.
struct EchoGenerator;

impl Generator for EchoGenerator {
    fn model(&self) -> &str {
        "echo"
    }

    fn generate(&self, prompt: &str) -> crate::Result<String> {
        Ok(format!("ECHO: {}", prompt))
    }
}

fn build_store(dir: &std::path::Path, contents: &[&str]) -> VectorStore {
    let embedder = HashEmbedder;
    let mut builder = StoreBuilder::create(embedder.model(), embedder.dimension());

    for (i, content) in contents.iter().enumerate() {
        builder
            .push(EmbeddingRecord {
                id: format!("chunk-{}", i),
                vector: embedder.embed(content).expect("should embed"),
                metadata: ChunkMetadata {
                    record_id: i as u32,
                    category: "Test".to_string(),
                    question: format!("question {}", i),
                    answer: format!("answer {}", i),
                    content: content.to_string(),
                    chunk_index: 0,
                    offset: 0,
                    created_at: "2024-01-01T00:00:00Z".to_string(),
                    extra: BTreeMap::new(),
                },
            })
            .expect("should push record");
    }

    builder.finish(dir).expect("should finish store")
}

#[test]
fn ask_grounds_answer_on_retrieved_context() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let store = build_store(
        temp_dir.path().join("store").as_path(),
        &[
            "visa rules for exchange students",
            "housing and dormitory applications",
        ],
    );

    let engine = RagEngine::from_parts(Arc::new(HashEmbedder), Arc::new(EchoGenerator), store, 1)
        .expect("should build engine");

    let envelope = engine
        .ask("do exchange students need a visa")
        .expect("should answer");

    assert!(envelope.answer.starts_with("ECHO:"));
    assert!(envelope.answer.contains("visa rules for exchange students"));
    assert_eq!(envelope.sources.len(), 1);
    assert_eq!(envelope.sources[0].category, "Test");
}

#[test]
fn ask_refuses_when_store_is_empty() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let store = build_store(temp_dir.path().join("store").as_path(), &[]);

    let engine = RagEngine::from_parts(Arc::new(HashEmbedder), Arc::new(EchoGenerator), store, 3)
        .expect("should build engine");

    let envelope = engine.ask("anything at all").expect("should refuse");
    assert_eq!(envelope.answer, REFUSAL_PHRASE);
    assert!(envelope.sources.is_empty());
}

#[test]
fn from_parts_rejects_incompatible_store() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let store_dir = temp_dir.path().join("store");

    let mut builder = StoreBuilder::create("other-model", DIMENSION);
    builder
        .push(EmbeddingRecord {
            id: "chunk-0".to_string(),
            vector: vec![1.0; DIMENSION],
            metadata: ChunkMetadata {
                record_id: 0,
                category: "Test".to_string(),
                question: "q".to_string(),
                answer: "a".to_string(),
                content: "content".to_string(),
                chunk_index: 0,
                offset: 0,
                created_at: "2024-01-01T00:00:00Z".to_string(),
                extra: BTreeMap::new(),
            },
        })
        .expect("should push record");
    let store = builder.finish(&store_dir).expect("should finish store");

    let result = RagEngine::from_parts(Arc::new(HashEmbedder), Arc::new(EchoGenerator), store, 3);
    assert!(matches!(result, Err(crate::RagError::StoreOpen(_))));
}
