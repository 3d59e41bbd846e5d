use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

use console::style;
use dialoguer::Input;
use dialoguer::theme::ColorfulTheme;

use crate::answer::AnswerEnvelope;
use crate::config::Config;
use crate::database::VectorStore;
use crate::embeddings::OllamaClient;
use crate::engine::RagEngine;
use crate::indexer::{Indexer, IngestLock};

/// Resolve the store directory and its ingest lock, honoring `--store`.
fn resolve_store(config: &Config, store: Option<PathBuf>) -> (PathBuf, PathBuf) {
    match store {
        Some(dir) => {
            let lock = dir.with_extension("lock");
            (dir, lock)
        }
        None => (config.store_path(), config.ingest_lock_path()),
    }
}

/// Ingest a CSV knowledge base into the vector store
#[inline]
pub fn ingest(csv_path: PathBuf, store: Option<PathBuf>) -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;
    let (store_dir, lock_path) = resolve_store(&config, store);

    info!(
        "Ingesting {} into {}",
        csv_path.display(),
        store_dir.display()
    );

    let client = OllamaClient::new(&config).context("Failed to create embedding client")?;
    client
        .health_check()
        .context("Ollama is not reachable; check your configuration with 'faqrag config'")?;

    let _lock = IngestLock::acquire(&lock_path)?;

    let indexer = Indexer::new(Arc::new(client), config.chunking);
    let (store, stats) = indexer.ingest(&csv_path, &store_dir)?;

    println!("Ingestion complete!");
    println!("  Records: {}", stats.records);
    println!("  Chunks: {}", stats.chunks);
    println!("  Embedding model: {}", store.model());
    println!("  Store: {}", store_dir.display());
    println!("  Duration: {:.1}s", stats.duration.as_secs_f64());

    Ok(())
}

/// Answer a single question against the indexed knowledge base
#[inline]
pub fn ask(question: String, store: Option<PathBuf>) -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;
    let (store_dir, _) = resolve_store(&config, store);

    let engine = RagEngine::open(&config, &store_dir)?;
    let envelope = engine.ask(&question)?;
    print_envelope(&envelope);

    Ok(())
}

/// Interactive question-answering loop
#[inline]
pub fn chat(store: Option<PathBuf>) -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;
    let (store_dir, _) = resolve_store(&config, store);

    let engine = RagEngine::open(&config, &store_dir)?;

    println!(
        "{}",
        style("💬 faqrag chat — ask about the knowledge base, 'exit' to quit").cyan()
    );
    println!(
        "Store: {} entries, model '{}'",
        engine.retriever().store().len(),
        engine.retriever().store().model()
    );
    println!();

    loop {
        let question: String = Input::with_theme(&ColorfulTheme::default())
            .with_prompt("You")
            .allow_empty(true)
            .interact_text()
            .context("Failed to read input")?;

        let question = question.trim();
        if question.is_empty() {
            continue;
        }
        if question.eq_ignore_ascii_case("exit") || question.eq_ignore_ascii_case("quit") {
            println!("Bye!");
            break;
        }

        // One bad question should not end the session.
        match engine.ask(question) {
            Ok(envelope) => print_envelope(&envelope),
            Err(e) => {
                error!("Failed to answer question: {}", e);
                println!("{} {}", style("Error:").red().bold(), e);
            }
        }
        println!();
    }

    Ok(())
}

/// Show configuration, backend health, and store state
#[inline]
pub fn status(store: Option<PathBuf>) -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;
    let (store_dir, _) = resolve_store(&config, store);

    println!("faqrag status");
    println!();
    println!("Configuration: {}", config.config_file_path().display());
    println!("  Ollama: {}", config.ollama.ollama_url()?);
    println!("  Embedding model: {}", config.ollama.model);
    println!("  Generation model: {}", config.generation.model);
    println!("  Top-k: {}", config.retrieval.top_k);
    println!();

    match OllamaClient::new(&config).and_then(|client| client.health_check()) {
        Ok(()) => println!("Ollama: {}", style("reachable, models available").green()),
        Err(e) => println!("Ollama: {} ({})", style("unreachable").red(), e),
    }
    println!();

    match VectorStore::open(&store_dir) {
        Ok(store) => {
            let manifest = store.manifest();
            println!("Store: {}", store_dir.display());
            println!("  Entries: {}", manifest.entry_count);
            println!("  Embedding model: {}", manifest.model);
            println!("  Dimension: {}", manifest.dimension);
            println!("  Created: {}", manifest.created_at);
        }
        Err(e) => {
            println!("Store: {}", style("not available").yellow());
            println!("  {}", e);
        }
    }

    Ok(())
}

fn print_envelope(envelope: &AnswerEnvelope) {
    println!();
    println!("{}", style(&envelope.answer).bold());

    if !envelope.sources.is_empty() {
        println!();
        println!("{}", style("Sources:").dim());
        for source in &envelope.sources {
            println!("  {}", source);
        }
    }
}
