use std::path::PathBuf;

use clap::{Parser, Subcommand};
use faqrag::Result;
use faqrag::commands::{ask, chat, ingest, status};
use faqrag::config::{run_interactive_config, show_config};

#[derive(Parser)]
#[command(name = "faqrag")]
#[command(about = "A retrieval-augmented FAQ assistant over a CSV knowledge base")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure Ollama connection and settings
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Ingest a CSV knowledge base into the vector store
    Ingest {
        /// Path to the CSV file (category, question, answer columns)
        csv: PathBuf,
        /// Override the store directory
        #[arg(long)]
        store: Option<PathBuf>,
    },
    /// Ask a single question against the knowledge base
    Ask {
        /// The question to answer
        question: String,
        /// Override the store directory
        #[arg(long)]
        store: Option<PathBuf>,
    },
    /// Start an interactive question-answering session
    Chat {
        /// Override the store directory
        #[arg(long)]
        store: Option<PathBuf>,
    },
    /// Show configuration, backend health, and store state
    Status {
        /// Override the store directory
        #[arg(long)]
        store: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config()?;
            } else {
                run_interactive_config()?;
            }
        }
        Commands::Ingest { csv, store } => {
            ingest(csv, store)?;
        }
        Commands::Ask { question, store } => {
            ask(question, store)?;
        }
        Commands::Chat { store } => {
            chat(store)?;
        }
        Commands::Status { store } => {
            status(store)?;
        }
    }

    Ok(())
}
