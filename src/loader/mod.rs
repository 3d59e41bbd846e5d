
use std::collections::BTreeMap;
use std::path::Path;

use tracing::{debug, info};

use crate::{RagError, Result};

const REQUIRED_COLUMNS: [&str; 3] = ["category", "question", "answer"];

/// One row of the knowledge base, normalized into a document.
///
/// Records are created once at ingestion and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Zero-based row index in the source file.
    pub row: u32,
    pub category: String,
    pub question: String,
    pub answer: String,
    /// Columns beyond the required three, keyed by header name.
    pub extra: BTreeMap<String, String>,
}

impl Record {
    /// The text representation used for chunking and embedding.
    ///
    /// Fields are rendered as `name: value` lines in a fixed order so the
    /// rendering is deterministic and the original field names stay
    /// recoverable from the text itself.
    #[inline]
    pub fn text(&self) -> String {
        let mut text = format!(
            "category: {}\nquestion: {}\nanswer: {}",
            self.category, self.question, self.answer
        );
        for (name, value) in &self.extra {
            text.push('\n');
            text.push_str(name);
            text.push_str(": ");
            text.push_str(value);
        }
        text
    }
}

/// Load all records from a comma-separated knowledge base file.
///
/// The file must be UTF-8, carry a header row, and contain at least the
/// `category`, `question`, and `answer` columns. Any failure here is fatal
/// to the ingestion run.
#[inline]
pub fn load_records<P: AsRef<Path>>(path: P) -> Result<Vec<Record>> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(RagError::Ingestion(format!(
            "Knowledge base file not found: {}",
            path.display()
        )));
    }

    let mut reader = csv::Reader::from_path(path).map_err(|e| {
        RagError::Ingestion(format!("Failed to open {}: {}", path.display(), e))
    })?;

    let headers = reader
        .headers()
        .map_err(|e| RagError::Ingestion(format!("Failed to read header row: {}", e)))?
        .clone();

    for required in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == required) {
            return Err(RagError::Ingestion(format!(
                "Missing required column '{}' in {}",
                required,
                path.display()
            )));
        }
    }

    let mut records = Vec::new();

    for (row, result) in reader.records().enumerate() {
        let csv_record = result.map_err(|e| {
            RagError::Ingestion(format!("Malformed row {} in {}: {}", row + 1, path.display(), e))
        })?;

        let mut category = String::new();
        let mut question = String::new();
        let mut answer = String::new();
        let mut extra = BTreeMap::new();

        for (header, value) in headers.iter().zip(csv_record.iter()) {
            match header {
                "category" => category = value.to_string(),
                "question" => question = value.to_string(),
                "answer" => answer = value.to_string(),
                _ => {
                    extra.insert(header.to_string(), value.to_string());
                }
            }
        }

        debug!("Loaded record {} (category: {})", row, category);

        records.push(Record {
            row: row as u32,
            category,
            question,
            answer,
            extra,
        });
    }

    info!("Loaded {} records from {}", records.len(), path.display());
    Ok(records)
}
