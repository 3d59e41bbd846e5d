
use std::fmt;
use std::sync::Arc;

use itertools::Itertools;
use tracing::{debug, info};

use crate::generation::Generator;
use crate::retriever::QueryResult;
use crate::{RagError, Result};

/// The exact phrase the model is instructed to reply with when the
/// retrieved context cannot support an answer.
pub const REFUSAL_PHRASE: &str =
    "I don't have enough information in the knowledge base to answer that.";

/// Grounding prompt: answer only from the supplied context, refuse with the
/// fixed phrase otherwise. The two placeholders are filled verbatim.
const PROMPT_TEMPLATE: &str = "You are a helpful FAQ assistant. Answer the user's question using only \
the context below. Be polite and accurate. If the context does not contain enough information to \
answer, or the question is off-topic, reply exactly with: \"{refusal}\"

Context:
{context}

Question:
{question}";

/// A citation derived from one retrieved chunk, in retrieval order.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceCitation {
    pub category: String,
    pub question: String,
    pub answer: String,
    pub similarity: f32,
}

impl fmt::Display for SourceCitation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {} (similarity {:.2})",
            self.category, self.question, self.answer, self.similarity
        )
    }
}

/// The generated answer plus the sources it was grounded on.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerEnvelope {
    pub answer: String,
    pub sources: Vec<SourceCitation>,
}

/// Formats retrieved context into the prompt template and packages the
/// generated text with its citations.
pub struct AnswerAssembler {
    generator: Arc<dyn Generator>,
}

impl AnswerAssembler {
    #[inline]
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self { generator }
    }

    /// Build the prompt for a question and its retrieved chunks.
    #[inline]
    pub fn build_prompt(question: &str, hits: &QueryResult) -> String {
        let context = hits
            .iter()
            .map(|hit| hit.metadata.content.as_str())
            .join("\n\n");

        PROMPT_TEMPLATE
            .replace("{refusal}", REFUSAL_PHRASE)
            .replace("{context}", &context)
            .replace("{question}", question)
    }

    /// Generate an answer grounded on the retrieved chunks.
    ///
    /// With no retrieved context there is nothing to ground an answer on,
    /// so the refusal envelope is returned without calling the backend.
    #[inline]
    pub fn assemble(&self, question: &str, hits: &QueryResult) -> Result<AnswerEnvelope> {
        if hits.is_empty() {
            info!("No context retrieved; refusing without calling the generator");
            return Ok(AnswerEnvelope {
                answer: REFUSAL_PHRASE.to_string(),
                sources: Vec::new(),
            });
        }

        let prompt = Self::build_prompt(question, hits);
        debug!(
            "Assembled prompt with {} context chunks ({} chars)",
            hits.len(),
            prompt.len()
        );

        let answer = self.generator.generate(&prompt).map_err(|e| match e {
            RagError::Generation(msg) => RagError::Generation(format!(
                "Failed to answer question '{}': {}",
                question, msg
            )),
            other => other,
        })?;

        let sources = hits
            .iter()
            .map(|hit| SourceCitation {
                category: hit.metadata.category.clone(),
                question: hit.metadata.question.clone(),
                answer: hit.metadata.answer.clone(),
                similarity: hit.similarity,
            })
            .collect();

        Ok(AnswerEnvelope { answer, sources })
    }
}
