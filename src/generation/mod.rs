#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::config::Config;
use crate::{RagError, Result};

const DEFAULT_TIMEOUT_SECONDS: u64 = 120;

/// Produces answer text from an assembled prompt.
pub trait Generator {
    /// Identity of the backing model, used when reporting failures.
    fn model(&self) -> &str;

    fn generate(&self, prompt: &str) -> Result<String>;
}

/// Client for the Ollama text-generation API.
///
/// Transient failures are retried once; everything else is surfaced to the
/// caller, which decides how to present it.
#[derive(Debug, Clone)]
pub struct OllamaGenerator {
    base_url: Url,
    model: String,
    temperature: f32,
    agent: ureq::Agent,
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

impl OllamaGenerator {
    #[inline]
    pub fn new(config: &Config) -> Result<Self> {
        let base_url = config
            .ollama
            .ollama_url()
            .map_err(|e| RagError::Config(format!("Invalid Ollama URL: {}", e)))?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)))
            .build()
            .into();

        Ok(Self {
            base_url,
            model: config.generation.model.clone(),
            temperature: config.generation.temperature,
            agent,
        })
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        self
    }

    fn call_generate(&self, request_json: &str, url: &Url) -> std::result::Result<String, ureq::Error> {
        self.agent
            .post(url.as_str())
            .header("Content-Type", "application/json")
            .send(request_json)
            .and_then(|mut resp| resp.body_mut().read_to_string())
    }

    fn is_transient(error: &ureq::Error) -> bool {
        match error {
            ureq::Error::StatusCode(status) => *status >= 500,
            ureq::Error::ConnectionFailed
            | ureq::Error::HostNotFound
            | ureq::Error::Timeout(_)
            | ureq::Error::Io(_) => true,
            _ => false,
        }
    }
}

impl Generator for OllamaGenerator {
    #[inline]
    fn model(&self) -> &str {
        &self.model
    }

    #[inline]
    fn generate(&self, prompt: &str) -> Result<String> {
        debug!(
            "Generating answer with {} (prompt length: {})",
            self.model,
            prompt.len()
        );

        let request = GenerateRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            stream: false,
            options: GenerateOptions {
                temperature: self.temperature,
            },
        };

        let url = self.base_url.join("/api/generate").map_err(|e| {
            RagError::Generation(format!("Failed to build generation URL: {}", e))
        })?;

        let request_json = serde_json::to_string(&request).map_err(|e| {
            RagError::Generation(format!("Failed to serialize generation request: {}", e))
        })?;

        let response_text = match self.call_generate(&request_json, &url) {
            Ok(text) => text,
            Err(error) if Self::is_transient(&error) => {
                warn!(
                    "Transient error from generation backend '{}', retrying once: {}",
                    self.model, error
                );
                self.call_generate(&request_json, &url).map_err(|e| {
                    RagError::Generation(format!(
                        "Backend '{}' failed after retry: {}",
                        self.model, e
                    ))
                })?
            }
            Err(error) => {
                return Err(RagError::Generation(format!(
                    "Backend '{}' failed: {}",
                    self.model, error
                )));
            }
        };

        let response: GenerateResponse = serde_json::from_str(&response_text).map_err(|e| {
            RagError::Generation(format!(
                "Malformed response from backend '{}': {}",
                self.model, e
            ))
        })?;

        debug!("Generated {} chars of answer text", response.response.len());
        Ok(response.response)
    }
}
