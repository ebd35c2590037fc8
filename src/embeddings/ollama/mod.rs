
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::config::OllamaConfig;
use crate::{NotedexError, Result};

/// HTTP client for an Ollama-compatible embedding service.
///
/// This is a thin adapter over the external generator: text in, vector out,
/// or a single opaque failure. Retry policy belongs to the caller.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: Url,
    model: String,
    agent: ureq::Agent,
}

#[derive(Debug, Serialize)]
struct EmbedRequest {
    model: String,
    prompt: String,
}

#[derive(Debug, Serialize)]
struct BatchEmbedRequest {
    model: String,
    #[serde(rename = "input")]
    inputs: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct BatchEmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

impl OllamaClient {
    #[inline]
    pub fn new(config: &OllamaConfig) -> Result<Self> {
        let base_url = config
            .endpoint_url()
            .map_err(|e| NotedexError::Config(e.to_string()))?;

        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_seconds)))
            .build()
            .into();

        Ok(Self {
            base_url,
            model: config.model.clone(),
            agent,
        })
    }

    #[inline]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Request an embedding for a single text.
    #[inline]
    pub fn generate(&self, text: &str) -> Result<Vec<f32>> {
        debug!("Requesting embedding for text (length: {})", text.len());

        let request = EmbedRequest {
            model: self.model.clone(),
            prompt: text.to_string(),
        };

        let response_text = self.post_embed(&serde_json::to_string(&request).map_err(|e| {
            NotedexError::EmbeddingGeneration(format!("failed to serialize request: {e}"))
        })?)?;

        let response: EmbedResponse = serde_json::from_str(&response_text).map_err(|e| {
            NotedexError::EmbeddingGeneration(format!("malformed response: {e}"))
        })?;

        if response.embedding.is_empty() {
            return Err(NotedexError::EmbeddingGeneration(
                "service returned an empty embedding".to_string(),
            ));
        }

        Ok(response.embedding)
    }

    /// Request embeddings for several texts in one call.
    ///
    /// The response must contain exactly one vector per input, in input order.
    #[inline]
    pub fn generate_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Requesting embeddings for {} texts", texts.len());

        let request = BatchEmbedRequest {
            model: self.model.clone(),
            inputs: texts.to_vec(),
        };

        let response_text = self.post_embed(&serde_json::to_string(&request).map_err(|e| {
            NotedexError::EmbeddingGeneration(format!("failed to serialize request: {e}"))
        })?)?;

        let response: BatchEmbedResponse = serde_json::from_str(&response_text).map_err(|e| {
            NotedexError::EmbeddingGeneration(format!("malformed response: {e}"))
        })?;

        if response.embeddings.len() != texts.len() {
            return Err(NotedexError::EmbeddingGeneration(format!(
                "requested {} embeddings, service returned {}",
                texts.len(),
                response.embeddings.len()
            )));
        }

        if response.embeddings.iter().any(Vec::is_empty) {
            return Err(NotedexError::EmbeddingGeneration(
                "service returned an empty embedding".to_string(),
            ));
        }

        Ok(response.embeddings)
    }

    fn post_embed(&self, request_json: &str) -> Result<String> {
        let url = self.base_url.join("/api/embed").map_err(|e| {
            NotedexError::EmbeddingGeneration(format!("failed to build embed URL: {e}"))
        })?;

        self.agent
            .post(url.as_str())
            .header("Content-Type", "application/json")
            .send(request_json)
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .map_err(|e| NotedexError::EmbeddingGeneration(e.to_string()))
    }
}
