
pub mod cache;
pub mod ollama;

use std::sync::Arc;
use tracing::debug;

use crate::config::Config;
use crate::{NotedexError, Result};
use cache::EmbeddingCache;
use ollama::OllamaClient;

/// Embedding front-end: cache lookups, sub-batching, and dimension checks
/// around the external generator.
///
/// Failures from the generator surface immediately; there is no internal
/// retry, and a batch either fully succeeds or fully fails.
#[derive(Clone)]
pub struct EmbeddingClient {
    provider: OllamaClient,
    cache: Arc<EmbeddingCache>,
    dimension: usize,
    max_batch_size: usize,
}

impl EmbeddingClient {
    #[inline]
    pub fn new(config: &Config) -> Result<Self> {
        let provider = OllamaClient::new(&config.ollama)?;
        let cache = Arc::new(EmbeddingCache::from_config(&config.cache));
        Ok(Self::with_cache(
            provider,
            cache,
            config.ollama.embedding_dimension as usize,
            config.ollama.batch_size as usize,
        ))
    }

    #[inline]
    pub fn with_cache(
        provider: OllamaClient,
        cache: Arc<EmbeddingCache>,
        dimension: usize,
        max_batch_size: usize,
    ) -> Self {
        Self {
            provider,
            cache,
            dimension,
            max_batch_size,
        }
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    pub fn model(&self) -> &str {
        self.provider.model()
    }

    /// Embed a single text, consulting the cache first.
    #[inline]
    pub fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(NotedexError::EmptyInput);
        }

        if let Some(vector) = self.cache.get(text) {
            debug!("Embedding cache hit (length: {})", text.len());
            return Ok(vector);
        }

        let vector = self.provider.generate(text)?;
        self.check_dimension(&vector)?;
        self.cache.put(text, vector.clone());
        Ok(vector)
    }

    /// Embed several texts, preserving input order.
    ///
    /// The input is partitioned into sub-batches no larger than the
    /// configured maximum; within each sub-batch only cache misses are sent
    /// to the generator.
    #[inline]
    pub fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.iter().any(|t| t.trim().is_empty()) {
            return Err(NotedexError::EmptyInput);
        }

        let mut results = Vec::with_capacity(texts.len());
        for sub_batch in texts.chunks(self.max_batch_size.max(1)) {
            results.extend(self.embed_sub_batch(sub_batch)?);
        }
        Ok(results)
    }

    fn embed_sub_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut results: Vec<Option<Vec<f32>>> = Vec::with_capacity(texts.len());
        let mut missing_texts = Vec::new();
        let mut missing_indices = Vec::new();

        for (i, text) in texts.iter().enumerate() {
            match self.cache.get(text) {
                Some(vector) => results.push(Some(vector)),
                None => {
                    missing_texts.push(text.clone());
                    missing_indices.push(i);
                    results.push(None);
                }
            }
        }

        if !missing_texts.is_empty() {
            debug!(
                "Embedding cache missed {} of {} texts",
                missing_texts.len(),
                texts.len()
            );

            let generated = self.provider.generate_batch(&missing_texts)?;
            for vector in &generated {
                self.check_dimension(vector)?;
            }

            for ((index, text), vector) in
                missing_indices.into_iter().zip(&missing_texts).zip(generated)
            {
                self.cache.put(text, vector.clone());
                results[index] = Some(vector);
            }
        }

        Ok(results
            .into_iter()
            .map(|r| r.expect("every slot filled by cache or generator"))
            .collect())
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(NotedexError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        Ok(())
    }
}
