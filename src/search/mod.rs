
use tracing::debug;

use crate::config::SearchConfig;
use crate::store::Database;
use crate::store::models::{DocumentFilter, DocumentSummary};
use crate::{NotedexError, Result};

/// A ranked chunk returned by the similarity scan.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub document_id: String,
    pub chunk_index: i64,
    pub text: String,
    pub similarity: f32,
    pub document: DocumentSummary,
}

/// Per-request knobs. Unset fields fall back to the configured defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchRequest {
    pub limit: Option<usize>,
    pub threshold: Option<f32>,
    pub filter: DocumentFilter,
}

/// Cosine similarity between two vectors of equal length.
///
/// Defined as 0 when either vector has zero norm.
#[inline]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(NotedexError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }

    Ok(dot / (norm_a * norm_b))
}

/// Brute-force ranked retrieval over the stored chunk vectors.
///
/// Every chunk matching the filters is scored; runtime is linear in the
/// size of the filtered corpus. Exact by construction, and the `search`
/// signature is the stable boundary should an index ever be layered behind
/// it.
pub struct SimilarityEngine {
    database: Database,
    default_threshold: f32,
    default_limit: usize,
}

impl SimilarityEngine {
    #[inline]
    pub fn new(database: Database, config: &SearchConfig) -> Self {
        Self {
            database,
            default_threshold: config.similarity_threshold,
            default_limit: config.result_limit,
        }
    }

    /// Score, rank and truncate. Ties are broken by `(document_id,
    /// chunk_index)` ascending so results are deterministic.
    #[inline]
    pub async fn search(
        &self,
        query_vector: &[f32],
        request: &SearchRequest,
    ) -> Result<Vec<SearchResult>> {
        let limit = request.limit.unwrap_or(self.default_limit);
        if limit < 1 {
            return Err(NotedexError::InvalidArgument(
                "result limit must be at least 1".to_string(),
            ));
        }
        let threshold = request.threshold.unwrap_or(self.default_threshold);

        let scanned = self.database.scan_chunks(&request.filter).await?;
        debug!("Scoring {} chunks against query vector", scanned.len());

        let mut results = Vec::new();
        for chunk in scanned {
            let similarity = cosine_similarity(query_vector, &chunk.embedding)?;
            if similarity >= threshold {
                results.push(SearchResult {
                    document_id: chunk.document_id,
                    chunk_index: chunk.chunk_index,
                    text: chunk.text,
                    similarity,
                    document: chunk.document,
                });
            }
        }

        results.sort_by(|a, b| {
            b.similarity
                .total_cmp(&a.similarity)
                .then_with(|| a.document_id.cmp(&b.document_id))
                .then_with(|| a.chunk_index.cmp(&b.chunk_index))
        });
        results.truncate(limit);

        Ok(results)
    }
}
