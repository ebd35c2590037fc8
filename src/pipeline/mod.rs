
use chrono::Utc;
use std::path::Path;
use tracing::{debug, info};
use uuid::Uuid;

use crate::chunker;
use crate::config::Config;
use crate::embeddings::EmbeddingClient;
use crate::extract;
use crate::search::{SearchRequest, SearchResult, SimilarityEngine};
use crate::store::Database;
use crate::store::models::{
    ContentKind, Difficulty, Document, FileKind, NewChunk, NewDocument,
};
use crate::{NotedexError, Result};

/// Caller-supplied metadata for a new document.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestRequest {
    pub title: String,
    pub subject: Option<String>,
    pub author: Option<String>,
    pub tags: Vec<String>,
    pub difficulty: Difficulty,
    pub content_kind: ContentKind,
    pub owner_id: Option<String>,
}

/// Orchestrates one document's journey: extract, validate, chunk, embed,
/// persist. Any failure aborts the whole ingestion; the store's transaction
/// guarantees nothing partial survives.
pub struct IngestionPipeline {
    database: Database,
    embedder: EmbeddingClient,
    chunk_size: usize,
    overlap: usize,
    min_text_length: usize,
}

impl IngestionPipeline {
    #[inline]
    pub fn new(database: Database, embedder: EmbeddingClient, config: &Config) -> Self {
        Self {
            database,
            embedder,
            chunk_size: config.chunking.chunk_size,
            overlap: config.chunking.overlap,
            min_text_length: config.ingest.min_text_length,
        }
    }

    /// Ingest a document from a file on disk. The file kind is detected
    /// from the extension and its text extracted before the common path.
    #[inline]
    pub async fn ingest_file(&self, path: &Path, request: IngestRequest) -> Result<Document> {
        let kind = extract::detect_file_kind(path)?;
        let text = extract::extract_text(path, kind)?;
        let file_size = std::fs::metadata(path).map(|m| m.len() as i64).ok();
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_string);

        self.ingest(text, kind, file_name, file_size, request).await
    }

    /// Ingest raw text supplied directly by the caller.
    #[inline]
    pub async fn ingest_text(&self, text: String, request: IngestRequest) -> Result<Document> {
        self.ingest(text, FileKind::DirectText, None, None, request)
            .await
    }

    async fn ingest(
        &self,
        text: String,
        file_kind: FileKind,
        source_file_name: Option<String>,
        file_size_bytes: Option<i64>,
        request: IngestRequest,
    ) -> Result<Document> {
        if text.trim().is_empty() {
            return Err(NotedexError::EmptyInput);
        }
        if text.len() < self.min_text_length {
            return Err(NotedexError::TextTooShort {
                actual: text.len(),
                minimum: self.min_text_length,
            });
        }

        let text_chunks = chunker::chunk(&text, self.chunk_size, self.overlap)?;
        debug!(
            "Chunked '{}' into {} chunks",
            request.title,
            text_chunks.len()
        );

        let chunk_texts: Vec<String> = text_chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.embedder.embed_batch(&chunk_texts)?;

        let chunks: Vec<NewChunk> = text_chunks
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(i, (chunk, embedding))| NewChunk {
                chunk_index: i as i64,
                text: chunk.text,
                embedding,
                start_offset: chunk.start_offset as i64,
                end_offset: chunk.end_offset as i64,
            })
            .collect();

        let new_document = NewDocument {
            id: Uuid::new_v4().to_string(),
            title: request.title,
            source_file_name,
            file_kind,
            file_size_bytes,
            subject: request.subject,
            author: request.author,
            tags: request.tags,
            difficulty: request.difficulty,
            content_kind: request.content_kind,
            owner_id: request.owner_id,
            full_text: text,
            embedding_model: self.embedder.model().to_string(),
            processed_at: Some(Utc::now().naive_utc()),
        };

        let document = self.database.create_document(new_document, chunks).await?;

        info!(
            "Ingested document {} ({} chunks)",
            document.id,
            self.database.chunk_count(&document.id).await?
        );

        Ok(document)
    }
}

/// Orchestrates one search request: embed the query (unless a vector was
/// supplied), then rank against the stored chunks.
pub struct QueryPipeline {
    embedder: EmbeddingClient,
    engine: SimilarityEngine,
}

impl QueryPipeline {
    #[inline]
    pub fn new(embedder: EmbeddingClient, engine: SimilarityEngine) -> Self {
        Self { embedder, engine }
    }

    /// Embed the query text and search. Embedding failure aborts the search.
    #[inline]
    pub async fn search_text(
        &self,
        query: &str,
        request: &SearchRequest,
    ) -> Result<Vec<SearchResult>> {
        let query_vector = self.embedder.embed(query)?;
        self.engine.search(&query_vector, request).await
    }

    /// Search with a pre-computed query vector.
    #[inline]
    pub async fn search_vector(
        &self,
        query_vector: &[f32],
        request: &SearchRequest,
    ) -> Result<Vec<SearchResult>> {
        if query_vector.is_empty() {
            return Err(NotedexError::InvalidArgument(
                "query vector must not be empty".to_string(),
            ));
        }
        self.engine.search(query_vector, request).await
    }
}
