
pub mod models;
pub mod queries;

use anyhow::Context;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use tracing::{debug, info};

use crate::config::Config;
use crate::{NotedexError, Result};
use models::{
    Document, DocumentChunk, DocumentFilter, DocumentUpdate, NewChunk, NewDocument, ScannedChunk,
};
use queries::{ChunkQueries, DocumentQueries};

pub type DbPool = Pool<Sqlite>;

/// Durable store for documents, chunks and their embedding vectors.
///
/// The store is the single source of truth: writes to a document and its
/// chunks happen in one transaction, so either everything lands or nothing
/// does.
#[derive(Debug, Clone)]
pub struct Database {
    pool: DbPool,
}

impl Database {
    pub async fn new<P: AsRef<Path>>(database_path: P) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(database_path)
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .connect_with(options)
            .await?;

        let database = Self { pool };
        database.run_migrations().await?;

        Ok(database)
    }

    pub async fn from_config(config: &Config) -> Result<Self> {
        std::fs::create_dir_all(&config.base_dir)?;
        Self::new(config.database_path()).await
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub async fn run_migrations(&self) -> Result<()> {
        info!("Running database migrations");

        sqlx::migrate!("src/store/migrations")
            .run(&self.pool)
            .await
            .context("Failed to run schema migration")?;

        debug!("Database migrations completed successfully");
        Ok(())
    }

    /// Atomically persist a document and its chunks. An existing document
    /// with the same id is replaced along with all of its chunks.
    pub async fn create_document(
        &self,
        new_document: NewDocument,
        chunks: Vec<NewChunk>,
    ) -> Result<Document> {
        DocumentQueries::create(&self.pool, new_document, chunks).await
    }

    pub async fn get_document(&self, id: &str) -> Result<Option<Document>> {
        DocumentQueries::get_by_id(&self.pool, id).await
    }

    /// Fetch a document together with its chunks in index order. Chunk
    /// embeddings are not loaded on this path.
    pub async fn get_document_with_chunks(
        &self,
        id: &str,
    ) -> Result<Option<(Document, Vec<DocumentChunk>)>> {
        let Some(document) = DocumentQueries::get_by_id(&self.pool, id).await? else {
            return Ok(None);
        };

        let chunks = ChunkQueries::list_for_document(&self.pool, id, false).await?;
        Ok(Some((document, chunks)))
    }

    /// Update mutable metadata fields. Fails with `NotFound` for an unknown id.
    pub async fn update_document(&self, id: &str, update: DocumentUpdate) -> Result<Document> {
        DocumentQueries::update(&self.pool, id, update)
            .await?
            .ok_or_else(|| NotedexError::NotFound(id.to_string()))
    }

    /// Delete a document and all of its chunks. Returns `false` (not an
    /// error) when the id was absent.
    pub async fn delete_document(&self, id: &str) -> Result<bool> {
        DocumentQueries::delete(&self.pool, id).await
    }

    pub async fn list_documents(
        &self,
        page: u32,
        page_size: u32,
        filter: &DocumentFilter,
    ) -> Result<(Vec<Document>, i64)> {
        DocumentQueries::list(&self.pool, page, page_size, filter).await
    }

    /// The similarity engine's read path: all chunks matching the filters,
    /// with embeddings and owning-document metadata.
    pub async fn scan_chunks(&self, filter: &DocumentFilter) -> Result<Vec<ScannedChunk>> {
        ChunkQueries::scan(&self.pool, filter).await
    }

    pub async fn chunk_count(&self, document_id: &str) -> Result<i64> {
        ChunkQueries::count_for_document(&self.pool, document_id).await
    }

    pub async fn total_chunk_count(&self) -> Result<i64> {
        ChunkQueries::count_all(&self.pool).await
    }
}
