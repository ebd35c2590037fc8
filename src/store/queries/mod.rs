#[cfg(test)]
mod tests;

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use super::models::{
    Document, DocumentChunk, DocumentFilter, DocumentUpdate, NewChunk, NewDocument, ScannedChunk,
    encode_embedding,
};
use crate::{NotedexError, Result};

const DOCUMENT_COLUMNS: &str = "id, title, source_file_name, file_kind, file_size_bytes, \
     subject, author, tags, difficulty, content_kind, owner_id, \
     full_text, embedding_model, created_at, processed_at, updated_at";

pub struct DocumentQueries;

impl DocumentQueries {
    /// Write a document and all of its chunks in one transaction.
    ///
    /// Upsert semantics: an existing document with the same id is replaced
    /// wholesale, chunks included.
    #[inline]
    pub async fn create(
        pool: &SqlitePool,
        new_document: NewDocument,
        chunks: Vec<NewChunk>,
    ) -> Result<Document> {
        validate_chunk_set(&chunks)?;

        let now = Utc::now().naive_utc();
        let tags = serde_json::to_string(&new_document.tags)
            .map_err(|e| NotedexError::InvalidArgument(format!("unserializable tags: {e}")))?;

        let mut transaction = pool.begin().await?;

        // Replacing the row (rather than updating it) keeps the cascade
        // semantics identical for fresh inserts and re-creations.
        sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(&new_document.id)
            .execute(&mut *transaction)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO documents (id, title, source_file_name, file_kind, file_size_bytes,
                                   subject, author, tags, difficulty, content_kind, owner_id,
                                   full_text, embedding_model, created_at, processed_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&new_document.id)
        .bind(&new_document.title)
        .bind(&new_document.source_file_name)
        .bind(new_document.file_kind)
        .bind(new_document.file_size_bytes)
        .bind(&new_document.subject)
        .bind(&new_document.author)
        .bind(&tags)
        .bind(new_document.difficulty)
        .bind(new_document.content_kind)
        .bind(&new_document.owner_id)
        .bind(&new_document.full_text)
        .bind(&new_document.embedding_model)
        .bind(now)
        .bind(new_document.processed_at)
        .bind(now)
        .execute(&mut *transaction)
        .await?;

        for chunk in &chunks {
            sqlx::query(
                r#"
                INSERT INTO chunks (document_id, chunk_index, text, embedding, start_offset, end_offset)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&new_document.id)
            .bind(chunk.chunk_index)
            .bind(&chunk.text)
            .bind(encode_embedding(&chunk.embedding))
            .bind(chunk.start_offset)
            .bind(chunk.end_offset)
            .execute(&mut *transaction)
            .await?;
        }

        transaction.commit().await?;

        debug!(
            "Stored document {} with {} chunks",
            new_document.id,
            chunks.len()
        );

        Self::get_by_id(pool, &new_document.id)
            .await?
            .ok_or_else(|| NotedexError::NotFound(new_document.id))
    }

    #[inline]
    pub async fn get_by_id(pool: &SqlitePool, id: &str) -> Result<Option<Document>> {
        let document = sqlx::query_as::<_, Document>(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(document)
    }

    /// Apply a partial metadata update. Returns the updated document, or
    /// `None` when the id is unknown.
    #[inline]
    pub async fn update(
        pool: &SqlitePool,
        id: &str,
        update: DocumentUpdate,
    ) -> Result<Option<Document>> {
        let mut query_parts = Vec::new();
        let mut query_values = Vec::new();

        if let Some(title) = update.title {
            query_parts.push("title = ?");
            query_values.push(title);
        }

        if let Some(subject) = update.subject {
            query_parts.push("subject = ?");
            query_values.push(subject);
        }

        if let Some(author) = update.author {
            query_parts.push("author = ?");
            query_values.push(author);
        }

        if let Some(tags) = update.tags {
            query_parts.push("tags = ?");
            query_values.push(
                serde_json::to_string(&tags).map_err(|e| {
                    NotedexError::InvalidArgument(format!("unserializable tags: {e}"))
                })?,
            );
        }

        if let Some(difficulty) = update.difficulty {
            query_parts.push("difficulty = ?");
            query_values.push(difficulty.to_string());
        }

        if let Some(content_kind) = update.content_kind {
            query_parts.push("content_kind = ?");
            query_values.push(content_kind.to_string());
        }

        if query_parts.is_empty() {
            return Self::get_by_id(pool, id).await;
        }

        query_parts.push("updated_at = ?");
        let query_str = format!(
            "UPDATE documents SET {} WHERE id = ?",
            query_parts.join(", ")
        );

        let mut query = sqlx::query(&query_str);
        for value in query_values {
            query = query.bind(value);
        }
        query = query.bind(Utc::now().naive_utc()).bind(id);

        query.execute(pool).await?;

        Self::get_by_id(pool, id).await
    }

    /// Delete a document and its chunks in one transaction. Returns whether
    /// anything was deleted.
    #[inline]
    pub async fn delete(pool: &SqlitePool, id: &str) -> Result<bool> {
        let mut transaction = pool.begin().await?;

        sqlx::query("DELETE FROM chunks WHERE document_id = ?")
            .bind(id)
            .execute(&mut *transaction)
            .await?;

        let result = sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(id)
            .execute(&mut *transaction)
            .await?;

        transaction.commit().await?;

        Ok(result.rows_affected() > 0)
    }

    /// List documents newest-first with offset/limit pagination, returning
    /// the page and the total match count.
    #[inline]
    pub async fn list(
        pool: &SqlitePool,
        page: u32,
        page_size: u32,
        filter: &DocumentFilter,
    ) -> Result<(Vec<Document>, i64)> {
        if page == 0 {
            return Err(NotedexError::InvalidArgument(
                "page numbers start at 1".to_string(),
            ));
        }
        if page_size == 0 {
            return Err(NotedexError::InvalidArgument(
                "page size must be at least 1".to_string(),
            ));
        }

        let (where_clause, binds) = filter_where_clause(filter, "");

        let count_query = format!("SELECT COUNT(*) FROM documents{where_clause}");
        let mut count = sqlx::query_scalar(&count_query);
        for value in &binds {
            count = count.bind(value);
        }
        let total: i64 = count.fetch_one(pool).await?;

        let offset = i64::from(page - 1) * i64::from(page_size);
        let list_query = format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents{where_clause} \
             ORDER BY created_at DESC, id ASC LIMIT ? OFFSET ?"
        );

        let mut query = sqlx::query_as::<_, Document>(&list_query);
        for value in &binds {
            query = query.bind(value);
        }
        let documents = query
            .bind(i64::from(page_size))
            .bind(offset)
            .fetch_all(pool)
            .await?;

        Ok((documents, total))
    }
}

pub struct ChunkQueries;

impl ChunkQueries {
    /// Chunks of one document in index order. Embedding blobs are only
    /// decoded when `include_embeddings` is set; the display path skips them.
    #[inline]
    pub async fn list_for_document(
        pool: &SqlitePool,
        document_id: &str,
        include_embeddings: bool,
    ) -> Result<Vec<DocumentChunk>> {
        let embedding_column = if include_embeddings {
            "embedding"
        } else {
            "NULL AS embedding"
        };

        let chunks = sqlx::query_as::<_, DocumentChunk>(&format!(
            "SELECT document_id, chunk_index, text, start_offset, end_offset, {embedding_column} \
             FROM chunks WHERE document_id = ? ORDER BY chunk_index"
        ))
        .bind(document_id)
        .fetch_all(pool)
        .await?;

        Ok(chunks)
    }

    /// The similarity engine's read path: every chunk matching the document
    /// filters, joined with its owning document's metadata.
    #[inline]
    pub async fn scan(pool: &SqlitePool, filter: &DocumentFilter) -> Result<Vec<ScannedChunk>> {
        let (where_clause, binds) = filter_where_clause(filter, "d.");

        let query_str = format!(
            "SELECT c.document_id AS document_id, c.chunk_index AS chunk_index, \
                    c.text AS text, c.embedding AS embedding, \
                    d.title AS doc_title, d.subject AS doc_subject, d.author AS doc_author, \
                    d.difficulty AS doc_difficulty, d.content_kind AS doc_content_kind, \
                    d.owner_id AS doc_owner_id \
             FROM chunks c \
             JOIN documents d ON d.id = c.document_id{where_clause} \
             ORDER BY c.document_id, c.chunk_index"
        );

        let mut query = sqlx::query_as::<_, ScannedChunk>(&query_str);
        for value in &binds {
            query = query.bind(value);
        }
        let chunks = query.fetch_all(pool).await?;

        Ok(chunks)
    }

    #[inline]
    pub async fn count_for_document(pool: &SqlitePool, document_id: &str) -> Result<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM chunks WHERE document_id = ?")
            .bind(document_id)
            .fetch_one(pool)
            .await?;

        Ok(count)
    }

    #[inline]
    pub async fn count_all(pool: &SqlitePool) -> Result<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM chunks")
            .fetch_one(pool)
            .await?;

        Ok(count)
    }
}

fn validate_chunk_set(chunks: &[NewChunk]) -> Result<()> {
    let mut embedding_len = None;

    for (i, chunk) in chunks.iter().enumerate() {
        if chunk.chunk_index != i as i64 {
            return Err(NotedexError::InvalidArgument(format!(
                "chunk indices must be contiguous from 0: found {} at position {i}",
                chunk.chunk_index
            )));
        }
        if chunk.text.is_empty() {
            return Err(NotedexError::InvalidArgument(format!(
                "chunk {i} has empty text"
            )));
        }
        if chunk.end_offset <= chunk.start_offset {
            return Err(NotedexError::InvalidArgument(format!(
                "chunk {i} has end offset {} not after start offset {}",
                chunk.end_offset, chunk.start_offset
            )));
        }

        match embedding_len {
            None => embedding_len = Some(chunk.embedding.len()),
            Some(expected) if chunk.embedding.len() != expected => {
                return Err(NotedexError::DimensionMismatch {
                    expected,
                    actual: chunk.embedding.len(),
                });
            }
            Some(_) => {}
        }
    }

    if embedding_len == Some(0) {
        return Err(NotedexError::InvalidArgument(
            "chunk embeddings must not be empty".to_string(),
        ));
    }

    Ok(())
}

fn filter_where_clause(filter: &DocumentFilter, prefix: &str) -> (String, Vec<String>) {
    let mut clauses = Vec::new();
    let mut binds = Vec::new();

    if let Some(subject) = &filter.subject {
        clauses.push(format!("{prefix}subject = ?"));
        binds.push(subject.clone());
    }
    if let Some(author) = &filter.author {
        clauses.push(format!("{prefix}author = ?"));
        binds.push(author.clone());
    }
    if let Some(content_kind) = filter.content_kind {
        clauses.push(format!("{prefix}content_kind = ?"));
        binds.push(content_kind.to_string());
    }
    if let Some(difficulty) = filter.difficulty {
        clauses.push(format!("{prefix}difficulty = ?"));
        binds.push(difficulty.to_string());
    }
    if let Some(owner_id) = &filter.owner_id {
        clauses.push(format!("{prefix}owner_id = ?"));
        binds.push(owner_id.clone());
    }

    if clauses.is_empty() {
        (String::new(), binds)
    } else {
        (format!(" WHERE {}", clauses.join(" AND ")), binds)
    }
}
