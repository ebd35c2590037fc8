use super::*;
use crate::store::Database;
use crate::store::models::{ContentKind, Difficulty, FileKind};
use tempfile::TempDir;

async fn create_test_database() -> (TempDir, Database) {
    let temp_dir = TempDir::new().expect("can create temp dir");
    let database = Database::new(temp_dir.path().join("test.db"))
        .await
        .expect("can create database");
    (temp_dir, database)
}

fn sample_document(id: &str) -> NewDocument {
    NewDocument {
        id: id.to_string(),
        title: format!("Document {id}"),
        source_file_name: None,
        file_kind: FileKind::DirectText,
        file_size_bytes: None,
        subject: Some("physics".to_string()),
        author: None,
        tags: vec!["mechanics".to_string()],
        difficulty: Difficulty::Medium,
        content_kind: ContentKind::Notes,
        owner_id: None,
        full_text: "Newton's laws of motion describe the relationship between forces and movement."
            .to_string(),
        embedding_model: "test-model".to_string(),
        processed_at: None,
    }
}

fn sample_chunks(count: usize) -> Vec<NewChunk> {
    (0..count)
        .map(|i| NewChunk {
            chunk_index: i as i64,
            text: format!("chunk {i}"),
            embedding: vec![i as f32, 1.0, 0.0],
            start_offset: (i * 10) as i64,
            end_offset: (i * 10 + 10) as i64,
        })
        .collect()
}

#[tokio::test]
async fn create_rejects_non_contiguous_indices() {
    let (_temp_dir, database) = create_test_database().await;

    let mut chunks = sample_chunks(2);
    chunks[1].chunk_index = 5;

    let result = DocumentQueries::create(database.pool(), sample_document("doc-1"), chunks).await;
    assert!(matches!(result, Err(NotedexError::InvalidArgument(_))));
}

#[tokio::test]
async fn create_rejects_empty_chunk_text() {
    let (_temp_dir, database) = create_test_database().await;

    let mut chunks = sample_chunks(2);
    chunks[1].text.clear();

    let result = DocumentQueries::create(database.pool(), sample_document("doc-1"), chunks).await;
    assert!(matches!(result, Err(NotedexError::InvalidArgument(_))));
}

#[tokio::test]
async fn create_rejects_inverted_offsets() {
    let (_temp_dir, database) = create_test_database().await;

    let mut chunks = sample_chunks(1);
    chunks[0].end_offset = chunks[0].start_offset;

    let result = DocumentQueries::create(database.pool(), sample_document("doc-1"), chunks).await;
    assert!(matches!(result, Err(NotedexError::InvalidArgument(_))));
}

#[tokio::test]
async fn create_rejects_mixed_embedding_dimensions() {
    let (_temp_dir, database) = create_test_database().await;

    let mut chunks = sample_chunks(2);
    chunks[1].embedding = vec![1.0, 2.0];

    let result = DocumentQueries::create(database.pool(), sample_document("doc-1"), chunks).await;
    assert!(matches!(
        result,
        Err(NotedexError::DimensionMismatch {
            expected: 3,
            actual: 2
        })
    ));
}

#[tokio::test]
async fn create_allows_chunkless_document() {
    let (_temp_dir, database) = create_test_database().await;

    let document =
        DocumentQueries::create(database.pool(), sample_document("doc-1"), Vec::new())
            .await
            .expect("create succeeds");

    assert_eq!(document.id, "doc-1");
    let count = ChunkQueries::count_for_document(database.pool(), "doc-1")
        .await
        .expect("count succeeds");
    assert_eq!(count, 0);
}

#[tokio::test]
async fn delete_missing_document_returns_false() {
    let (_temp_dir, database) = create_test_database().await;

    let deleted = DocumentQueries::delete(database.pool(), "no-such-id")
        .await
        .expect("delete succeeds");
    assert!(!deleted);
}

#[tokio::test]
async fn update_with_no_fields_returns_current_row() {
    let (_temp_dir, database) = create_test_database().await;

    let created =
        DocumentQueries::create(database.pool(), sample_document("doc-1"), sample_chunks(1))
            .await
            .expect("create succeeds");

    let updated = DocumentQueries::update(database.pool(), "doc-1", DocumentUpdate::default())
        .await
        .expect("update succeeds")
        .expect("document exists");

    assert_eq!(updated, created);
}

#[tokio::test]
async fn update_missing_document_returns_none() {
    let (_temp_dir, database) = create_test_database().await;

    let result = DocumentQueries::update(
        database.pool(),
        "no-such-id",
        DocumentUpdate {
            title: Some("new title".to_string()),
            ..DocumentUpdate::default()
        },
    )
    .await
    .expect("update query succeeds");

    assert!(result.is_none());
}

#[tokio::test]
async fn list_rejects_zero_page_and_page_size() {
    let (_temp_dir, database) = create_test_database().await;

    let filter = DocumentFilter::default();
    assert!(matches!(
        DocumentQueries::list(database.pool(), 0, 10, &filter).await,
        Err(NotedexError::InvalidArgument(_))
    ));
    assert!(matches!(
        DocumentQueries::list(database.pool(), 1, 0, &filter).await,
        Err(NotedexError::InvalidArgument(_))
    ));
}

#[tokio::test]
async fn scan_decodes_stored_embeddings() {
    let (_temp_dir, database) = create_test_database().await;

    DocumentQueries::create(database.pool(), sample_document("doc-1"), sample_chunks(3))
        .await
        .expect("create succeeds");

    let scanned = ChunkQueries::scan(database.pool(), &DocumentFilter::default())
        .await
        .expect("scan succeeds");

    assert_eq!(scanned.len(), 3);
    for (i, chunk) in scanned.iter().enumerate() {
        assert_eq!(chunk.chunk_index, i as i64);
        assert_eq!(chunk.embedding, vec![i as f32, 1.0, 0.0]);
        assert_eq!(chunk.document.subject.as_deref(), Some("physics"));
    }
}
