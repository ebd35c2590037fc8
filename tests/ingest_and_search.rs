//! End-to-end exercise of the ingest and search pipelines against a mock
//! embedding service and a temporary SQLite database.

use serde_json::json;
use std::hash::{DefaultHasher, Hash, Hasher};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

use notedex::config::{ChunkingConfig, Config, IngestConfig, OllamaConfig};
use notedex::embeddings::EmbeddingClient;
use notedex::pipeline::{IngestRequest, IngestionPipeline, QueryPipeline};
use notedex::search::{SearchRequest, SimilarityEngine};
use notedex::store::Database;
use notedex::store::models::{ContentKind, Difficulty, DocumentFilter};

const DIM: usize = 4;

fn fake_embedding(text: &str) -> Vec<f32> {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    let hash = hasher.finish();

    let raw: Vec<f32> = (0..DIM)
        .map(|i| ((hash >> (i * 16)) & 0xffff) as f32 + 1.0)
        .collect();
    let norm = raw.iter().map(|x| x * x).sum::<f32>().sqrt();
    raw.iter().map(|x| x / norm).collect()
}

struct EmbedResponder;

impl Respond for EmbedResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: serde_json::Value =
            serde_json::from_slice(&request.body).expect("request body is JSON");

        if let Some(inputs) = body.get("input").and_then(|v| v.as_array()) {
            let embeddings: Vec<Vec<f32>> = inputs
                .iter()
                .map(|t| fake_embedding(t.as_str().expect("inputs are strings")))
                .collect();
            ResponseTemplate::new(200).set_body_json(json!({ "embeddings": embeddings }))
        } else {
            let prompt = body.get("prompt").and_then(|v| v.as_str()).unwrap_or("");
            ResponseTemplate::new(200).set_body_json(json!({ "embedding": fake_embedding(prompt) }))
        }
    }
}

struct Harness {
    _temp_dir: TempDir,
    database: Database,
    ingestion: IngestionPipeline,
    query: QueryPipeline,
}

async fn harness(server: &MockServer) -> Harness {
    let temp_dir = TempDir::new().expect("can create temp dir");

    let config = Config {
        ollama: OllamaConfig {
            host: server.address().ip().to_string(),
            port: server.address().port(),
            embedding_dimension: DIM as u32,
            ..OllamaConfig::default()
        },
        chunking: ChunkingConfig {
            chunk_size: 120,
            overlap: 30,
        },
        ingest: IngestConfig {
            min_text_length: 20,
        },
        base_dir: temp_dir.path().to_path_buf(),
        ..Config::load(temp_dir.path()).expect("defaults load")
    };

    let database = Database::from_config(&config)
        .await
        .expect("database initializes");
    let embedder = EmbeddingClient::new(&config).expect("client builds");
    let ingestion = IngestionPipeline::new(database.clone(), embedder.clone(), &config);
    let engine = SimilarityEngine::new(database.clone(), &config.search);
    let query = QueryPipeline::new(embedder, engine);

    Harness {
        _temp_dir: temp_dir,
        database,
        ingestion,
        query,
    }
}

fn metadata(title: &str, subject: &str, difficulty: Difficulty) -> IngestRequest {
    IngestRequest {
        title: title.to_string(),
        subject: Some(subject.to_string()),
        author: Some("Integration Bot".to_string()),
        tags: vec![subject.to_string()],
        difficulty,
        content_kind: ContentKind::Notes,
        owner_id: Some("owner-1".to_string()),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn full_corpus_lifecycle() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(EmbedResponder)
        .mount(&server)
        .await;

    let h = harness(&server).await;

    // Ingest a small corpus across two subjects.
    let kinematics = "An object in motion stays in motion unless acted on by an outside force. \
                      Velocity is the rate of change of position with respect to time."
        .to_string();
    let physics_doc = h
        .ingestion
        .ingest_text(kinematics, metadata("Kinematics", "physics", Difficulty::Easy))
        .await
        .expect("ingest succeeds");

    h.ingestion
        .ingest_text(
            "Cells divide through mitosis, producing two identical daughter cells from one parent."
                .to_string(),
            metadata("Cell division", "biology", Difficulty::Medium),
        )
        .await
        .expect("ingest succeeds");

    let (_, total) = h
        .database
        .list_documents(1, 10, &DocumentFilter::default())
        .await
        .expect("list succeeds");
    assert_eq!(total, 2);

    // A query identical to a stored chunk's text ranks that chunk first with
    // similarity 1.0.
    let (_, chunks) = h
        .database
        .get_document_with_chunks(&physics_doc.id)
        .await
        .expect("get succeeds")
        .expect("document exists");
    let first_chunk_text = chunks[0].text.clone();

    let results = h
        .query
        .search_text(
            &first_chunk_text,
            &SearchRequest {
                threshold: Some(0.99),
                ..SearchRequest::default()
            },
        )
        .await
        .expect("search succeeds");
    assert_eq!(results[0].document_id, physics_doc.id);
    assert!((results[0].similarity - 1.0).abs() < 1e-5);

    // Metadata filters constrain results to the matching subject.
    let filtered = h
        .query
        .search_text(
            &first_chunk_text,
            &SearchRequest {
                threshold: Some(-1.0),
                filter: DocumentFilter {
                    subject: Some("biology".to_string()),
                    ..DocumentFilter::default()
                },
                ..SearchRequest::default()
            },
        )
        .await
        .expect("search succeeds");
    assert!(filtered.iter().all(|r| r.document_id != physics_doc.id));

    // Deleting the physics document removes its chunks from the scan.
    assert!(
        h.database
            .delete_document(&physics_doc.id)
            .await
            .expect("delete succeeds")
    );
    let after_delete = h
        .query
        .search_text(
            &first_chunk_text,
            &SearchRequest {
                threshold: Some(-1.0),
                ..SearchRequest::default()
            },
        )
        .await
        .expect("search succeeds");
    assert!(after_delete.iter().all(|r| r.document_id != physics_doc.id));
}

#[tokio::test(flavor = "multi_thread")]
async fn limit_caps_results_across_documents() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(EmbedResponder)
        .mount(&server)
        .await;

    let h = harness(&server).await;

    for i in 0..5 {
        h.ingestion
            .ingest_text(
                format!("Study document number {i} about a recurring subject, padded for length."),
                metadata(&format!("Doc {i}"), "physics", Difficulty::Medium),
            )
            .await
            .expect("ingest succeeds");
    }

    let results = h
        .query
        .search_text(
            "a recurring subject",
            &SearchRequest {
                limit: Some(2),
                threshold: Some(-1.0),
                ..SearchRequest::default()
            },
        )
        .await
        .expect("search succeeds");

    assert_eq!(results.len(), 2);
    assert!(results[0].similarity >= results[1].similarity);
}
