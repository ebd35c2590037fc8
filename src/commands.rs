use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::Result;
use crate::config::{Config, default_config_dir};
use crate::embeddings::EmbeddingClient;
use crate::pipeline::{IngestRequest, IngestionPipeline, QueryPipeline};
use crate::search::{SearchRequest, SimilarityEngine};
use crate::store::Database;
use crate::store::models::{Document, DocumentFilter, DocumentUpdate};

async fn open_stack() -> Result<(Config, Database)> {
    let config_dir = default_config_dir()?;
    let config = Config::load(&config_dir)?;
    let database = Database::from_config(&config).await?;
    Ok((config, database))
}

fn embedding_spinner(message: &'static str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg}").expect("static template is valid"),
    );
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

fn print_document_line(document: &Document) {
    println!(
        "{} (ID: {})",
        style(&document.title).bold(),
        document.id
    );
    if let Some(subject) = &document.subject {
        println!("   Subject: {subject}");
    }
    if let Some(author) = &document.author {
        println!("   Author: {author}");
    }
    println!(
        "   Kind: {} | Content: {} | Difficulty: {}",
        document.file_kind, document.content_kind, document.difficulty
    );
    if !document.tags.is_empty() {
        println!("   Tags: {}", document.tags.join(", "));
    }
    println!("   Created: {}", document.created_at);
}

fn snippet(text: &str, max_len: usize) -> String {
    let flattened = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flattened.len() <= max_len {
        return flattened;
    }

    let mut cut = max_len;
    while !flattened.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…", flattened.get(..cut).unwrap_or_default())
}

/// Ingest a document from a file on disk.
#[inline]
pub async fn ingest_file(path: &Path, request: IngestRequest) -> Result<()> {
    info!("Ingesting file: {}", path.display());

    let (config, database) = open_stack().await?;
    let embedder = EmbeddingClient::new(&config)?;
    let pipeline = IngestionPipeline::new(database.clone(), embedder, &config);

    let spinner = embedding_spinner("Extracting, chunking and embedding...");
    let result = pipeline.ingest_file(path, request).await;
    spinner.finish_and_clear();

    let document = result?;
    let chunk_count = database.chunk_count(&document.id).await?;

    println!("Ingested {}", style(&document.title).bold());
    println!("   ID: {}", document.id);
    println!("   Chunks: {chunk_count}");
    println!("   Model: {}", document.embedding_model);
    Ok(())
}

/// Ingest raw text passed on the command line.
#[inline]
pub async fn ingest_text(text: String, request: IngestRequest) -> Result<()> {
    let (config, database) = open_stack().await?;
    let embedder = EmbeddingClient::new(&config)?;
    let pipeline = IngestionPipeline::new(database.clone(), embedder, &config);

    let spinner = embedding_spinner("Chunking and embedding...");
    let result = pipeline.ingest_text(text, request).await;
    spinner.finish_and_clear();

    let document = result?;
    let chunk_count = database.chunk_count(&document.id).await?;

    println!("Ingested {}", style(&document.title).bold());
    println!("   ID: {}", document.id);
    println!("   Chunks: {chunk_count}");
    Ok(())
}

/// Run a semantic search and print the ranked results.
#[inline]
pub async fn search(query: &str, request: SearchRequest) -> Result<()> {
    let (config, database) = open_stack().await?;
    let embedder = EmbeddingClient::new(&config)?;
    let engine = SimilarityEngine::new(database, &config.search);
    let pipeline = QueryPipeline::new(embedder, engine);

    let spinner = embedding_spinner("Searching...");
    let result = pipeline.search_text(query, &request).await;
    spinner.finish_and_clear();

    let results = result?;
    if results.is_empty() {
        println!("No results above the similarity threshold.");
        return Ok(());
    }

    println!("{} results:", results.len());
    println!();
    for (rank, hit) in results.iter().enumerate() {
        println!(
            "{:2}. {} {} (chunk {})",
            rank + 1,
            style(format!("{:.3}", hit.similarity)).green(),
            style(&hit.document.title).bold(),
            hit.chunk_index
        );
        if let Some(subject) = &hit.document.subject {
            println!("     Subject: {subject}");
        }
        println!("     {}", snippet(&hit.text, 160));
    }
    Ok(())
}

/// List stored documents with pagination and optional filters.
#[inline]
pub async fn list_documents(page: u32, page_size: u32, filter: DocumentFilter) -> Result<()> {
    let (_config, database) = open_stack().await?;

    let (documents, total) = database.list_documents(page, page_size, &filter).await?;

    if documents.is_empty() {
        println!("No documents found.");
        return Ok(());
    }

    println!("Documents ({total} total, page {page}):");
    println!();
    for document in &documents {
        print_document_line(document);
        println!();
    }
    Ok(())
}

/// Show one document, optionally with its chunks.
#[inline]
pub async fn show_document(id: &str, with_chunks: bool) -> Result<()> {
    let (_config, database) = open_stack().await?;

    if with_chunks {
        let Some((document, chunks)) = database.get_document_with_chunks(id).await? else {
            println!("Document not found: {id}");
            return Ok(());
        };

        print_document_line(&document);
        println!("   Text length: {} bytes", document.full_text.len());
        println!();
        println!("Chunks ({}):", chunks.len());
        for chunk in &chunks {
            println!(
                "  [{}] bytes {}..{}: {}",
                chunk.chunk_index,
                chunk.start_offset,
                chunk.end_offset,
                snippet(&chunk.text, 120)
            );
        }
    } else {
        let Some(document) = database.get_document(id).await? else {
            println!("Document not found: {id}");
            return Ok(());
        };

        print_document_line(&document);
        println!("   Text length: {} bytes", document.full_text.len());
        println!(
            "   Chunks: {} (use --chunks to list them)",
            database.chunk_count(id).await?
        );
    }
    Ok(())
}

/// Update mutable metadata on a document.
#[inline]
pub async fn update_document(id: &str, update: DocumentUpdate) -> Result<()> {
    let (_config, database) = open_stack().await?;

    let document = database.update_document(id, update).await?;
    println!("Updated {}", style(&document.title).bold());
    print_document_line(&document);
    Ok(())
}

/// Delete a document and all of its chunks.
#[inline]
pub async fn delete_document(id: &str) -> Result<()> {
    let (_config, database) = open_stack().await?;

    if database.delete_document(id).await? {
        println!("Deleted document {id}");
    } else {
        println!("Document not found: {id}");
    }
    Ok(())
}

/// Print corpus-level statistics.
#[inline]
pub async fn show_stats() -> Result<()> {
    let (config, database) = open_stack().await?;

    let (_, total_documents) = database
        .list_documents(1, 1, &DocumentFilter::default())
        .await?;
    let total_chunks = database.total_chunk_count().await?;

    println!("Database: {}", config.database_path().display());
    println!("Documents: {total_documents}");
    println!("Chunks: {total_chunks}");
    println!("Embedding model: {}", config.ollama.model);
    println!(
        "Embedding dimension: {}",
        config.ollama.embedding_dimension
    );
    Ok(())
}

/// Print the active configuration.
#[inline]
pub fn show_config() -> Result<()> {
    let config_dir = default_config_dir()?;
    let config = Config::load(&config_dir)?;

    println!("Config file: {}", config.config_file_path().display());
    println!();
    println!("{}", toml::to_string_pretty(&config).map_err(anyhow::Error::from)?);
    Ok(())
}

/// Write the default configuration file if none exists yet.
#[inline]
pub fn init_config() -> Result<()> {
    let config_dir = default_config_dir()?;
    let config = Config::load(&config_dir)?;

    if config.config_file_path().exists() {
        println!(
            "Config already exists at {}",
            config.config_file_path().display()
        );
        return Ok(());
    }

    config.save()?;
    println!("Wrote {}", config.config_file_path().display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snippet_shortens_and_flattens() {
        let text = "line one\nline two   with   gaps";
        assert_eq!(snippet(text, 200), "line one line two with gaps");

        let long = "word ".repeat(100);
        let short = snippet(&long, 40);
        assert!(short.chars().count() <= 41);
        assert!(short.ends_with('…'));
    }

    #[test]
    fn snippet_respects_char_boundaries() {
        let text = "héllo wörld ".repeat(20);
        let short = snippet(&text, 21);
        assert!(short.ends_with('…'));
    }
}
