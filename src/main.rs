use clap::{Parser, Subcommand};
use std::path::PathBuf;

use notedex::pipeline::IngestRequest;
use notedex::search::SearchRequest;
use notedex::store::models::{ContentKind, Difficulty, DocumentFilter, DocumentUpdate};
use notedex::{NotedexError, Result, commands};

#[derive(Parser)]
#[command(name = "notedex")]
#[command(about = "Document embedding and semantic search for study material")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest a document from a file (pdf, txt, md)
    Ingest {
        /// Path of the file to ingest
        file: PathBuf,
        /// Document title; defaults to the file name
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        subject: Option<String>,
        #[arg(long)]
        author: Option<String>,
        /// Comma-separated tags
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
        /// easy, medium or hard
        #[arg(long, default_value = "medium")]
        difficulty: String,
        /// notes, exam, summary, exercise or reference
        #[arg(long, default_value = "notes")]
        content_kind: String,
        /// Opaque owner reference
        #[arg(long)]
        owner: Option<String>,
    },
    /// Ingest raw text passed as an argument
    IngestText {
        /// The document text
        text: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        subject: Option<String>,
        #[arg(long)]
        author: Option<String>,
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
        #[arg(long, default_value = "medium")]
        difficulty: String,
        #[arg(long, default_value = "notes")]
        content_kind: String,
        #[arg(long)]
        owner: Option<String>,
    },
    /// Search stored documents by semantic similarity
    Search {
        /// The query text
        query: String,
        /// Maximum number of results
        #[arg(long)]
        limit: Option<usize>,
        /// Minimum cosine similarity for a result
        #[arg(long)]
        threshold: Option<f32>,
        #[arg(long)]
        subject: Option<String>,
        #[arg(long)]
        author: Option<String>,
        #[arg(long)]
        difficulty: Option<String>,
        #[arg(long)]
        content_kind: Option<String>,
        #[arg(long)]
        owner: Option<String>,
    },
    /// List stored documents
    List {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 20)]
        page_size: u32,
        #[arg(long)]
        subject: Option<String>,
        #[arg(long)]
        author: Option<String>,
        #[arg(long)]
        difficulty: Option<String>,
        #[arg(long)]
        content_kind: Option<String>,
        #[arg(long)]
        owner: Option<String>,
    },
    /// Show one document
    Show {
        /// Document id
        id: String,
        /// Also list the document's chunks
        #[arg(long)]
        chunks: bool,
    },
    /// Update document metadata
    Update {
        /// Document id
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        subject: Option<String>,
        #[arg(long)]
        author: Option<String>,
        #[arg(long, value_delimiter = ',')]
        tags: Option<Vec<String>>,
        #[arg(long)]
        difficulty: Option<String>,
        #[arg(long)]
        content_kind: Option<String>,
    },
    /// Delete a document and its chunks
    Delete {
        /// Document id
        id: String,
    },
    /// Show corpus statistics
    Stats,
    /// Show or initialize the configuration
    Config {
        /// Write the default config file if missing
        #[arg(long)]
        init: bool,
    },
}

fn parse_difficulty(value: &str) -> Result<Difficulty> {
    value.parse().map_err(NotedexError::InvalidArgument)
}

fn parse_content_kind(value: &str) -> Result<ContentKind> {
    value.parse().map_err(NotedexError::InvalidArgument)
}

fn build_ingest_request(
    title: String,
    subject: Option<String>,
    author: Option<String>,
    tags: Vec<String>,
    difficulty: &str,
    content_kind: &str,
    owner: Option<String>,
) -> Result<IngestRequest> {
    Ok(IngestRequest {
        title,
        subject,
        author,
        tags,
        difficulty: parse_difficulty(difficulty)?,
        content_kind: parse_content_kind(content_kind)?,
        owner_id: owner,
    })
}

fn build_filter(
    subject: Option<String>,
    author: Option<String>,
    difficulty: Option<String>,
    content_kind: Option<String>,
    owner: Option<String>,
) -> Result<DocumentFilter> {
    Ok(DocumentFilter {
        subject,
        author,
        content_kind: content_kind.as_deref().map(parse_content_kind).transpose()?,
        difficulty: difficulty.as_deref().map(parse_difficulty).transpose()?,
        owner_id: owner,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Ingest {
            file,
            title,
            subject,
            author,
            tags,
            difficulty,
            content_kind,
            owner,
        } => {
            let title = title.unwrap_or_else(|| {
                file.file_stem()
                    .and_then(|stem| stem.to_str())
                    .unwrap_or("Untitled")
                    .to_string()
            });
            let request = build_ingest_request(
                title,
                subject,
                author,
                tags,
                &difficulty,
                &content_kind,
                owner,
            )?;
            commands::ingest_file(&file, request).await?;
        }
        Commands::IngestText {
            text,
            title,
            subject,
            author,
            tags,
            difficulty,
            content_kind,
            owner,
        } => {
            let request = build_ingest_request(
                title,
                subject,
                author,
                tags,
                &difficulty,
                &content_kind,
                owner,
            )?;
            commands::ingest_text(text, request).await?;
        }
        Commands::Search {
            query,
            limit,
            threshold,
            subject,
            author,
            difficulty,
            content_kind,
            owner,
        } => {
            let request = SearchRequest {
                limit,
                threshold,
                filter: build_filter(subject, author, difficulty, content_kind, owner)?,
            };
            commands::search(&query, request).await?;
        }
        Commands::List {
            page,
            page_size,
            subject,
            author,
            difficulty,
            content_kind,
            owner,
        } => {
            let filter = build_filter(subject, author, difficulty, content_kind, owner)?;
            commands::list_documents(page, page_size, filter).await?;
        }
        Commands::Show { id, chunks } => {
            commands::show_document(&id, chunks).await?;
        }
        Commands::Update {
            id,
            title,
            subject,
            author,
            tags,
            difficulty,
            content_kind,
        } => {
            let update = DocumentUpdate {
                title,
                subject,
                author,
                tags,
                difficulty: difficulty.as_deref().map(parse_difficulty).transpose()?,
                content_kind: content_kind.as_deref().map(parse_content_kind).transpose()?,
            };
            commands::update_document(&id, update).await?;
        }
        Commands::Delete { id } => {
            commands::delete_document(&id).await?;
        }
        Commands::Stats => {
            commands::show_stats().await?;
        }
        Commands::Config { init } => {
            if init {
                commands::init_config()?;
            } else {
                commands::show_config()?;
            }
        }
    }

    Ok(())
}
