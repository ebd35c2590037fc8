use thiserror::Error;

pub type Result<T> = std::result::Result<T, NotedexError>;

#[derive(Error, Debug)]
pub enum NotedexError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Input text is blank")]
    EmptyInput,

    #[error("Text is {actual} bytes, minimum is {minimum}")]
    TextTooShort { actual: usize, minimum: usize },

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Embedding generation failed: {0}")]
    EmbeddingGeneration(String),

    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Text extraction failed: {0}")]
    Extraction(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub mod chunker;
pub mod commands;
pub mod config;
pub mod embeddings;
pub mod extract;
pub mod pipeline;
pub mod search;
pub mod store;
