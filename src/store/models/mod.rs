#[cfg(test)]
mod tests;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, Type};
use std::fmt;
use std::str::FromStr;

/// A stored study document. `full_text` and the chunk set are immutable
/// after creation; only the metadata fields covered by [`DocumentUpdate`]
/// may change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub title: String,
    pub source_file_name: Option<String>,
    pub file_kind: FileKind,
    pub file_size_bytes: Option<i64>,
    pub subject: Option<String>,
    pub author: Option<String>,
    pub tags: Vec<String>,
    pub difficulty: Difficulty,
    pub content_kind: ContentKind,
    pub owner_id: Option<String>,
    pub full_text: String,
    pub embedding_model: String,
    pub created_at: NaiveDateTime,
    pub processed_at: Option<NaiveDateTime>,
    pub updated_at: NaiveDateTime,
}

impl FromRow<'_, SqliteRow> for Document {
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        let tags: String = row.try_get("tags")?;
        let tags = serde_json::from_str(&tags).map_err(|e| sqlx::Error::ColumnDecode {
            index: "tags".to_string(),
            source: Box::new(e),
        })?;

        Ok(Self {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            source_file_name: row.try_get("source_file_name")?,
            file_kind: row.try_get("file_kind")?,
            file_size_bytes: row.try_get("file_size_bytes")?,
            subject: row.try_get("subject")?,
            author: row.try_get("author")?,
            tags,
            difficulty: row.try_get("difficulty")?,
            content_kind: row.try_get("content_kind")?,
            owner_id: row.try_get("owner_id")?,
            full_text: row.try_get("full_text")?,
            embedding_model: row.try_get("embedding_model")?,
            created_at: row.try_get("created_at")?,
            processed_at: row.try_get("processed_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    Pdf,
    PlainText,
    Word,
    Markdown,
    DirectText,
}

impl fmt::Display for FileKind {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            FileKind::Pdf => write!(f, "pdf"),
            FileKind::PlainText => write!(f, "plain_text"),
            FileKind::Word => write!(f, "word"),
            FileKind::Markdown => write!(f, "markdown"),
            FileKind::DirectText => write!(f, "direct_text"),
        }
    }
}

impl FromStr for FileKind {
    type Err = String;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pdf" => Ok(FileKind::Pdf),
            "plain_text" | "txt" | "text" => Ok(FileKind::PlainText),
            "word" | "docx" | "doc" => Ok(FileKind::Word),
            "markdown" | "md" => Ok(FileKind::Markdown),
            "direct_text" => Ok(FileKind::DirectText),
            other => Err(format!("unknown file kind: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl fmt::Display for Difficulty {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Difficulty::Easy => write!(f, "easy"),
            Difficulty::Medium => write!(f, "medium"),
            Difficulty::Hard => write!(f, "hard"),
        }
    }
}

impl FromStr for Difficulty {
    type Err = String;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!("unknown difficulty: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Notes,
    Exam,
    Summary,
    Exercise,
    Reference,
}

impl fmt::Display for ContentKind {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ContentKind::Notes => write!(f, "notes"),
            ContentKind::Exam => write!(f, "exam"),
            ContentKind::Summary => write!(f, "summary"),
            ContentKind::Exercise => write!(f, "exercise"),
            ContentKind::Reference => write!(f, "reference"),
        }
    }
}

impl FromStr for ContentKind {
    type Err = String;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "notes" => Ok(ContentKind::Notes),
            "exam" => Ok(ContentKind::Exam),
            "summary" => Ok(ContentKind::Summary),
            "exercise" => Ok(ContentKind::Exercise),
            "reference" => Ok(ContentKind::Reference),
            other => Err(format!("unknown content kind: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDocument {
    pub id: String,
    pub title: String,
    pub source_file_name: Option<String>,
    pub file_kind: FileKind,
    pub file_size_bytes: Option<i64>,
    pub subject: Option<String>,
    pub author: Option<String>,
    pub tags: Vec<String>,
    pub difficulty: Difficulty,
    pub content_kind: ContentKind,
    pub owner_id: Option<String>,
    pub full_text: String,
    pub embedding_model: String,
    pub processed_at: Option<NaiveDateTime>,
}

/// A chunk row as written at document-creation time.
#[derive(Debug, Clone, PartialEq)]
pub struct NewChunk {
    pub chunk_index: i64,
    pub text: String,
    pub embedding: Vec<f32>,
    pub start_offset: i64,
    pub end_offset: i64,
}

/// A chunk row as read back for display. The embedding is only populated on
/// the scan path; the display path leaves it out.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentChunk {
    pub document_id: String,
    pub chunk_index: i64,
    pub text: String,
    pub start_offset: i64,
    pub end_offset: i64,
    pub embedding: Option<Vec<f32>>,
}

impl FromRow<'_, SqliteRow> for DocumentChunk {
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        let embedding: Option<Vec<u8>> = row.try_get("embedding")?;
        let embedding = embedding
            .map(|blob| decode_embedding(&blob))
            .transpose()
            .map_err(|e| sqlx::Error::ColumnDecode {
                index: "embedding".to_string(),
                source: e.into(),
            })?;

        Ok(Self {
            document_id: row.try_get("document_id")?,
            chunk_index: row.try_get("chunk_index")?,
            text: row.try_get("text")?,
            start_offset: row.try_get("start_offset")?,
            end_offset: row.try_get("end_offset")?,
            embedding,
        })
    }
}

/// Mutable metadata fields. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentUpdate {
    pub title: Option<String>,
    pub subject: Option<String>,
    pub author: Option<String>,
    pub tags: Option<Vec<String>>,
    pub difficulty: Option<Difficulty>,
    pub content_kind: Option<ContentKind>,
}

/// Equality filters over indexed document metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentFilter {
    pub subject: Option<String>,
    pub author: Option<String>,
    pub content_kind: Option<ContentKind>,
    pub difficulty: Option<Difficulty>,
    pub owner_id: Option<String>,
}

impl DocumentFilter {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.subject.is_none()
            && self.author.is_none()
            && self.content_kind.is_none()
            && self.difficulty.is_none()
            && self.owner_id.is_none()
    }
}

/// Owning-document metadata carried alongside scanned chunks.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSummary {
    pub id: String,
    pub title: String,
    pub subject: Option<String>,
    pub author: Option<String>,
    pub difficulty: Difficulty,
    pub content_kind: ContentKind,
    pub owner_id: Option<String>,
}

/// A chunk row joined with its owning document, as consumed by the
/// similarity scan.
#[derive(Debug, Clone, PartialEq)]
pub struct ScannedChunk {
    pub document_id: String,
    pub chunk_index: i64,
    pub text: String,
    pub embedding: Vec<f32>,
    pub document: DocumentSummary,
}

impl FromRow<'_, SqliteRow> for ScannedChunk {
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        let blob: Vec<u8> = row.try_get("embedding")?;
        let embedding = decode_embedding(&blob).map_err(|e| sqlx::Error::ColumnDecode {
            index: "embedding".to_string(),
            source: e.into(),
        })?;

        Ok(Self {
            document_id: row.try_get("document_id")?,
            chunk_index: row.try_get("chunk_index")?,
            text: row.try_get("text")?,
            embedding,
            document: DocumentSummary {
                id: row.try_get("document_id")?,
                title: row.try_get("doc_title")?,
                subject: row.try_get("doc_subject")?,
                author: row.try_get("doc_author")?,
                difficulty: row.try_get("doc_difficulty")?,
                content_kind: row.try_get("doc_content_kind")?,
                owner_id: row.try_get("doc_owner_id")?,
            },
        })
    }
}

/// Serialize an embedding as little-endian f32 bytes for BLOB storage.
#[inline]
pub fn encode_embedding(vector: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vector.len() * 4);
    for value in vector {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Deserialize an embedding BLOB written by [`encode_embedding`].
#[inline]
pub fn decode_embedding(bytes: &[u8]) -> Result<Vec<f32>, String> {
    if bytes.len() % 4 != 0 {
        return Err(format!(
            "embedding blob length {} is not a multiple of 4",
            bytes.len()
        ));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}
