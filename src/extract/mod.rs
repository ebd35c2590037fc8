
use pulldown_cmark::{Event, Parser, Tag, TagEnd};
use std::path::Path;
use tracing::debug;

use crate::store::models::FileKind;
use crate::{NotedexError, Result};

/// Guess the file kind from the file extension.
#[inline]
pub fn detect_file_kind(path: &Path) -> Result<FileKind> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .ok_or_else(|| {
            NotedexError::Extraction(format!("{} has no file extension", path.display()))
        })?;

    match extension.as_str() {
        "pdf" => Ok(FileKind::Pdf),
        "txt" | "text" => Ok(FileKind::PlainText),
        "md" | "markdown" => Ok(FileKind::Markdown),
        "doc" | "docx" => Ok(FileKind::Word),
        other => Err(NotedexError::Extraction(format!(
            "unsupported file extension: .{other}"
        ))),
    }
}

/// Extract plain text from a file of the given kind.
#[inline]
pub fn extract_text(path: &Path, kind: FileKind) -> Result<String> {
    debug!("Extracting text from {} as {kind}", path.display());

    match kind {
        FileKind::PlainText => Ok(std::fs::read_to_string(path)?),
        FileKind::Markdown => {
            let markdown = std::fs::read_to_string(path)?;
            Ok(markdown_to_text(&markdown))
        }
        FileKind::Pdf => pdf_extract::extract_text(path)
            .map_err(|e| NotedexError::Extraction(format!("PDF extraction failed: {e}"))),
        FileKind::Word => Err(NotedexError::Extraction(
            "word documents are not supported; convert to PDF or plain text first".to_string(),
        )),
        FileKind::DirectText => Err(NotedexError::Extraction(
            "direct text is supplied inline, not extracted from a file".to_string(),
        )),
    }
}

/// Flatten markdown to readable plain text, dropping formatting markers but
/// keeping paragraph structure.
#[inline]
pub fn markdown_to_text(markdown: &str) -> String {
    let mut text = String::with_capacity(markdown.len());

    for event in Parser::new(markdown) {
        match event {
            Event::Text(content) | Event::Code(content) => text.push_str(&content),
            Event::SoftBreak => text.push(' '),
            Event::HardBreak => text.push('\n'),
            Event::Start(Tag::Item) => text.push_str("- "),
            Event::End(
                TagEnd::Paragraph | TagEnd::Heading(_) | TagEnd::Item | TagEnd::CodeBlock,
            ) => text.push('\n'),
            _ => {}
        }
    }

    text.trim().to_string()
}
