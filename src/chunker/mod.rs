
use crate::{NotedexError, Result};

/// A windowed slice of a document's text, ready for embedding.
///
/// `start_offset`/`end_offset` bound the window in the original text's byte
/// coordinates. The window is trimmed of surrounding whitespace before being
/// stored in `text`, but the offsets always describe the pre-trim window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    pub text: String,
    pub start_offset: usize,
    pub end_offset: usize,
}

/// Split `text` into overlapping windows of `chunk_size` bytes.
///
/// Windows start at `0, chunk_size - overlap, 2 * (chunk_size - overlap), …`
/// until the text is exhausted; the final window is clipped to the end of the
/// text. Windows whose trimmed content is empty are dropped. Window bounds
/// are clamped to UTF-8 character boundaries so a code point is never split.
#[inline]
pub fn chunk(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<TextChunk>> {
    if chunk_size == 0 {
        return Err(NotedexError::InvalidArgument(
            "chunk size must be positive".to_string(),
        ));
    }
    if overlap >= chunk_size {
        return Err(NotedexError::InvalidArgument(format!(
            "overlap ({overlap}) must be smaller than chunk size ({chunk_size})"
        )));
    }

    let step = chunk_size - overlap;
    let total = text.len();

    let mut chunks = Vec::with_capacity(total.div_ceil(step));
    let mut start = 0;
    while start < total {
        let window_start = floor_char_boundary(text, start);
        let window_end = ceil_char_boundary(text, (start + chunk_size).min(total));

        let window = &text[window_start..window_end];
        let trimmed = window.trim();
        if !trimmed.is_empty() {
            chunks.push(TextChunk {
                text: trimmed.to_string(),
                start_offset: window_start,
                end_offset: window_end,
            });
        }

        start += step;
    }

    Ok(chunks)
}

fn floor_char_boundary(text: &str, mut index: usize) -> usize {
    while !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

fn ceil_char_boundary(text: &str, mut index: usize) -> usize {
    while !text.is_char_boundary(index) {
        index += 1;
    }
    index
}
