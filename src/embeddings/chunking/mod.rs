#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{RagError, Result};

/// Sizing policy for splitting record text, in characters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum chunk length.
    pub max_size: usize,
    /// Shared span between consecutive chunks of the same record.
    /// Must be smaller than `max_size`.
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            max_size: 500,
            overlap: 100,
        }
    }
}

/// A contiguous slice of a record's text, the unit stored and retrieved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    pub content: String,
    /// Char offset of this chunk within the record text.
    pub offset: usize,
    /// Position of this chunk within the record.
    pub index: usize,
}

/// Split text into overlapping chunks.
///
/// Each chunk is at most `max_size` chars; consecutive chunks share exactly
/// `overlap` chars. A chunk's end is pulled back to the best natural
/// boundary (paragraph, then line, then sentence, then word) found in the
/// allowed window, so boundaries move the end of a chunk while the start is
/// always `previous end - overlap`. Concatenating the first chunk with each
/// later chunk's post-overlap suffix reconstructs the input exactly.
///
/// All indices are char indices; multi-byte text is never split mid-scalar.
///
/// `overlap` must be smaller than `max_size`, or the window could not
/// advance between chunks; such a config is rejected up front.
#[inline]
pub fn split_text(text: &str, config: &ChunkingConfig) -> Result<Vec<TextChunk>> {
    if config.overlap >= config.max_size {
        return Err(RagError::Ingestion(format!(
            "Chunk overlap ({}) must be smaller than max chunk size ({})",
            config.overlap, config.max_size
        )));
    }

    let chars: Vec<usize> = text.char_indices().map(|(byte, _)| byte).collect();
    let n = chars.len();

    if n == 0 {
        return Ok(Vec::new());
    }

    let byte_at = |char_idx: usize| {
        if char_idx == n {
            text.len()
        } else {
            chars[char_idx]
        }
    };

    let mut chunks = Vec::new();
    let mut start = 0;
    let mut index = 0;

    loop {
        let hard_end = (start + config.max_size).min(n);
        let end = if hard_end == n {
            n
        } else {
            // The break must land strictly past the overlap span or the
            // window would stop advancing.
            pick_break(text, &chars, start + config.overlap + 1, hard_end)
        };

        chunks.push(TextChunk {
            content: text[byte_at(start)..byte_at(end)].to_string(),
            offset: start,
            index,
        });
        index += 1;

        if end == n {
            break;
        }
        start = end - config.overlap;
    }

    debug!(
        "Split {} chars into {} chunks (max {}, overlap {})",
        n,
        chunks.len(),
        config.max_size,
        config.overlap
    );

    Ok(chunks)
}

/// Find the best break position in `[min_end, hard_end]`, scanning each
/// boundary class from the right before falling back to a hard cut.
fn pick_break(text: &str, chars: &[usize], min_end: usize, hard_end: usize) -> usize {
    debug_assert!(min_end <= hard_end, "overlap must be below max_size");

    let char_at = |idx: usize| {
        text[chars[idx]..]
            .chars()
            .next()
            .unwrap_or_default()
    };

    // Paragraph break: end just past a blank line.
    for end in (min_end..=hard_end).rev() {
        if end >= 2 && char_at(end - 1) == '\n' && char_at(end - 2) == '\n' {
            return end;
        }
    }

    // Line break.
    for end in (min_end..=hard_end).rev() {
        if char_at(end - 1) == '\n' {
            return end;
        }
    }

    // Sentence end followed by a space.
    for end in (min_end..=hard_end).rev() {
        if end >= 2
            && char_at(end - 1) == ' '
            && matches!(char_at(end - 2), '.' | '!' | '?')
        {
            return end;
        }
    }

    // Word boundary.
    for end in (min_end..=hard_end).rev() {
        if char_at(end - 1) == ' ' {
            return end;
        }
    }

    hard_end
}
