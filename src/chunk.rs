//! Paragraph-boundary text chunker.
//!
//! Splits document text into [`Chunk`]s that respect a `max_tokens` limit.
//! Splitting occurs on paragraph boundaries (`\n\n`); a paragraph longer
//! than the limit is hard-split at the last newline or space before it.
//!
//! Each chunk carries `source`, `chunk_index`, a SHA-256 `hash` of its text,
//! and a random `id` in its metadata.

use ragchat_core::models::Chunk;
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Approximate chars-per-token ratio.
const CHARS_PER_TOKEN: usize = 4;

/// Split `text` from `source` into chunks with contiguous indices from 0.
/// Whitespace-only text yields no chunks.
pub fn chunk_text(source: &str, text: &str, max_tokens: usize) -> Vec<Chunk> {
    let max_chars = (max_tokens * CHARS_PER_TOKEN).max(1);
    let mut pieces: Vec<String> = Vec::new();
    let mut current_buf = String::new();

    for para in text.split("\n\n") {
        let trimmed = para.trim();
        if trimmed.is_empty() {
            continue;
        }

        // If adding this paragraph would exceed max, flush current buffer
        let would_be = if current_buf.is_empty() {
            trimmed.len()
        } else {
            current_buf.len() + 2 + trimmed.len()
        };
        if would_be > max_chars && !current_buf.is_empty() {
            pieces.push(std::mem::take(&mut current_buf));
        }

        if trimmed.len() > max_chars {
            if !current_buf.is_empty() {
                pieces.push(std::mem::take(&mut current_buf));
            }
            hard_split(trimmed, max_chars, &mut pieces);
        } else {
            if !current_buf.is_empty() {
                current_buf.push_str("\n\n");
            }
            current_buf.push_str(trimmed);
        }
    }

    if !current_buf.is_empty() {
        pieces.push(current_buf);
    }

    pieces
        .iter()
        .enumerate()
        .map(|(i, piece)| make_chunk(source, i, piece))
        .collect()
}

fn hard_split(paragraph: &str, max_chars: usize, pieces: &mut Vec<String>) {
    let mut remaining = paragraph;
    while !remaining.is_empty() {
        let mut split_at = remaining.len().min(max_chars);
        while !remaining.is_char_boundary(split_at) {
            split_at -= 1;
        }
        if split_at == 0 {
            // A single char wider than max_chars.
            split_at = remaining
                .char_indices()
                .nth(1)
                .map_or(remaining.len(), |(i, _)| i);
        }
        let actual_split = if split_at < remaining.len() {
            remaining[..split_at]
                .rfind('\n')
                .or_else(|| remaining[..split_at].rfind(' '))
                .filter(|pos| *pos > 0)
                .map(|pos| pos + 1)
                .unwrap_or(split_at)
        } else {
            split_at
        };
        let piece = remaining[..actual_split].trim();
        if !piece.is_empty() {
            pieces.push(piece.to_string());
        }
        remaining = &remaining[actual_split..];
    }
}

fn make_chunk(source: &str, index: usize, text: &str) -> Chunk {
    let hash = format!("{:x}", Sha256::digest(text.as_bytes()));
    Chunk::new(text)
        .with_metadata("id", Uuid::new_v4().to_string())
        .with_metadata("source", source)
        .with_metadata("chunk_index", index.to_string())
        .with_metadata("hash", hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_of(c: &Chunk) -> usize {
        c.metadata["chunk_index"].parse().unwrap()
    }

    #[test]
    fn test_small_text_single_chunk() {
        let chunks = chunk_text("a.md", "Hello, world!", 700);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Hello, world!");
        assert_eq!(chunks[0].metadata["source"], "a.md");
        assert_eq!(index_of(&chunks[0]), 0);
    }

    #[test]
    fn test_empty_text_no_chunks() {
        assert!(chunk_text("a.md", "", 700).is_empty());
        assert!(chunk_text("a.md", "\n\n  \n\n", 700).is_empty());
    }

    #[test]
    fn test_paragraphs_under_limit_merge() {
        let text = "First paragraph.\n\nSecond paragraph.\n\nThird paragraph.";
        let chunks = chunk_text("a.md", text, 700);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, text);
    }

    #[test]
    fn test_indices_contiguous() {
        let text = (0..50)
            .map(|i| format!("Paragraph number {}.", i))
            .collect::<Vec<_>>()
            .join("\n\n");
        let chunks = chunk_text("a.md", &text, 10);
        assert!(chunks.len() > 1);
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(index_of(c), i);
            assert!(c.text.len() <= 40);
        }
    }

    #[test]
    fn test_long_paragraph_split_on_spaces() {
        let text = "word ".repeat(100);
        let chunks = chunk_text("a.md", &text, 5);
        assert!(chunks.len() > 1);
        for c in &chunks {
            assert!(c.text.len() <= 20);
            assert!(!c.text.starts_with(' '));
        }
    }

    #[test]
    fn test_multibyte_text_does_not_panic() {
        let text = "é".repeat(50);
        let chunks = chunk_text("a.md", &text, 1);
        let rejoined: String = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(rejoined, text);
    }

    #[test]
    fn test_hash_deterministic() {
        let a = chunk_text("a.md", "Alpha\n\nBeta", 700);
        let b = chunk_text("a.md", "Alpha\n\nBeta", 700);
        assert_eq!(a[0].metadata["hash"], b[0].metadata["hash"]);
        assert_ne!(a[0].metadata["id"], b[0].metadata["id"]);
    }
}
