//! Sliding-window text chunker.
//!
//! Splits document body text into overlapping windows of at most
//! `max_chars` bytes. Window ends prefer the last newline inside the
//! window, then the last space, so modules tend to break on natural
//! boundaries. Consecutive windows share `overlap_chars` bytes of text
//! so that retrieval never loses a sentence straddling a cut.
//!
//! Chunking is fully deterministic: the same body always produces the
//! same windows, the same module numbers, and therefore the same record
//! ids. That determinism is what lets the index store detect a repeated
//! ingest of the same content as a duplicate instead of silently
//! doubling the index.
//!
//! # Algorithm
//!
//! 1. Place a window of `max_chars` bytes at the current position,
//!    snapped back to a UTF-8 char boundary.
//! 2. If the window does not reach the end of the text, pull the cut
//!    back to just after the last newline in the window, or failing
//!    that the last space, provided that still leaves the window longer
//!    than the overlap.
//! 3. Start the next window `overlap_chars` bytes before the cut. If
//!    that would not advance, start it at the cut instead.
//! 4. Repeat until the text is consumed.

use sha2::{Digest, Sha256};

use crate::models::{record_id, ChunkRecord, NewDocument};

/// Window sizing for the chunker.
#[derive(Debug, Clone)]
pub struct ChunkerConfig {
    /// Maximum bytes per chunk.
    pub max_chars: usize,
    /// Bytes shared between consecutive chunks.
    pub overlap_chars: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        ChunkerConfig {
            max_chars: 1000,
            overlap_chars: 100,
        }
    }
}

/// Split `text` into overlapping window strings.
///
/// Returns an empty vector when the text is empty or whitespace-only;
/// callers treat that as a document with no extractable content.
pub fn chunk_text(text: &str, config: &ChunkerConfig) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    chunk_spans(text, config)
        .into_iter()
        .map(|(start, end)| text[start..end].to_string())
        .collect()
}

/// Chunk a document body into index-ready records.
///
/// Module numbers are contiguous from 0 and each record id is
/// `{document_id}_{module_number}`. Each record carries a SHA-256 hash
/// of its text.
pub fn chunk_document(document: &NewDocument, config: &ChunkerConfig) -> Vec<ChunkRecord> {
    chunk_text(&document.body, config)
        .into_iter()
        .enumerate()
        .map(|(i, text)| {
            let module_number = i as i64;
            let mut hasher = Sha256::new();
            hasher.update(text.as_bytes());
            let hash = format!("{:x}", hasher.finalize());

            ChunkRecord {
                record_id: record_id(&document.id, module_number),
                document_id: document.id.clone(),
                module_number,
                text,
                owner_email: document.owner_email.clone(),
                document_name: document.name.clone(),
                hash,
            }
        })
        .collect()
}

/// Compute the byte spans of each window over `text`.
///
/// Guarantees: the first span starts at 0, the last span ends at
/// `text.len()`, every span is at most `max_chars` bytes, every span
/// boundary is a char boundary, and each span starts strictly after the
/// previous one.
fn chunk_spans(text: &str, config: &ChunkerConfig) -> Vec<(usize, usize)> {
    let len = text.len();
    let mut spans = Vec::new();
    let mut start = 0usize;

    while start < len {
        let hard_end = snap_to_char_boundary(text, (start + config.max_chars).min(len));
        let end = if hard_end < len {
            let window = &text[start..hard_end];
            let cut = window
                .rfind('\n')
                .or_else(|| window.rfind(' '))
                .map(|pos| pos + 1)
                .filter(|&pos| pos > config.overlap_chars)
                .unwrap_or(window.len());
            start + cut
        } else {
            hard_end
        };

        spans.push((start, end));
        if end >= len {
            break;
        }

        let mut next = snap_to_char_boundary(text, end.saturating_sub(config.overlap_chars));
        if next <= start {
            next = end;
        }
        start = next;
    }

    spans
}

/// Snap a byte index back to the nearest valid UTF-8 char boundary.
fn snap_to_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut i = index;
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}
