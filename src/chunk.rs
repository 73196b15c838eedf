//! Boundary-aware overlapping text chunker.
//!
//! Splits document text into overlapping segments of roughly `target_size`
//! characters, preferring to cut at a paragraph break, then at a sentence
//! end, then at a space, before falling back to a hard cut. Sizes are in
//! characters and approximate a token budget at ~4 chars/token.
//!
//! Each chunk's identity is derived from its document name and index, so
//! re-chunking the same document with the same parameters reproduces
//! identical ids.

use crate::models::Chunk;

/// Approximate chars-per-token ratio used to size the defaults.
const CHARS_PER_TOKEN: usize = 4;

/// Default chunk size: ~300 tokens.
pub const DEFAULT_TARGET_CHARS: usize = 300 * CHARS_PER_TOKEN;

/// Default overlap between consecutive chunks: ~50 tokens.
pub const DEFAULT_OVERLAP_CHARS: usize = 50 * CHARS_PER_TOKEN;

/// Deterministic chunk id: `"<document_name>::<chunk_index>"`.
pub fn chunk_id(document_name: &str, index: i64) -> String {
    format!("{}::{}", document_name, index)
}

/// Split text into overlapping chunks with boundary-aware cuts.
///
/// Scans forward from position 0. At each step the candidate end is
/// `start + target_size`; if that reaches end-of-text the remaining trimmed
/// text is emitted as the final (possibly short) chunk. Otherwise the best
/// cut inside a trailing window of `target_size / 4` is chosen, trying in
/// order: paragraph break (`\n\n`), sentence punctuation followed by
/// whitespace, plain space, hard cut at the candidate end.
///
/// The next start is `max(start + 1, cut - overlap)`, so the scan advances
/// at least one character per iteration even when `overlap >= target_size`.
/// Chunks are trimmed; anything empty after trimming is discarded.
pub fn chunk_text(text: &str, target_size: usize, overlap: usize) -> Vec<String> {
    // Boundary search must see one newline form regardless of platform.
    let text = text.replace("\r\n", "\n").replace('\r', "\n");
    let text = text.as_str();
    let len = text.len();
    let target = target_size.max(1);

    let mut chunks = Vec::new();
    let mut start = 0usize;

    while start < len {
        let candidate = start.saturating_add(target);
        if candidate >= len {
            // Only path that may emit a chunk shorter than target.
            push_trimmed(&mut chunks, &text[start..]);
            break;
        }

        let mut candidate = floor_char_boundary(text, candidate);
        if candidate <= start {
            // A single multi-byte char exceeded the target; take it whole.
            candidate = next_char_boundary(text, start + 1);
            if candidate >= len {
                push_trimmed(&mut chunks, &text[start..]);
                break;
            }
        }

        let window_lo = floor_char_boundary(text, candidate.saturating_sub(target / 4).max(start));
        let mut cut = find_cut(text, window_lo, candidate);
        // The cut must strictly advance past start, else hard-cut.
        if cut <= start {
            cut = candidate;
        }

        push_trimmed(&mut chunks, &text[start..cut]);

        let mut next = cut.saturating_sub(overlap).max(start + 1);
        next = floor_char_boundary(text, next.min(len));
        if next <= start {
            next = next_char_boundary(text, start + 1);
        }
        start = next;
    }

    chunks
}

/// Chunk a document and assign deterministic ids by position.
pub fn chunk_document(name: &str, text: &str, target_size: usize, overlap: usize) -> Vec<Chunk> {
    chunk_text(text, target_size, overlap)
        .into_iter()
        .enumerate()
        .map(|(i, text)| Chunk {
            id: chunk_id(name, i as i64),
            text,
            source: name.to_string(),
            chunk_index: i as i64,
        })
        .collect()
}

/// Find the best cut inside `[lo, hi)`, trying boundary kinds in strict
/// preference order. Returns `hi` (the hard cut) when no boundary exists.
fn find_cut(text: &str, lo: usize, hi: usize) -> usize {
    let window = &text[lo..hi];

    // 1. Paragraph break — cut just after the double newline.
    if let Some(pos) = window.rfind("\n\n") {
        return lo + pos + 2;
    }

    // 2. Sentence end — punctuation immediately followed by whitespace;
    //    cut just after both.
    let bytes = window.as_bytes();
    let mut i = bytes.len().saturating_sub(1);
    while i > 0 {
        i -= 1;
        if matches!(bytes[i], b'.' | b'!' | b'?') && bytes[i + 1].is_ascii_whitespace() {
            return lo + i + 2;
        }
    }

    // 3. Plain space — cut just after it.
    if let Some(pos) = window.rfind(' ') {
        return lo + pos + 1;
    }

    // 4. Hard cut at the candidate end.
    hi
}

fn push_trimmed(chunks: &mut Vec<String>, piece: &str) {
    let trimmed = piece.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

fn floor_char_boundary(text: &str, i: usize) -> usize {
    let mut i = i.min(text.len());
    while !text.is_char_boundary(i) {
        i -= 1;
    }
    i
}

fn next_char_boundary(text: &str, i: usize) -> usize {
    let mut i = i.min(text.len());
    while i < text.len() && !text.is_char_boundary(i) {
        i += 1;
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_single_chunk() {
        let chunks = chunk_text("  Hello, world!  \n", 1200, 200);
        assert_eq!(chunks, vec!["Hello, world!".to_string()]);
    }

    #[test]
    fn test_whitespace_only_yields_nothing() {
        assert!(chunk_text("   \n\n  \t ", 100, 10).is_empty());
        assert!(chunk_text("", 100, 10).is_empty());
    }

    #[test]
    fn test_paragraph_boundary_preferred() {
        // Candidate end falls inside "Para two."; the cut must land at the
        // paragraph break, not mid-word.
        let chunks = chunk_text("Para one.\n\nPara two.", 10, 2);
        assert_eq!(chunks[0], "Para one.");
    }

    #[test]
    fn test_sentence_boundary_preferred_over_space() {
        // The search window contains both a sentence end and a later plain
        // space; the sentence end must win.
        let text = "aaaa bbbb cccc dddd eeee. bc def ghij";
        let chunks = chunk_text(text, 32, 0);
        assert_eq!(chunks[0], "aaaa bbbb cccc dddd eeee.");
    }

    #[test]
    fn test_space_boundary_fallback() {
        let text = "alpha beta gamma delta epsilon zeta";
        let chunks = chunk_text(text, 12, 0);
        // No paragraph or sentence boundary; every cut lands after a space.
        for c in &chunks {
            assert!(!c.starts_with(' ') && !c.ends_with(' '));
        }
        assert_eq!(chunks.join(" "), text);
    }

    #[test]
    fn test_hard_cut_when_no_boundary() {
        let text = "a".repeat(50);
        let chunks = chunk_text(&text, 20, 0);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), 20);
        assert_eq!(chunks[1].len(), 20);
        assert_eq!(chunks[2].len(), 10);
    }

    #[test]
    fn test_long_document_multiple_chunks() {
        let text = (0..40)
            .map(|i| format!("Paragraph number {} with some filler text.", i))
            .collect::<Vec<_>>()
            .join("\n\n");
        let chunks = chunk_text(&text, 200, 40);
        assert!(chunks.len() > 1);
        for c in &chunks {
            assert!(!c.trim().is_empty());
        }
    }

    #[test]
    fn test_overlap_carries_text_between_chunks() {
        let text = "alpha beta gamma delta epsilon zeta eta theta iota kappa";
        let chunks = chunk_text(text, 20, 10);
        assert!(chunks.len() > 1);
        // With a positive overlap, the second chunk re-includes text from
        // before the first cut.
        let first_end = &chunks[0][chunks[0].len() - 4..];
        assert!(chunks[1].contains(first_end) || chunks[1].starts_with(first_end));
    }

    #[test]
    fn test_terminates_when_overlap_exceeds_target() {
        let text = "word ".repeat(100);
        let chunks = chunk_text(&text, 10, 50);
        assert!(!chunks.is_empty());
        for c in &chunks {
            assert!(!c.is_empty());
        }
    }

    #[test]
    fn test_crlf_normalized_before_boundary_search() {
        let unix = chunk_text("Para one.\n\nPara two.", 10, 2);
        let windows = chunk_text("Para one.\r\n\r\nPara two.", 10, 2);
        assert_eq!(unix, windows);
    }

    #[test]
    fn test_multibyte_text_never_panics() {
        let text = "évènement à répétition — ".repeat(30);
        let chunks = chunk_text(&text, 17, 5);
        assert!(!chunks.is_empty());
        let tiny = chunk_text("ééééé", 1, 0);
        assert_eq!(tiny.concat(), "ééééé");
    }

    #[test]
    fn test_deterministic_ids() {
        let text = "First paragraph.\n\nSecond paragraph.\n\nThird paragraph.";
        let a = chunk_document("rules.txt", text, 20, 4);
        let b = chunk_document("rules.txt", text, 20, 4);
        assert_eq!(a.len(), b.len());
        for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
            assert_eq!(x.id, format!("rules.txt::{}", i));
            assert_eq!(x.id, y.id);
            assert_eq!(x.text, y.text);
            assert_eq!(x.chunk_index, i as i64);
        }
    }

    #[test]
    fn test_chunk_id_format() {
        assert_eq!(chunk_id("sop_wire_transfers.txt", 3), "sop_wire_transfers.txt::3");
    }
}
