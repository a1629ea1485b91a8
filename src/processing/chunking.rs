//! Word-window chunking with overlap.
//!
//! Text is first split into paragraph-like segments on blank lines, then each segment is cut
//! into windows of at most `chunk_size` whitespace-delimited words. Consecutive windows inside a
//! segment share `overlap` words so that facts straddling a boundary stay retrievable. Windows
//! never span two segments.

use regex::Regex;
use std::sync::LazyLock;

use super::types::ChunkingError;

static BLANK_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\r?\n[ \t\r]*\n").expect("blank-line pattern is valid"));

/// Split `text` into overlapping word windows.
///
/// - `chunk_size` is the maximum number of words per chunk and must be positive.
/// - `overlap` words from the end of each emitted chunk seed the next one; it must be smaller
///   than `chunk_size`.
///
/// Returns an empty vector for blank input. No returned chunk is empty.
pub fn chunk_text(
    text: &str,
    chunk_size: usize,
    overlap: usize,
) -> Result<Vec<String>, ChunkingError> {
    if chunk_size == 0 {
        return Err(ChunkingError::InvalidChunkSize);
    }
    if overlap >= chunk_size {
        return Err(ChunkingError::OverlapTooLarge {
            overlap,
            chunk_size,
        });
    }

    let mut chunks = Vec::new();
    for segment in BLANK_LINE.split(text) {
        chunk_segment(segment, chunk_size, overlap, &mut chunks);
    }
    Ok(chunks)
}

fn chunk_segment(segment: &str, chunk_size: usize, overlap: usize, out: &mut Vec<String>) {
    let mut window: Vec<&str> = Vec::with_capacity(chunk_size);
    // Words added since the last emitted chunk; a window holding only carried-over words is
    // already covered by the previous chunk.
    let mut fresh = 0;

    for word in segment.split_whitespace() {
        window.push(word);
        fresh += 1;
        if window.len() >= chunk_size {
            out.push(window.join(" "));
            let keep_from = window.len() - overlap;
            window.drain(..keep_from);
            fresh = 0;
        }
    }

    if fresh > 0 {
        out.push(window.join(" "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(text: &str) -> Vec<&str> {
        text.split_whitespace().collect()
    }

    #[test]
    fn chunk_text_respects_chunk_size() {
        let chunks = chunk_text("one two three four five", 2, 0).unwrap();
        assert_eq!(chunks, vec!["one two", "three four", "five"]);
    }

    #[test]
    fn chunk_text_applies_overlap() {
        let chunks = chunk_text("one two three four five", 3, 1).unwrap();
        assert_eq!(chunks, vec!["one two three", "three four five"]);
    }

    #[test]
    fn trailing_overlap_alone_is_not_emitted() {
        let chunks = chunk_text("a b c d", 2, 1).unwrap();
        assert_eq!(chunks, vec!["a b", "b c", "c d"]);
    }

    #[test]
    fn chunk_text_handles_blank_input() {
        assert!(chunk_text("", 4, 0).unwrap().is_empty());
        assert!(chunk_text(" \n\n \t ", 4, 1).unwrap().is_empty());
    }

    #[test]
    fn segments_split_on_blank_lines() {
        let text = "The grace period is thirty days.\n\nClaims must be filed within ninety days of the event.";
        let chunks = chunk_text(text, 10, 2).unwrap();
        assert_eq!(
            chunks,
            vec![
                "The grace period is thirty days.",
                "Claims must be filed within ninety days of the event."
            ]
        );
    }

    #[test]
    fn blank_lines_with_spaces_and_crlf_still_split() {
        let chunks = chunk_text("alpha beta\r\n  \r\ngamma", 10, 0).unwrap();
        assert_eq!(chunks, vec!["alpha beta", "gamma"]);
    }

    #[test]
    fn single_newlines_do_not_split() {
        let chunks = chunk_text("alpha\nbeta", 10, 0).unwrap();
        assert_eq!(chunks, vec!["alpha beta"]);
    }

    #[test]
    fn rejects_invalid_geometry() {
        assert_eq!(chunk_text("x", 0, 0), Err(ChunkingError::InvalidChunkSize));
        assert_eq!(
            chunk_text("x", 3, 3),
            Err(ChunkingError::OverlapTooLarge {
                overlap: 3,
                chunk_size: 3
            })
        );
        assert!(chunk_text("x", 3, 7).is_err());
    }

    #[test]
    fn no_chunk_is_empty_and_words_reconstruct() {
        let text: String = (0..103).map(|i| format!("w{i} ")).collect();
        let (size, overlap) = (10, 3);
        let chunks = chunk_text(&text, size, overlap).unwrap();

        assert!(chunks.iter().all(|chunk| !chunk.trim().is_empty()));
        assert!(chunks.iter().all(|chunk| words(chunk).len() <= size));

        let mut rebuilt: Vec<&str> = words(&chunks[0]);
        for chunk in &chunks[1..] {
            rebuilt.extend(words(chunk).into_iter().skip(overlap));
        }
        assert_eq!(rebuilt, words(&text));
    }

    #[test]
    fn output_preserves_input_order() {
        let chunks = chunk_text("first para\n\nsecond para\n\nthird para", 5, 1).unwrap();
        assert_eq!(chunks, vec!["first para", "second para", "third para"]);
    }
}
