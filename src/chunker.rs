//! Character-window chunking for best-practice notes and source files.

use std::sync::LazyLock;

use regex::Regex;

/// Collapses trailing whitespace before newlines prior to splitting.
static TRAILING_WS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+\n").expect("trailing-whitespace regex"));

/// Window sizing knobs shared by both chunking variants.
#[derive(Debug, Clone, Copy)]
pub struct ChunkConfig {
    /// Maximum characters per window.
    pub max_chars: usize,
    /// Characters of tail overlap carried into the next window.
    pub overlap: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            max_chars: 1200,
            overlap: 200,
        }
    }
}

/// Splits text into overlapping character windows.
///
/// The text is whitespace-normalized and trimmed first. Each window holds at
/// most `max_chars` characters; the next window starts `overlap` characters
/// before the previous window's end. Windows are trimmed after slicing and
/// empty windows are dropped, so whitespace-only input yields no chunks.
pub fn split_text(text: &str, config: ChunkConfig) -> Vec<String> {
    let text = TRAILING_WS.replace_all(text, "\n");
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }

    let max_chars = config.max_chars.max(1);
    // Byte offset of every char boundary, so windows slice on whole chars.
    let boundaries: Vec<usize> = text.char_indices().map(|(offset, _)| offset).collect();
    let total_chars = boundaries.len();
    let byte_at = |pos: usize| {
        if pos >= total_chars {
            text.len()
        } else {
            boundaries[pos]
        }
    };

    let mut chunks = Vec::new();
    let mut start = 0usize;
    while start < total_chars {
        let end = total_chars.min(start + max_chars);
        let window = text[byte_at(start)..byte_at(end)].trim();
        if !window.is_empty() {
            chunks.push(window.to_string());
        }
        if end == total_chars {
            break;
        }
        let mut next = end.saturating_sub(config.overlap);
        if next <= start {
            // overlap >= max_chars would otherwise loop forever
            next = end;
        }
        start = next;
    }
    chunks
}

/// Splits a source file into windows, tagging it with provenance.
///
/// A single `[FILE]: <relative-path>` header is prepended to the file's text
/// before splitting, so it counts toward `max_chars` in the first window only
/// and is never re-inserted at later window boundaries.
pub fn chunk_code(content: &str, relative_path: &str, config: ChunkConfig) -> Vec<String> {
    let tagged = format!("[FILE]: {relative_path}\n{content}");
    split_text(&tagged, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(max_chars: usize, overlap: usize) -> ChunkConfig {
        ChunkConfig { max_chars, overlap }
    }

    #[test]
    fn whole_text_fits_one_window() {
        let text = "Always write tests.\n\nAlways review code.";
        let chunks = split_text(text, cfg(1000, 200));
        // blank lines collapse during whitespace normalization
        assert_eq!(chunks, vec!["Always write tests.\nAlways review code.".to_string()]);
    }

    #[test]
    fn empty_and_whitespace_input_yield_nothing() {
        assert!(split_text("", ChunkConfig::default()).is_empty());
        assert!(split_text("  \n\t \n ", ChunkConfig::default()).is_empty());
    }

    #[test]
    fn windows_overlap_by_configured_amount() {
        let text: String = ('a'..='z').cycle().take(3000).collect();
        let chunks = split_text(&text, cfg(1200, 200));
        // Window i+1 starts at end_of_window_i - overlap, so adjacent chunks
        // share their boundary characters.
        assert!(chunks.len() > 1);
        for pair in chunks.windows(2) {
            let tail: String = pair[0].chars().skip(pair[0].chars().count() - 200).collect();
            assert!(pair[1].starts_with(&tail));
        }
    }

    #[test]
    fn chunks_reconstruct_the_normalized_input() {
        // With no whitespace at window boundaries, dropping each chunk's
        // overlap-char prefix and concatenating recovers the input exactly.
        let text: String = ('a'..='z').cycle().take(3000).collect();
        let chunks = split_text(&text, cfg(1200, 200));
        assert!(chunks.len() > 1);
        let mut stitched = chunks[0].clone();
        for chunk in &chunks[1..] {
            stitched.extend(chunk.chars().skip(200));
        }
        assert_eq!(stitched, text);

        // When windows cut through whitespace, per-window trimming may drop
        // spaces at the seams but never a non-whitespace character.
        let text = "one two three four five six seven eight nine ten ".repeat(8);
        let chunks = split_text(&text, cfg(7, 0));
        let stitched: String = chunks.concat();
        let visible = |s: &str| s.chars().filter(|c| !c.is_whitespace()).collect::<String>();
        assert_eq!(visible(&stitched), visible(&text));
    }

    #[test]
    fn final_window_may_be_short() {
        let text: String = std::iter::repeat('x').take(130).collect();
        let chunks = split_text(&text, cfg(100, 10));
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].chars().count(), 100);
        assert_eq!(chunks[1].chars().count(), 40);
    }

    #[test]
    fn splitting_is_deterministic() {
        let text = "lorem ipsum dolor sit amet ".repeat(200);
        let first = split_text(&text, cfg(150, 30));
        let second = split_text(&text, cfg(150, 30));
        assert_eq!(first, second);
    }

    #[test]
    fn overlap_at_least_window_size_still_terminates() {
        let text: String = std::iter::repeat('y').take(500).collect();
        let chunks = split_text(&text, cfg(50, 50));
        assert_eq!(chunks.len(), 10);
        let chunks = split_text(&text, cfg(50, 120));
        assert_eq!(chunks.len(), 10);
    }

    #[test]
    fn trailing_whitespace_before_newlines_collapses() {
        let chunks = split_text("alpha   \nbeta\t\ngamma", cfg(1000, 0));
        assert_eq!(chunks, vec!["alpha\nbeta\ngamma".to_string()]);
    }

    #[test]
    fn multibyte_text_slices_on_char_boundaries() {
        let text = "héllo wörld ".repeat(50);
        let chunks = split_text(&text, cfg(40, 8));
        assert!(!chunks.is_empty());
        assert!(chunks.iter().all(|c| c.chars().count() <= 40));
    }

    #[test]
    fn code_chunks_carry_a_single_provenance_header() {
        let content = "fn main() {}\n".repeat(20);
        let chunks = chunk_code(&content, "src/main.rs", cfg(50, 10));
        assert!(chunks.len() > 1);
        assert!(chunks[0].starts_with("[FILE]: src/main.rs\n"));
        let later_headers = chunks[1..]
            .iter()
            .filter(|c| c.contains("[FILE]:"))
            .count();
        assert_eq!(later_headers, 0);
    }

    #[test]
    fn header_counts_toward_first_window_size() {
        let chunks = chunk_code("abcdef", "f.rs", cfg(12, 0));
        // "[FILE]: f.rs\n" is 13 chars, so the first window is header-only
        // (trimmed of its newline) and the content lands in later windows.
        assert_eq!(chunks[0], "[FILE]: f.rs");
    }
}
