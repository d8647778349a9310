use std::collections::VecDeque;

/// Separators tried in order: paragraphs, lines, words, then single characters.
const SEPARATORS: &[&str] = &["\n\n", "\n", " ", ""];

/// Recursive character splitter.
/// Splits on the coarsest separator present, recursing into pieces that are still
/// too large, then merges small pieces back into chunks of at most `chunk_size`
/// characters with up to `chunk_overlap` characters carried into the next chunk.
#[derive(Debug, Clone)]
pub struct TextChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl TextChunker {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size - 1),
        }
    }

    pub fn split(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, SEPARATORS)
    }

    fn split_recursive(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let position = separators
            .iter()
            .position(|s| s.is_empty() || text.contains(s))
            .unwrap_or(separators.len().saturating_sub(1));
        let separator = separators.get(position).copied().unwrap_or("");
        let remaining = separators.get(position + 1..).unwrap_or(&[]);

        let pieces: Vec<String> = if separator.is_empty() {
            text.chars().map(String::from).collect()
        } else {
            text.split(separator)
                .filter(|p| !p.is_empty())
                .map(String::from)
                .collect()
        };

        let mut chunks = Vec::new();
        let mut pending: Vec<String> = Vec::new();

        for piece in pieces {
            if char_len(&piece) < self.chunk_size {
                pending.push(piece);
                continue;
            }
            if !pending.is_empty() {
                chunks.extend(self.merge(&pending, separator));
                pending.clear();
            }
            if remaining.is_empty() {
                chunks.push(piece);
            } else {
                chunks.extend(self.split_recursive(&piece, remaining));
            }
        }

        if !pending.is_empty() {
            chunks.extend(self.merge(&pending, separator));
        }

        chunks
    }

    fn merge(&self, pieces: &[String], separator: &str) -> Vec<String> {
        let separator_len = char_len(separator);
        let mut chunks = Vec::new();
        let mut window: VecDeque<&str> = VecDeque::new();
        let mut total = 0;

        for piece in pieces {
            let len = char_len(piece);
            let joiner = |window: &VecDeque<&str>| {
                if window.is_empty() {
                    0
                } else {
                    separator_len
                }
            };

            if !window.is_empty() && total + len + joiner(&window) > self.chunk_size {
                push_joined(&mut chunks, &window, separator);

                // Slide the window forward, keeping at most `chunk_overlap` chars.
                while total > self.chunk_overlap
                    || (total > 0 && total + len + joiner(&window) > self.chunk_size)
                {
                    let Some(front) = window.pop_front() else {
                        break;
                    };
                    total = total.saturating_sub(char_len(front) + joiner(&window));
                }
            }

            window.push_back(piece);
            total += len + if window.len() > 1 { separator_len } else { 0 };
        }

        push_joined(&mut chunks, &window, separator);
        chunks
    }
}

impl Default for TextChunker {
    fn default() -> Self {
        Self::new(500, 100)
    }
}

fn push_joined(chunks: &mut Vec<String>, window: &VecDeque<&str>, separator: &str) {
    let joined = window.iter().copied().collect::<Vec<_>>().join(separator);
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered_words(n: usize) -> String {
        (0..n)
            .map(|i| format!("w{i:02}"))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn test_short_text_single_chunk() {
        let chunker = TextChunker::default();
        let chunks = chunker.split("  Troca de óleo: R$150.  ");
        assert_eq!(chunks, vec!["Troca de óleo: R$150.".to_string()]);
    }

    #[test]
    fn test_empty_text_no_chunks() {
        let chunker = TextChunker::default();
        assert!(chunker.split("").is_empty());
        assert!(chunker.split("\n\n\n").is_empty());
    }

    #[test]
    fn test_prefers_paragraph_boundaries() {
        let chunker = TextChunker::new(40, 0);
        let text = format!("{}\n\n{}", "a".repeat(30), "b".repeat(30));
        let chunks = chunker.split(&text);
        assert_eq!(chunks, vec!["a".repeat(30), "b".repeat(30)]);
    }

    #[test]
    fn test_chunks_respect_size() {
        let chunker = TextChunker::new(20, 8);
        for chunk in chunker.split(&numbered_words(100)) {
            assert!(chunk.chars().count() <= 20, "chunk too long: {chunk:?}");
        }
    }

    #[test]
    fn test_consecutive_chunks_overlap() {
        let chunker = TextChunker::new(20, 8);
        let chunks = chunker.split(&numbered_words(30));
        assert!(chunks.len() > 2);
        assert!(chunks[0].starts_with("w00"));
        assert_eq!(chunks[0], "w00 w01 w02 w03 w04");
        assert!(chunks[1].starts_with("w03 w04"), "got {:?}", chunks[1]);
        for pair in chunks.windows(2) {
            let last_word = pair[0].split(' ').last().unwrap();
            assert!(pair[1].contains(last_word), "{pair:?} do not overlap");
        }
    }

    #[test]
    fn test_unbroken_text_falls_back_to_characters() {
        let chunker = TextChunker::new(10, 2);
        let chunks = chunker.split(&"x".repeat(25));
        assert!(chunks.len() >= 3);
        assert!(chunks.iter().all(|c| c.chars().count() <= 10));
    }

    #[test]
    fn test_multibyte_text_does_not_panic() {
        let chunker = TextChunker::new(16, 4);
        let text = "manutenção ".repeat(40);
        let chunks = chunker.split(&text);
        assert!(!chunks.is_empty());
        assert!(chunks.iter().all(|c| c.chars().count() <= 16));
    }

    #[test]
    fn test_overlap_clamped_below_size() {
        let chunker = TextChunker::new(10, 50);
        assert_eq!(chunker.chunk_overlap, 9);
    }
}
