//! Overlapping fixed-window document chunker.
//!
//! Splits documents longer than `chunk_size` characters into windows that
//! advance by `chunk_size - chunk_overlap`, so adjacent chunks share
//! exactly `chunk_overlap` characters. Documents at or under the window
//! size pass through unchanged, keeping their original id.

use crate::config::ChunkingConfig;
use crate::documents::Document;

/// Pure chunking stage between scraping and indexing.
#[derive(Debug, Clone)]
pub struct Chunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Chunker {
    /// Create a chunker, rejecting configurations where the window could
    /// not advance (`overlap >= size`).
    pub fn new(config: &ChunkingConfig) -> Result<Self, String> {
        config.validate()?;
        Ok(Self {
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap,
        })
    }

    /// Split documents into chunks. No I/O; order is preserved.
    pub fn chunk(&self, documents: &[Document]) -> Vec<Document> {
        let mut chunked = Vec::new();

        for doc in documents {
            let chars: Vec<char> = doc.content.chars().collect();

            if chars.len() <= self.chunk_size {
                chunked.push(doc.clone());
                continue;
            }

            let step = self.chunk_size - self.chunk_overlap;
            let mut start = 0;
            let mut index = 0;

            while start < chars.len() {
                let end = (start + self.chunk_size).min(chars.len());
                let content: String = chars[start..end].iter().collect();

                let mut chunk = doc.clone();
                chunk.id = format!("{}_chunk_{index}", doc.id);
                chunk.content = content;
                chunked.push(chunk);

                // The window that touches the end of the content is the
                // last one; advancing further would only emit suffixes
                // already covered by the overlap.
                if end == chars.len() {
                    break;
                }

                index += 1;
                start += step;
            }
        }

        tracing::info!(
            "Chunked {} documents into {} chunks (chunk_size={}, overlap={})",
            documents.len(),
            chunked.len(),
            self.chunk_size,
            self.chunk_overlap
        );

        chunked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::DocumentSource;

    fn chunker(size: usize, overlap: usize) -> Chunker {
        Chunker::new(&ChunkingConfig {
            chunk_size: size,
            chunk_overlap: overlap,
        })
        .unwrap()
    }

    fn doc(content: &str) -> Document {
        Document::new(content, "Title", "https://example.test/doc", DocumentSource::Scraper)
    }

    #[test]
    fn short_document_passes_through_unchanged() {
        let d = doc("short content");
        let chunks = chunker(1000, 200).chunk(&[d.clone()]);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].id, d.id);
        assert_eq!(chunks[0].content, d.content);
    }

    #[test]
    fn exact_size_document_is_a_single_chunk() {
        let d = doc(&"x".repeat(100));
        let chunks = chunker(100, 20).chunk(&[d.clone()]);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].id, d.id);
    }

    #[test]
    fn chunk_count_matches_window_arithmetic() {
        // ceil((len - overlap) / (size - overlap))
        let cases = [(250usize, 100usize, 20usize), (1000, 300, 50), (101, 100, 20)];
        for (len, size, overlap) in cases {
            let d = doc(&"a".repeat(len));
            let chunks = chunker(size, overlap).chunk(&[d]);
            let expected = (len - overlap).div_ceil(size - overlap);
            assert_eq!(chunks.len(), expected, "len={len} size={size} overlap={overlap}");
        }
    }

    #[test]
    fn adjacent_chunks_overlap_exactly() {
        let content: String = ('a'..='z').cycle().take(500).collect();
        let chunks = chunker(100, 30).chunk(&[doc(&content)]);

        for pair in chunks.windows(2) {
            let prev: Vec<char> = pair[0].content.chars().collect();
            let next: Vec<char> = pair[1].content.chars().collect();
            // Previous chunk must be full-width for the overlap check
            if prev.len() == 100 {
                let tail: String = prev[prev.len() - 30..].iter().collect();
                let head: String = next[..30.min(next.len())].iter().collect();
                assert_eq!(tail, head);
            }
        }
    }

    #[test]
    fn chunk_ids_carry_parent_id_and_index() {
        let d = doc(&"b".repeat(250));
        let chunks = chunker(100, 20).chunk(&[d.clone()]);
        assert!(chunks.len() > 1);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.id, format!("{}_chunk_{i}", d.id));
            assert_eq!(chunk.title, d.title);
            assert_eq!(chunk.url, d.url);
            assert_eq!(chunk.source, d.source);
        }
    }

    #[test]
    fn reconstruction_covers_parent_content() {
        let content: String = ('a'..='z').cycle().take(450).collect();
        let chunks = chunker(100, 25).chunk(&[doc(&content)]);

        let mut rebuilt: String = chunks[0].content.clone();
        for chunk in &chunks[1..] {
            let chars: Vec<char> = chunk.content.chars().collect();
            rebuilt.extend(chars[25.min(chars.len())..].iter());
        }
        assert_eq!(rebuilt, content);
    }

    #[test]
    fn multibyte_content_is_chunked_by_characters() {
        let content: String = "æøå".chars().cycle().take(250).collect();
        let chunks = chunker(100, 20).chunk(&[doc(&content)]);
        for chunk in &chunks {
            assert!(chunk.content.chars().count() <= 100);
        }
    }

    #[test]
    fn invalid_overlap_is_rejected_at_construction() {
        assert!(
            Chunker::new(&ChunkingConfig {
                chunk_size: 100,
                chunk_overlap: 100,
            })
            .is_err()
        );
    }
}
