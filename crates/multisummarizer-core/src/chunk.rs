//! Overlapping word-window chunker.
//!
//! Splits document text on whitespace and slides a window of `size` words
//! across it with a stride of `size - overlap`. Chunking stops as soon as a
//! window reaches the last word, so the final chunk may be shorter than
//! `size` and no chunk is ever empty.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::models::Chunk;

pub const DEFAULT_CHUNK_SIZE: usize = 200;
pub const DEFAULT_CHUNK_OVERLAP: usize = 40;

/// Window size and overlap, both in words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkParams {
    pub size: usize,
    pub overlap: usize,
}

impl ChunkParams {
    pub fn new(size: usize, overlap: usize) -> Result<Self> {
        let params = Self { size, overlap };
        params.validate()?;
        Ok(params)
    }

    /// Rejects parameters whose stride would be zero or negative.
    pub fn validate(&self) -> Result<()> {
        if self.size == 0 || self.overlap >= self.size {
            return Err(CoreError::InvalidChunking {
                size: self.size,
                overlap: self.overlap,
            });
        }
        Ok(())
    }

    pub fn stride(&self) -> usize {
        self.size - self.overlap
    }
}

impl Default for ChunkParams {
    fn default() -> Self {
        Self {
            size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

/// Split text into overlapping word windows.
/// Returns chunks with contiguous indices starting at 0.
pub fn chunk_text(text: &str, params: &ChunkParams) -> Result<Vec<Chunk>> {
    params.validate()?;

    let words: Vec<&str> = text.split_whitespace().collect();
    let stride = params.stride();
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < words.len() {
        let end = (start + params.size).min(words.len());
        chunks.push(Chunk {
            index: chunks.len(),
            text: words[start..end].join(" "),
        });
        if end == words.len() {
            break;
        }
        start += stride;
    }

    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(n: usize) -> String {
        (0..n).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ")
    }

    fn expected_count(n: usize, size: usize, overlap: usize) -> usize {
        if n == 0 {
            0
        } else if n <= overlap {
            1
        } else {
            (n - overlap).div_ceil(size - overlap)
        }
    }

    #[test]
    fn test_empty_text() {
        let chunks = chunk_text("", &ChunkParams::new(6, 2).unwrap()).unwrap();
        assert!(chunks.is_empty());

        let chunks = chunk_text("  \n\t ", &ChunkParams::new(6, 2).unwrap()).unwrap();
        assert!(chunks.is_empty());
    }

    #[test]
    fn test_short_text_single_chunk() {
        let chunks = chunk_text("hello  brave\nnew world", &ChunkParams::new(6, 2).unwrap()).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].index, 0);
        assert_eq!(chunks[0].text, "hello brave new world");
    }

    #[test]
    fn test_overlapping_windows() {
        let text = "cats are mammals. dogs are mammals too. birds can fly.";
        let chunks = chunk_text(text, &ChunkParams::new(6, 2).unwrap()).unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, "cats are mammals. dogs are mammals");
        assert_eq!(chunks[1].text, "are mammals too. birds can fly.");
    }

    #[test]
    fn test_chunk_count_formula() {
        for &(size, overlap) in &[(6, 2), (5, 0), (10, 9), (200, 40), (3, 1)] {
            let params = ChunkParams::new(size, overlap).unwrap();
            for n in 0..60 {
                let chunks = chunk_text(&words(n), &params).unwrap();
                assert_eq!(
                    chunks.len(),
                    expected_count(n, size, overlap),
                    "n={} size={} overlap={}",
                    n,
                    size,
                    overlap
                );
            }
        }
    }

    #[test]
    fn test_stride_prefixes_reconstruct_document() {
        let params = ChunkParams::new(7, 3).unwrap();
        for n in 1..40 {
            let text = words(n);
            let chunks = chunk_text(&text, &params).unwrap();
            let last = chunks.len() - 1;
            let mut rebuilt: Vec<String> = Vec::new();
            for (i, c) in chunks.iter().enumerate() {
                let chunk_words = c.text.split_whitespace().map(str::to_string);
                if i == last {
                    rebuilt.extend(chunk_words);
                } else {
                    rebuilt.extend(chunk_words.take(params.stride()));
                }
            }
            let original: Vec<String> = text.split_whitespace().map(str::to_string).collect();
            assert_eq!(rebuilt, original, "n={}", n);
        }
    }

    #[test]
    fn test_no_empty_chunks_and_contiguous_indices() {
        let chunks = chunk_text(&words(57), &ChunkParams::new(10, 4).unwrap()).unwrap();
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.index, i);
            assert!(!c.text.is_empty());
            assert!(c.text.split_whitespace().count() <= 10);
        }
    }

    #[test]
    fn test_overlap_not_smaller_than_size_fails() {
        assert!(matches!(
            ChunkParams::new(4, 4),
            Err(CoreError::InvalidChunking { size: 4, overlap: 4 })
        ));
        assert!(ChunkParams::new(0, 0).is_err());

        let bad = ChunkParams { size: 3, overlap: 5 };
        assert!(chunk_text("a b c d e f g", &bad).is_err());
    }

    #[test]
    fn test_deterministic() {
        let params = ChunkParams::default();
        let text = words(500);
        assert_eq!(chunk_text(&text, &params).unwrap(), chunk_text(&text, &params).unwrap());
    }
}
