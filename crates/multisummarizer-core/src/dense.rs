//! Exact inner-product index over unit-length embeddings.
//!
//! Every stored vector is L2-normalized at build time, so the inner
//! product computed at query time is the cosine similarity. Search is a
//! brute-force scan: one similarity per stored vector, no approximation.

use crate::embedding::{dot, l2_normalize};
use crate::error::{CoreError, Result};

/// Flat dense index, one vector per chunk in chunk order.
#[derive(Debug, Clone, Default)]
pub struct DenseIndex {
    dims: usize,
    vectors: Vec<Vec<f32>>,
}

impl DenseIndex {
    /// Build an index from raw embedding vectors.
    ///
    /// All vectors must share one dimension. An empty input yields an
    /// empty index with `dims() == 0`.
    pub fn build(vectors: Vec<Vec<f32>>) -> Result<Self> {
        let dims = vectors.first().map(Vec::len).unwrap_or(0);
        let mut stored = Vec::with_capacity(vectors.len());
        for mut v in vectors {
            if v.len() != dims {
                return Err(CoreError::DimensionMismatch {
                    expected: dims,
                    actual: v.len(),
                });
            }
            l2_normalize(&mut v);
            stored.push(v);
        }
        Ok(Self {
            dims,
            vectors: stored,
        })
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Similarity of the query to every stored vector, in ordinal order.
    pub fn score_all(&self, query: &[f32]) -> Result<Vec<f32>> {
        if self.is_empty() {
            return Ok(Vec::new());
        }
        if query.len() != self.dims {
            return Err(CoreError::DimensionMismatch {
                expected: self.dims,
                actual: query.len(),
            });
        }
        let mut q = query.to_vec();
        l2_normalize(&mut q);
        Ok(self.vectors.iter().map(|v| dot(&q, v)).collect())
    }

    /// Top `n` `(ordinal, similarity)` pairs, best first, ties by ordinal.
    ///
    /// Requesting `n >= len()` scores the whole corpus.
    pub fn search(&self, query: &[f32], n: usize) -> Result<Vec<(usize, f32)>> {
        let scores = self.score_all(query)?;
        let mut hits: Vec<(usize, f32)> = scores.into_iter().enumerate().collect();
        hits.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        hits.truncate(n);
        Ok(hits)
    }
}
