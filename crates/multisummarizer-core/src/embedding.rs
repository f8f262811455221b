//! Embedding trait and vector utilities.
//!
//! Defines the [`Embedder`] trait that every embedding backend implements,
//! plus pure helpers for normalization and inner product. Network-backed and
//! model-backed providers (Ollama, OpenAI, fastembed) live in the
//! application crate; [`HashedEmbedder`] is the dependency-free fallback.

use anyhow::Result;
use async_trait::async_trait;

/// Trait for embedding backends.
///
/// `embed` must return exactly one vector per input text, in input order.
/// Vectors may be raw; the dense index normalizes them.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Returns the model identifier (e.g. `"bge-base-en-v1.5"`).
    fn model_name(&self) -> &str;
    /// Returns the embedding vector dimensionality (e.g. `768`).
    fn dims(&self) -> usize;
    /// Embed a batch of texts.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Scale a vector to unit length in place. Zero vectors are left as-is.
pub fn l2_normalize(vec: &mut [f32]) {
    let norm = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for v in vec.iter_mut() {
            *v /= norm;
        }
    }
}

/// Inner product. Equals cosine similarity when both inputs are unit length.
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

// ============ Hashed Embedder ============

/// Offline embedder that hashes terms into fixed buckets.
///
/// Lowercases text, splits on non-alphanumeric characters, and accumulates
/// length-weighted term frequencies into `dims` FNV-1a buckets. Lexical
/// rather than semantic, but deterministic and always available, which
/// makes it the provider for tests and air-gapped runs.
#[derive(Debug, Clone)]
pub struct HashedEmbedder {
    dims: usize,
}

pub const DEFAULT_HASHED_DIMS: usize = 256;

impl HashedEmbedder {
    pub fn new(dims: usize) -> Self {
        Self { dims: dims.max(1) }
    }

    fn bucket(&self, term: &str) -> usize {
        let mut h: u64 = 0xcbf29ce484222325;
        for b in term.as_bytes() {
            h ^= *b as u64;
            h = h.wrapping_mul(0x100000001b3);
        }
        (h % self.dims as u64) as usize
    }

    fn vector(&self, text: &str) -> Vec<f32> {
        let terms: Vec<String> = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_lowercase())
            .collect();

        let mut vec = vec![0.0f32; self.dims];
        if terms.is_empty() {
            return vec;
        }

        let total = terms.len() as f32;
        for term in &terms {
            let weight = 1.0 + (term.chars().count() as f32).ln();
            vec[self.bucket(term)] += weight / total;
        }

        l2_normalize(&mut vec);
        vec
    }
}

impl Default for HashedEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_HASHED_DIMS)
    }
}

#[async_trait]
impl Embedder for HashedEmbedder {
    fn model_name(&self) -> &str {
        "hashed"
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.vector(t)).collect())
    }
}
