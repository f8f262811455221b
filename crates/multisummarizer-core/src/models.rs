//! Data types that flow through indexing and retrieval.

use serde::Serialize;

/// A contiguous word window of the indexed document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chunk {
    /// Ordinal position in chunking order, starting at 0.
    pub index: usize,
    pub text: String,
}

/// One ranked entry of a retrieval result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievedChunk {
    /// Ordinal of the chunk this entry came from.
    pub index: usize,
    pub text: String,
    /// Fused relevance score used for ranking and gating.
    pub score: f32,
    /// Normalized dense (semantic) component.
    pub dense_score: f32,
    /// Normalized sparse (BM25) component.
    pub sparse_score: f32,
}
