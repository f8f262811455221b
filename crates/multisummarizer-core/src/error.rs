//! Error type for the retrieval core.
//!
//! Only invalid configuration and collaborator failures are errors. An
//! empty index, a degenerate score distribution, and a low-confidence
//! retrieval are ordinary outcomes and never surface here.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    /// Chunk size / overlap combination that cannot make progress.
    #[error("invalid chunking parameters: chunk size {size}, overlap {overlap} (overlap must be smaller than a non-zero chunk size)")]
    InvalidChunking { size: usize, overlap: usize },

    #[error("invalid fusion weights: {0}")]
    InvalidWeights(String),

    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The embedding collaborator failed or returned a malformed batch.
    #[error("embedding failed: {0}")]
    Embedding(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
