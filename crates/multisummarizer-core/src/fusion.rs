//! Min-max normalization and weighted score fusion.
//!
//! Dense and sparse scores live on unrelated scales (cosine in `[-1, 1]`,
//! BM25 unbounded), so each vector is rescaled to `[0, 1]` on its own
//! before the weighted sum:
//!
//! ```text
//! hybrid[i] = w_dense × norm(dense)[i] + w_sparse × norm(sparse)[i]
//! ```
//!
//! Ranking is descending by fused score; equal scores keep chunk order.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

pub const DEFAULT_DENSE_WEIGHT: f32 = 0.75;
pub const DEFAULT_SPARSE_WEIGHT: f32 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FusionWeights {
    pub dense: f32,
    pub sparse: f32,
}

impl FusionWeights {
    pub fn new(dense: f32, sparse: f32) -> Result<Self> {
        let weights = Self { dense, sparse };
        weights.validate()?;
        Ok(weights)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.dense.is_finite() || !self.sparse.is_finite() {
            return Err(CoreError::InvalidWeights(
                "weights must be finite".to_string(),
            ));
        }
        if self.dense < 0.0 || self.sparse < 0.0 {
            return Err(CoreError::InvalidWeights(format!(
                "weights must be non-negative (dense {}, sparse {})",
                self.dense, self.sparse
            )));
        }
        if self.dense + self.sparse <= 0.0 {
            return Err(CoreError::InvalidWeights(
                "dense and sparse weights must not both be zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self {
            dense: DEFAULT_DENSE_WEIGHT,
            sparse: DEFAULT_SPARSE_WEIGHT,
        }
    }
}

/// Min-max normalize scores to `[0.0, 1.0]`.
///
/// If every score is equal the input is returned unchanged.
pub fn min_max_normalize(scores: &[f32]) -> Vec<f32> {
    if scores.is_empty() {
        return Vec::new();
    }

    let s_min = scores.iter().copied().fold(f32::INFINITY, f32::min);
    let s_max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);

    if s_max == s_min {
        return scores.to_vec();
    }

    scores.iter().map(|s| (s - s_min) / (s_max - s_min)).collect()
}

/// Weighted sum of two already-normalized score vectors, aligned by ordinal.
pub fn fuse(dense: &[f32], sparse: &[f32], weights: &FusionWeights) -> Vec<f32> {
    debug_assert_eq!(dense.len(), sparse.len());
    dense
        .iter()
        .zip(sparse.iter())
        .map(|(d, s)| weights.dense * d + weights.sparse * s)
        .collect()
}

/// Rank ordinals by score, descending, keeping the first `top_k`.
///
/// Ties go to the lower ordinal. NaN scores rank last.
pub fn rank(scores: &[f32], top_k: usize) -> Vec<(usize, f32)> {
    let mut ranked: Vec<(usize, f32)> = scores.iter().copied().enumerate().collect();
    ranked.sort_by(|a, b| match (a.1.is_nan(), b.1.is_nan()) {
        (false, false) => b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)),
        (true, true) => a.0.cmp(&b.0),
        (true, false) => std::cmp::Ordering::Greater,
        (false, true) => std::cmp::Ordering::Less,
    });
    ranked.truncate(top_k);
    ranked
}
