//! Confidence gate between retrieval and generation.
//!
//! If the best fused score of a retrieval falls below the threshold, the
//! caller answers with a fixed "not found" message and the generator is
//! never called. Otherwise the ranked evidence, together with the threshold
//! that admitted it, is handed to prompt construction.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::engine::RagEngine;
use crate::error::Result;
use crate::generation::Generator;
use crate::models::RetrievedChunk;

pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.35;
pub const DEFAULT_NOT_FOUND_MESSAGE: &str = "Information not found in the available sources.";

/// Highest fused score in a result set, `0.0` when empty.
pub fn best_score(results: &[RetrievedChunk]) -> f32 {
    if results.is_empty() {
        return 0.0;
    }
    results
        .iter()
        .map(|r| r.score)
        .fold(f32::NEG_INFINITY, f32::max)
}

/// Ranked evidence that cleared the gate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evidence {
    /// Retrieved chunks in rank order.
    pub results: Vec<RetrievedChunk>,
    /// Threshold the evidence was admitted under.
    pub threshold: f32,
    pub best_score: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GateDecision {
    Insufficient { best_score: f32 },
    Proceed(Evidence),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetrievalGate {
    pub threshold: f32,
}

impl RetrievalGate {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    pub fn evaluate(&self, results: Vec<RetrievedChunk>) -> GateDecision {
        let best = best_score(&results);
        if results.is_empty() || best < self.threshold {
            return GateDecision::Insufficient { best_score: best };
        }
        GateDecision::Proceed(Evidence {
            results,
            threshold: self.threshold,
            best_score: best,
        })
    }
}

impl Default for RetrievalGate {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIDENCE_THRESHOLD)
    }
}

/// Outcome of a gated question.
#[derive(Debug, Clone, PartialEq)]
pub enum Answer {
    /// Evidence below threshold; generation was skipped.
    NotFound { best_score: f32 },
    Generated {
        text: String,
        evidence_count: usize,
        best_score: f32,
    },
    /// The generator failed. Carries a message suitable for the end user.
    GenerationFailed { message: String },
}

/// Retrieve, gate, build a prompt, and generate.
///
/// Only retrieval errors (collaborator failure while embedding the query)
/// propagate; a generator failure is reported as
/// [`Answer::GenerationFailed`].
pub async fn answer<F>(
    engine: &RagEngine,
    generator: &dyn Generator,
    gate: &RetrievalGate,
    build_prompt: F,
    query: &str,
    top_k: usize,
) -> Result<Answer>
where
    F: FnOnce(&str, &Evidence) -> String,
{
    let results = engine.retrieve(query, top_k).await?;

    let evidence = match gate.evaluate(results) {
        GateDecision::Insufficient { best_score } => {
            warn!(
                best_score,
                threshold = gate.threshold,
                "retrieval below confidence threshold, skipping generation"
            );
            return Ok(Answer::NotFound { best_score });
        }
        GateDecision::Proceed(evidence) => evidence,
    };

    let prompt = build_prompt(query, &evidence);
    debug!(
        chars = prompt.len(),
        model = generator.model_name(),
        "sending prompt to generator"
    );

    match generator.generate(&prompt).await {
        Ok(text) => Ok(Answer::Generated {
            text,
            evidence_count: evidence.results.len(),
            best_score: evidence.best_score,
        }),
        Err(e) => {
            warn!(error = %e, "generation failed");
            Ok(Answer::GenerationFailed {
                message: format!(
                    "Error generating summary with {}: {}",
                    generator.model_name(),
                    e
                ),
            })
        }
    }
}
