//! Text-generation seam.
//!
//! The gate hands a constructed prompt to a [`Generator`] only when the
//! retrieved evidence clears the confidence threshold. Implementations
//! (e.g. a local Ollama model) live in the application crate.

use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait Generator: Send + Sync {
    /// Returns the model identifier (e.g. `"mistral:7b"`).
    fn model_name(&self) -> &str;
    /// Generate a completion for `prompt`.
    ///
    /// Transport and availability failures are returned as errors; the
    /// core never retries.
    async fn generate(&self, prompt: &str) -> Result<String>;
}
