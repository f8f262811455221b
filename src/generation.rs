//! Text generation providers.
//!
//! - **[`OllamaGenerator`]**: `POST /api/generate` on a local Ollama
//!   instance with streaming off.
//! - **[`DisabledGenerator`]**: always fails; every gated answer then
//!   reports a generation failure instead of calling out.

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use multisummarizer_core::generation::Generator;

use crate::config::GenerationConfig;

/// Create the [`Generator`] named by `config.provider`.
pub fn create_generator(config: &GenerationConfig) -> Result<Arc<dyn Generator>> {
    match config.provider.as_str() {
        "ollama" => Ok(Arc::new(OllamaGenerator::new(config)?)),
        "disabled" => Ok(Arc::new(DisabledGenerator)),
        other => bail!("Unknown generation provider: {}", other),
    }
}

pub struct DisabledGenerator;

#[async_trait]
impl Generator for DisabledGenerator {
    fn model_name(&self) -> &str {
        "disabled"
    }

    async fn generate(&self, _prompt: &str) -> Result<String> {
        bail!("Generation provider is disabled. Set [generation] provider in config.")
    }
}

/// Single-shot completion against an Ollama server.
///
/// No retries: a generation can take minutes, and a failure is reported
/// to the user as-is.
pub struct OllamaGenerator {
    model: String,
    url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

impl OllamaGenerator {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            model: config.model.clone(),
            url: config.url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[async_trait]
impl Generator for OllamaGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let endpoint = format!("{}/api/generate", self.url);
        let body = serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
        });

        debug!(model = %self.model, %endpoint, "requesting completion");

        let response = self
            .client
            .post(&endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| anyhow!("Ollama connection error ({}): {}", endpoint, e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            bail!("Ollama error {}: {}", status, text);
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| anyhow!("Invalid Ollama response: {}", e))?;
        Ok(parsed.response.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_generator_by_name() {
        let generator = create_generator(&GenerationConfig::default()).unwrap();
        assert_eq!(generator.model_name(), "mistral:7b");

        let config = GenerationConfig {
            provider: "disabled".to_string(),
            ..GenerationConfig::default()
        };
        assert_eq!(create_generator(&config).unwrap().model_name(), "disabled");

        let config = GenerationConfig {
            provider: "gpt".to_string(),
            ..GenerationConfig::default()
        };
        assert!(create_generator(&config).is_err());
    }

    #[test]
    fn test_parse_generate_response() {
        let parsed: GenerateResponse =
            serde_json::from_str(r#"{"model":"mistral:7b","response":"Cats are mammals.","done":true}"#)
                .unwrap();
        assert_eq!(parsed.response, "Cats are mammals.");
    }

    #[tokio::test]
    async fn test_unreachable_server_errors() {
        let config = GenerationConfig {
            url: "http://127.0.0.1:9/".to_string(),
            timeout_secs: 2,
            ..GenerationConfig::default()
        };
        let generator = OllamaGenerator::new(&config).unwrap();
        let err = generator.generate("hello").await.unwrap_err();
        assert!(err.to_string().contains("Ollama connection error"));
    }

    #[tokio::test]
    async fn test_disabled_generator_errors() {
        assert!(DisabledGenerator.generate("hello").await.is_err());
    }
}
