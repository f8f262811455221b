//! Upload ingestion and gated summarization.
//!
//! [`Summarizer`] is the application service behind both the HTTP API and
//! the CLI. It owns the retrieval engine (one active document at a time),
//! the generator, and the optional media transcriber.
//!
//! ```text
//! ingest:    save bytes ──▶ extract text ──▶ RagEngine::index_document
//! summarize: RagEngine::retrieve ──▶ gate ──▶ build_prompt ──▶ Generator
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use tracing::{info, warn};

use multisummarizer_core::gate::{self, Answer};
use multisummarizer_core::generation::Generator;
use multisummarizer_core::{RagEngine, RetrievedChunk};

use crate::config::{Config, RetrievalConfig};
use crate::embedding::create_embedder;
use crate::extract::{extract_text, Transcriber};
use crate::generation::create_generator;
use crate::prompt::build_prompt;

/// Characters of extracted text echoed back after an upload.
pub const PREVIEW_CHARS: usize = 200;

/// Result of ingesting one upload.
///
/// Serializes with a `status` tag: `"processed_and_indexed"` or `"error"`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status")]
pub enum IngestOutcome {
    #[serde(rename = "processed_and_indexed")]
    Indexed {
        filename: String,
        path: String,
        extracted_text_length: usize,
        chunk_count: usize,
        preview: String,
    },
    #[serde(rename = "error")]
    Failed { filename: String, error: String },
}

pub struct Summarizer {
    engine: Arc<RagEngine>,
    generator: Arc<dyn Generator>,
    transcriber: Option<Transcriber>,
    retrieval: RetrievalConfig,
    upload_dir: PathBuf,
}

impl Summarizer {
    pub fn new(
        engine: Arc<RagEngine>,
        generator: Arc<dyn Generator>,
        transcriber: Option<Transcriber>,
        retrieval: RetrievalConfig,
        upload_dir: PathBuf,
    ) -> Self {
        Self {
            engine,
            generator,
            transcriber,
            retrieval,
            upload_dir,
        }
    }

    /// Wire up providers from a validated config.
    pub fn from_config(config: &Config) -> Result<Self> {
        let embedder = create_embedder(&config.embedding)?;
        let generator = create_generator(&config.generation)?;
        let transcriber = Transcriber::from_config(&config.transcription)?;
        let engine = RagEngine::new(
            embedder,
            config.chunking.params(),
            config.retrieval.weights(),
        );
        Ok(Self::new(
            Arc::new(engine),
            generator,
            transcriber,
            config.retrieval.clone(),
            config.server.upload_dir.clone(),
        ))
    }

    pub fn engine(&self) -> &RagEngine {
        &self.engine
    }

    pub fn generator_model(&self) -> &str {
        self.generator.model_name()
    }

    /// Save an upload, extract its text, and make it the active document.
    ///
    /// Only a failure to store the file is an `Err`. Extraction and indexing
    /// failures are reported as [`IngestOutcome::Failed`] and leave the
    /// previously indexed document in place.
    pub async fn ingest(
        &self,
        filename: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<IngestOutcome> {
        let name = sanitize_filename(filename)?;
        tokio::fs::create_dir_all(&self.upload_dir)
            .await
            .with_context(|| format!("Failed to create {}", self.upload_dir.display()))?;
        let path = self.upload_dir.join(&name);
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;

        info!(filename = %name, content_type, bytes = bytes.len(), "ingesting upload");

        let text = match extract_text(bytes, content_type, &name, self.transcriber.as_ref()).await
        {
            Ok(text) => text,
            Err(e) => {
                warn!(filename = %name, error = %e, "extraction failed");
                return Ok(IngestOutcome::Failed {
                    filename: name,
                    error: e.to_string(),
                });
            }
        };

        match self.engine.index_document(&text).await {
            Ok(chunk_count) => {
                info!(filename = %name, chars = text.chars().count(), chunk_count, "indexed upload");
                Ok(IngestOutcome::Indexed {
                    filename: name,
                    path: path.display().to_string(),
                    extracted_text_length: text.chars().count(),
                    chunk_count,
                    preview: text.chars().take(PREVIEW_CHARS).collect(),
                })
            }
            Err(e) => {
                warn!(filename = %name, error = %e, "indexing failed");
                Ok(IngestOutcome::Failed {
                    filename: name,
                    error: e.to_string(),
                })
            }
        }
    }

    /// Index already-extracted text, replacing the active document.
    pub async fn index_text(&self, text: &str) -> Result<usize> {
        Ok(self.engine.index_document(text).await?)
    }

    /// Ranked chunks for `query` with the configured `top_k`, or `top_k`
    /// when given.
    pub async fn search(&self, query: &str, top_k: Option<usize>) -> Result<Vec<RetrievedChunk>> {
        let k = top_k.unwrap_or(self.retrieval.top_k);
        Ok(self.engine.retrieve(query, k).await?)
    }

    /// Answer `query` from the active document.
    ///
    /// The low-confidence fallback and generator failures are returned as
    /// the summary text; only a retrieval failure is an `Err`.
    pub async fn summarize(&self, query: &str, top_k: Option<usize>) -> Result<String> {
        let not_found = self.retrieval.not_found_message.as_str();
        let outcome = gate::answer(
            &self.engine,
            self.generator.as_ref(),
            &self.retrieval.gate(),
            |q, evidence| build_prompt(q, evidence, not_found),
            query,
            top_k.unwrap_or(self.retrieval.top_k),
        )
        .await?;

        Ok(match outcome {
            Answer::NotFound { .. } => not_found.to_string(),
            Answer::Generated { text, .. } => text,
            Answer::GenerationFailed { message } => message,
        })
    }
}

/// Keep only the final path component so uploads stay inside `upload_dir`.
pub fn sanitize_filename(filename: &str) -> Result<String> {
    Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .ok_or_else(|| anyhow!("Invalid upload filename: {:?}", filename))
}
