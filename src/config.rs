//! TOML configuration.
//!
//! Every section is optional; a missing section or key falls back to the
//! stock defaults (200-word chunks with 40 words of overlap, 75/25
//! dense/sparse fusion, a 0.35 confidence gate, a local
//! `bge-base-en-v1.5` embedder and `mistral:7b` served by Ollama).
//!
//! ```toml
//! [chunking]
//! chunk_size = 200
//! overlap = 40
//!
//! [retrieval]
//! top_k = 5
//! dense_weight = 0.75
//! sparse_weight = 0.25
//! confidence_threshold = 0.35
//!
//! [embedding]
//! provider = "local"          # local | ollama | openai | hashed | disabled
//! model = "bge-base-en-v1.5"
//!
//! [generation]
//! provider = "ollama"         # ollama | disabled
//! model = "mistral:7b"
//! url = "http://localhost:11434"
//!
//! [server]
//! bind = "127.0.0.1:8000"
//! upload_dir = "./uploads"
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use multisummarizer_core::chunk::{ChunkParams, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use multisummarizer_core::fusion::{FusionWeights, DEFAULT_DENSE_WEIGHT, DEFAULT_SPARSE_WEIGHT};
use multisummarizer_core::gate::{
    RetrievalGate, DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_NOT_FOUND_MESSAGE,
};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub transcription: TranscriptionConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_overlap")]
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}
fn default_overlap() -> usize {
    DEFAULT_CHUNK_OVERLAP
}

impl ChunkingConfig {
    pub fn params(&self) -> ChunkParams {
        ChunkParams {
            size: self.chunk_size,
            overlap: self.overlap,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_dense_weight")]
    pub dense_weight: f32,
    #[serde(default = "default_sparse_weight")]
    pub sparse_weight: f32,
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,
    #[serde(default = "default_not_found_message")]
    pub not_found_message: String,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            dense_weight: DEFAULT_DENSE_WEIGHT,
            sparse_weight: DEFAULT_SPARSE_WEIGHT,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            not_found_message: default_not_found_message(),
        }
    }
}

fn default_top_k() -> usize {
    5
}
fn default_dense_weight() -> f32 {
    DEFAULT_DENSE_WEIGHT
}
fn default_sparse_weight() -> f32 {
    DEFAULT_SPARSE_WEIGHT
}
fn default_confidence_threshold() -> f32 {
    DEFAULT_CONFIDENCE_THRESHOLD
}
fn default_not_found_message() -> String {
    DEFAULT_NOT_FOUND_MESSAGE.to_string()
}

impl RetrievalConfig {
    pub fn weights(&self) -> FusionWeights {
        FusionWeights {
            dense: self.dense_weight,
            sparse: self.sparse_weight,
        }
    }

    pub fn gate(&self) -> RetrievalGate {
        RetrievalGate::new(self.confidence_threshold)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    /// Base URL for the `ollama` provider.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: None,
            dims: None,
            url: None,
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_embedding_provider() -> String {
    "local".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    #[serde(default = "default_generation_provider")]
    pub provider: String,
    #[serde(default = "default_generation_model")]
    pub model: String,
    #[serde(default = "default_ollama_url")]
    pub url: String,
    #[serde(default = "default_generation_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: default_generation_provider(),
            model: default_generation_model(),
            url: default_ollama_url(),
            timeout_secs: default_generation_timeout_secs(),
        }
    }
}

fn default_generation_provider() -> String {
    "ollama".to_string()
}
fn default_generation_model() -> String {
    "mistral:7b".to_string()
}
fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}
fn default_generation_timeout_secs() -> u64 {
    300
}

/// Whisper-compatible speech-to-text endpoint for audio and video uploads.
#[derive(Debug, Deserialize, Clone)]
pub struct TranscriptionConfig {
    /// Base URL serving `POST /v1/audio/transcriptions`. Unset disables
    /// audio/video extraction.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_transcription_model")]
    pub model: String,
    #[serde(default = "default_transcription_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            url: None,
            model: default_transcription_model(),
            timeout_secs: default_transcription_timeout_secs(),
        }
    }
}

fn default_transcription_model() -> String {
    "whisper-1".to_string()
}
fn default_transcription_timeout_secs() -> u64 {
    600
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            upload_dir: default_upload_dir(),
            allowed_origins: default_allowed_origins(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}
fn default_upload_dir() -> PathBuf {
    PathBuf::from("./uploads")
}
fn default_allowed_origins() -> Vec<String> {
    vec![
        "http://localhost:5173".to_string(),
        "http://localhost:5174".to_string(),
        "http://localhost:3000".to_string(),
    ]
}

/// Load configuration from `path`, or defaults when no path is given.
///
/// Environment overrides are applied before validation.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let mut config = match path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            parse_config(&content)?
        }
        None => Config::default(),
    };

    apply_env_overrides(&mut config);
    validate(&config)?;
    Ok(config)
}

pub fn parse_config(content: &str) -> Result<Config> {
    toml::from_str(content).with_context(|| "Failed to parse config file")
}

fn apply_env_overrides(config: &mut Config) {
    if let Ok(model) = std::env::var("OLLAMA_MODEL") {
        if !model.is_empty() {
            config.generation.model = model;
        }
    }
    if let Ok(url) = std::env::var("OLLAMA_BASE_URL") {
        if !url.is_empty() {
            config.generation.url = url;
        }
    }
    if let Ok(dir) = std::env::var("MSUM_UPLOAD_DIR") {
        if !dir.is_empty() {
            config.server.upload_dir = PathBuf::from(dir);
        }
    }
}

pub fn validate(config: &Config) -> Result<()> {
    // Validate chunking
    if config.chunking.chunk_size == 0 {
        bail!("chunking.chunk_size must be > 0");
    }
    if config.chunking.overlap >= config.chunking.chunk_size {
        bail!(
            "chunking.overlap ({}) must be smaller than chunking.chunk_size ({})",
            config.chunking.overlap,
            config.chunking.chunk_size
        );
    }

    // Validate retrieval
    if config.retrieval.top_k < 1 {
        bail!("retrieval.top_k must be >= 1");
    }
    config
        .retrieval
        .weights()
        .validate()
        .with_context(|| "retrieval.dense_weight / retrieval.sparse_weight")?;
    if !(0.0..=1.0).contains(&config.retrieval.confidence_threshold) {
        bail!("retrieval.confidence_threshold must be in [0.0, 1.0]");
    }

    // Validate embedding
    match config.embedding.provider.as_str() {
        "disabled" | "local" | "hashed" => {}
        "ollama" | "openai" => {
            if config.embedding.model.is_none() {
                bail!(
                    "embedding.model must be specified when provider is '{}'",
                    config.embedding.provider
                );
            }
        }
        other => bail!(
            "Unknown embedding provider: '{}'. Must be local, ollama, openai, hashed, or disabled.",
            other
        ),
    }
    if config.embedding.dims == Some(0) {
        bail!("embedding.dims must be > 0");
    }
    if config.embedding.batch_size == 0 {
        bail!("embedding.batch_size must be > 0");
    }

    match config.generation.provider.as_str() {
        "ollama" | "disabled" => {}
        other => bail!(
            "Unknown generation provider: '{}'. Must be ollama or disabled.",
            other
        ),
    }

    Ok(())
}
