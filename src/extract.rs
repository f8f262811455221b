//! Text extraction for uploaded documents.
//!
//! Uploads arrive as bytes plus a declared content type. Browsers frequently
//! send `application/octet-stream` (or nothing) for media files, so those
//! fall back to the file extension before routing:
//!
//! | Resolved type | Extractor |
//! |---------------|-----------|
//! | `application/pdf` | `pdf-extract` |
//! | `text/plain` | UTF-8 (lossy) |
//! | `audio/*`, `video/*` | [`Transcriber`] (Whisper-compatible HTTP endpoint) |
//!
//! Anything else is [`ExtractError::UnsupportedContentType`]. Extraction
//! never panics on malformed input; it returns an error and the upload is
//! reported as failed.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::TranscriptionConfig;

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_TEXT: &str = "text/plain";
pub const MIME_OCTET_STREAM: &str = "application/octet-stream";
/// Type assigned to media files identified only by extension.
pub const MIME_AUDIO: &str = "audio/mpeg";

const MEDIA_EXTENSIONS: &[&str] = &["mp3", "wav", "m4a", "mp4", "mov", "avi"];

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("unsupported content-type: {0}")]
    UnsupportedContentType(String),
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
    #[error("audio/video transcription is not configured (set [transcription] url)")]
    TranscriptionUnavailable,
    #[error("transcription failed: {0}")]
    Transcription(String),
}

/// Resolve the effective content type of an upload.
///
/// A declared type other than octet-stream wins (parameters such as
/// `; charset=utf-8` are dropped). Otherwise the extension decides; an
/// unknown extension keeps the declared type so routing reports it.
pub fn resolve_content_type(content_type: &str, filename: &str) -> String {
    let declared = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();

    if !declared.is_empty() && declared != MIME_OCTET_STREAM {
        return declared;
    }

    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "pdf" => MIME_PDF.to_string(),
        "txt" => MIME_TEXT.to_string(),
        e if MEDIA_EXTENSIONS.contains(&e) => MIME_AUDIO.to_string(),
        _ if declared.is_empty() => MIME_OCTET_STREAM.to_string(),
        _ => declared,
    }
}

/// Extract plain text from an upload.
pub async fn extract_text(
    bytes: &[u8],
    content_type: &str,
    filename: &str,
    transcriber: Option<&Transcriber>,
) -> Result<String, ExtractError> {
    let resolved = resolve_content_type(content_type, filename);
    debug!(filename, declared = content_type, %resolved, "routing extraction");

    if resolved == MIME_PDF {
        extract_pdf(bytes).await
    } else if resolved == MIME_TEXT {
        Ok(String::from_utf8_lossy(bytes).into_owned())
    } else if resolved.starts_with("audio/") || resolved.starts_with("video/") {
        let transcriber = transcriber.ok_or(ExtractError::TranscriptionUnavailable)?;
        transcriber.transcribe(bytes, filename, &resolved).await
    } else {
        Err(ExtractError::UnsupportedContentType(resolved))
    }
}

/// PDF parsing is CPU-bound, so it runs on the blocking pool.
async fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    let bytes = bytes.to_vec();
    tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
        .await
        .map_err(|e| ExtractError::Pdf(e.to_string()))?
        .map_err(|e| ExtractError::Pdf(e.to_string()))
}

/// Client for an OpenAI/Whisper-compatible speech-to-text endpoint.
///
/// Sends `POST {url}/v1/audio/transcriptions` as multipart (`file`, `model`)
/// and reads the `text` field of the JSON response.
pub struct Transcriber {
    endpoint: String,
    model: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

impl Transcriber {
    /// Build a transcriber from config, or `None` when no URL is set.
    pub fn from_config(config: &TranscriptionConfig) -> anyhow::Result<Option<Self>> {
        let Some(url) = config.url.as_deref() else {
            return Ok(None);
        };
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Some(Self {
            endpoint: format!("{}/v1/audio/transcriptions", url.trim_end_matches('/')),
            model: config.model.clone(),
            client,
        }))
    }

    pub async fn transcribe(
        &self,
        bytes: &[u8],
        filename: &str,
        content_type: &str,
    ) -> Result<String, ExtractError> {
        let part = reqwest::multipart::Part::bytes(bytes.to_vec())
            .file_name(filename.to_string())
            .mime_str(content_type)
            .map_err(|e| ExtractError::Transcription(e.to_string()))?;
        let form = reqwest::multipart::Form::new()
            .text("model", self.model.clone())
            .part("file", part);

        info!(filename, bytes = bytes.len(), model = %self.model, "transcribing media");

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                ExtractError::Transcription(format!("connection error ({}): {}", self.endpoint, e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExtractError::Transcription(format!("{}: {}", status, body)));
        }

        let parsed: TranscriptionResponse = response
            .json()
            .await
            .map_err(|e| ExtractError::Transcription(format!("invalid response: {}", e)))?;
        Ok(parsed.text)
    }
}
