//! HTTP API.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/` | Welcome message |
//! | `GET`  | `/health` | Health check (returns version) |
//! | `POST` | `/api/upload` | Multipart upload (field `file`); extracts and indexes it |
//! | `POST` | `/api/summarize` | `{ "query": "..." }` → `{ "summary": "..." }` |
//!
//! # Error Contract
//!
//! Request errors use a single schema:
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "query must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `internal` (500). A failed extraction
//! is not a request error: `/api/upload` answers 200 with
//! `"status": "error"`. Likewise the low-confidence fallback and generator
//! failures come back as the `summary` text.
//!
//! # CORS
//!
//! Origins come from `[server].allowed_origins`; `"*"` allows any origin.

use axum::{
    extract::{
        multipart::MultipartRejection, rejection::JsonRejection, DefaultBodyLimit, Multipart,
        State,
    },
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{error, info};

use crate::config::Config;
use crate::summarize::{sanitize_filename, IngestOutcome, Summarizer};

/// Largest accepted request body. Lecture recordings run to hundreds of MB.
const MAX_UPLOAD_BYTES: usize = 1024 * 1024 * 1024;

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    summarizer: Arc<Summarizer>,
}

/// Starts the HTTP server on `[server].bind` and runs until the process is
/// terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let summarizer = Arc::new(Summarizer::from_config(config)?);
    let app = build_router(summarizer, &config.server.allowed_origins)?;

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    info!(
        bind = %config.server.bind,
        upload_dir = %config.server.upload_dir.display(),
        "server listening"
    );
    println!("MultiSummarizer API listening on http://{}", config.server.bind);

    axum::serve(listener, app).await?;
    Ok(())
}

/// Build the router with all routes, CORS, and the upload size limit.
pub fn build_router(
    summarizer: Arc<Summarizer>,
    allowed_origins: &[String],
) -> anyhow::Result<Router> {
    let state = AppState { summarizer };

    Ok(Router::new()
        .route("/", get(handle_root))
        .route("/health", get(handle_health))
        .route("/api/upload", post(handle_upload))
        .route("/api/summarize", post(handle_summarize))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors_layer(allowed_origins)?)
        .with_state(state))
}

fn cors_layer(allowed_origins: &[String]) -> anyhow::Result<CorsLayer> {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if allowed_origins.iter().any(|o| o == "*") {
        return Ok(layer.allow_origin(Any));
    }

    let origins = allowed_origins
        .iter()
        .map(|o| {
            HeaderValue::from_str(o)
                .map_err(|_| anyhow::anyhow!("Invalid server.allowed_origins entry: {}", o))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(layer.allow_origin(AllowOrigin::list(origins)))
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
#[derive(Debug)]
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn internal(err: anyhow::Error) -> AppError {
    error!(error = %err, "request failed");
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: format!("{:#}", err),
    }
}

// ============ GET / ============

#[derive(Serialize)]
struct RootResponse {
    message: String,
}

async fn handle_root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Welcome to MultiSummarizer API".to_string(),
    })
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    /// The crate version from `Cargo.toml`.
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /api/upload ============

/// Handler for `POST /api/upload`.
///
/// Reads the multipart field named `file` and hands it to
/// [`Summarizer::ingest`]. Other fields are ignored.
async fn handle_upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<IngestOutcome>, AppError> {
    let mut multipart = multipart.map_err(|e| bad_request(e.body_text()))?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("malformed multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field
            .file_name()
            .ok_or_else(|| bad_request("field 'file' has no filename"))
            .and_then(|name| sanitize_filename(name).map_err(|e| bad_request(e.to_string())))?;
        let content_type = field.content_type().unwrap_or("").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| bad_request(format!("failed to read upload: {}", e)))?;

        let outcome = state
            .summarizer
            .ingest(&filename, &content_type, &bytes)
            .await
            .map_err(internal)?;
        return Ok(Json(outcome));
    }

    Err(bad_request("missing multipart field 'file'"))
}

// ============ POST /api/summarize ============

#[derive(Deserialize)]
struct SummarizeRequest {
    query: String,
}

#[derive(Serialize)]
struct SummarizeResponse {
    summary: String,
}

async fn handle_summarize(
    State(state): State<AppState>,
    body: Result<Json<SummarizeRequest>, JsonRejection>,
) -> Result<Json<SummarizeResponse>, AppError> {
    let Json(req) = body.map_err(|e| bad_request(e.body_text()))?;

    if req.query.trim().is_empty() {
        return Err(bad_request("query must not be empty"));
    }

    let summary = state
        .summarizer
        .summarize(&req.query, None)
        .await
        .map_err(internal)?;

    Ok(Json(SummarizeResponse { summary }))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use multisummarizer_core::chunk::ChunkParams;
    use multisummarizer_core::embedding::HashedEmbedder;
    use multisummarizer_core::fusion::FusionWeights;
    use multisummarizer_core::RagEngine;
    use tower::ServiceExt;

    use super::*;
    use crate::config::{RetrievalConfig, ServerConfig};
    use crate::generation::DisabledGenerator;

    const ANIMALS: &str = "cats are mammals. dogs are mammals too. birds can fly.";

    fn app(upload_dir: &std::path::Path) -> Router {
        let engine = RagEngine::new(
            Arc::new(HashedEmbedder::default()),
            ChunkParams::new(6, 2).unwrap(),
            FusionWeights::default(),
        );
        let summarizer = Summarizer::new(
            Arc::new(engine),
            Arc::new(DisabledGenerator),
            None,
            RetrievalConfig::default(),
            upload_dir.to_path_buf(),
        );
        build_router(Arc::new(summarizer), &ServerConfig::default().allowed_origins).unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn upload_request(filename: &str, content_type: &str, content: &str) -> Request<Body> {
        let body = format!(
            "--XBOUNDARY\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n\
             Content-Type: {}\r\n\r\n\
             {}\r\n\
             --XBOUNDARY--\r\n",
            filename, content_type, content
        );
        Request::builder()
            .method("POST")
            .uri("/api/upload")
            .header("content-type", "multipart/form-data; boundary=XBOUNDARY")
            .body(Body::from(body))
            .unwrap()
    }

    fn summarize_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/summarize")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_root_and_health() {
        let tmp = tempfile::TempDir::new().unwrap();
        let app = app(tmp.path());

        let response = app
            .clone()
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await["message"],
            "Welcome to MultiSummarizer API"
        );

        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let json = json_body(response).await;
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_upload_indexes_text_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let response = app(tmp.path())
            .oneshot(upload_request("animals.txt", "text/plain", ANIMALS))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = json_body(response).await;
        assert_eq!(json["status"], "processed_and_indexed");
        assert_eq!(json["filename"], "animals.txt");
        assert_eq!(json["extracted_text_length"], ANIMALS.len());
        assert_eq!(json["chunk_count"], 2);
        assert_eq!(json["preview"], ANIMALS);
        assert!(tmp.path().join("animals.txt").exists());
    }

    #[tokio::test]
    async fn test_upload_unsupported_type_reports_error_status() {
        let tmp = tempfile::TempDir::new().unwrap();
        let response = app(tmp.path())
            .oneshot(upload_request("data.zip", "application/zip", "PK"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = json_body(response).await;
        assert_eq!(json["status"], "error");
        assert!(json["error"]
            .as_str()
            .unwrap()
            .contains("unsupported content-type"));
    }

    #[tokio::test]
    async fn test_upload_invalid_filename_is_bad_request() {
        let tmp = tempfile::TempDir::new().unwrap();
        let response = app(tmp.path())
            .oneshot(upload_request("..", "text/plain", ANIMALS))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = json_body(response).await;
        assert_eq!(json["error"]["code"], "bad_request");
        assert!(json["error"]["message"]
            .as_str()
            .unwrap()
            .contains("Invalid upload filename"));
    }

    #[tokio::test]
    async fn test_upload_without_multipart_is_bad_request() {
        let tmp = tempfile::TempDir::new().unwrap();
        let response = app(tmp.path())
            .oneshot(
                Request::post("/api/upload")
                    .header("content-type", "application/json")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"]["code"], "bad_request");
    }

    #[tokio::test]
    async fn test_summarize_empty_query_is_bad_request() {
        let tmp = tempfile::TempDir::new().unwrap();
        let response = app(tmp.path())
            .oneshot(summarize_request(r#"{"query": "   "}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = json_body(response).await;
        assert_eq!(json["error"]["message"], "query must not be empty");
    }

    #[tokio::test]
    async fn test_summarize_before_upload_returns_not_found_message() {
        let tmp = tempfile::TempDir::new().unwrap();
        let response = app(tmp.path())
            .oneshot(summarize_request(r#"{"query": "what are cats?"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await["summary"],
            RetrievalConfig::default().not_found_message
        );
    }

    #[tokio::test]
    async fn test_summarize_generation_failure_is_summary_text() {
        let tmp = tempfile::TempDir::new().unwrap();
        let app = app(tmp.path());
        app.clone()
            .oneshot(upload_request("animals.txt", "text/plain", ANIMALS))
            .await
            .unwrap();

        let response = app
            .oneshot(summarize_request(r#"{"query": "mammals"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let summary = json_body(response).await["summary"]
            .as_str()
            .unwrap()
            .to_string();
        assert!(summary.starts_with("Error generating summary with disabled"));
    }

    #[test]
    fn test_invalid_origin_rejected() {
        assert!(cors_layer(&["*".to_string()]).is_ok());
        assert!(cors_layer(&["http://bad\norigin".to_string()]).is_err());
    }
}
