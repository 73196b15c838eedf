//! JSON HTTP API for the Transfer Investigation Harness.
//!
//! Exposes ingestion and investigation over HTTP so the pipeline can sit
//! behind an operations dashboard or be driven by scripts.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/ingest` | Load, chunk, embed, and upsert the knowledge base |
//! | `POST` | `/investigate` | Run an investigation for a complaint |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! All error responses share one schema:
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "complaint too short" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `no_content` (404),
//! `malformed_output` (502), `upstream_error` (502), `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted to support browser-based
//! dashboards.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::embedding::{CohereEmbedder, Embedder};
use crate::generation::{CohereGenerator, Generator};
use crate::ingest::run_ingest;
use crate::investigate::run_investigation;
use crate::models::{IngestSummary, InvestigationResult};
use crate::store::{SqliteStore, VectorStore};

/// Shared application state passed to all route handlers via Axum's `State`
/// extractor. Collaborators are trait objects so tests can swap in fakes.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn VectorStore>,
    pub embedder: Arc<dyn Embedder>,
    pub generator: Arc<dyn Generator>,
}

/// Starts the HTTP server with the real SQLite store and Cohere clients.
///
/// Binds to the address configured in `[server].bind` and runs until the
/// process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();

    let store = SqliteStore::connect(config).await?;
    let state = AppState {
        config: Arc::new(config.clone()),
        store: Arc::new(store),
        embedder: Arc::new(CohereEmbedder::new(&config.cohere)?),
        generator: Arc::new(CohereGenerator::new(&config.cohere)?),
    };

    let app = build_router(state);

    println!("Investigation server listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Builds the router over any [`AppState`]. Split out from [`run_server`]
/// so handler tests can drive it without binding a socket.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ingest", post(handle_ingest))
        .route("/investigate", post(handle_investigate))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state)
}

// ============ Error response ============

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

/// Inner error detail with a machine-readable code and human-readable message.
#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
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

/// Inspects pipeline errors and maps them to the most appropriate HTTP
/// status, keyed on distinctive message fragments so the orchestrators
/// stay free of HTTP concerns.
fn classify_pipeline_error(err: anyhow::Error) -> AppError {
    let msg = err.to_string();

    // "No documents found" also contains "not found" — check it first.
    let (status, code) = if msg.contains("No documents found") {
        (StatusCode::NOT_FOUND, "no_content")
    } else if msg.contains("not found") {
        (StatusCode::NOT_FOUND, "not_found")
    } else if msg.contains("Malformed generation output") {
        (StatusCode::BAD_GATEWAY, "malformed_output")
    } else if msg.contains("Cohere") {
        (StatusCode::BAD_GATEWAY, "upstream_error")
    } else {
        (StatusCode::INTERNAL_SERVER_ERROR, "internal")
    };

    AppError {
        status,
        code: code.to_string(),
        message: msg,
    }
}

// ============ GET /health ============

/// JSON response body for `GET /health`.
#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /ingest ============

/// Request body for `POST /ingest`. The body is optional; both flags
/// default to `false`.
#[derive(Deserialize, Default)]
struct IngestRequest {
    #[serde(default)]
    overwrite: bool,
    #[serde(default)]
    dry_run: bool,
}

/// Response body for `POST /ingest`. `documents_ingested` counts chunks
/// upserted, not files.
#[derive(Serialize)]
struct IngestResponse {
    success: bool,
    documents_ingested: usize,
    message: String,
}

impl From<IngestSummary> for IngestResponse {
    fn from(summary: IngestSummary) -> Self {
        Self {
            success: true,
            documents_ingested: summary.chunks_ingested,
            message: summary.message,
        }
    }
}

/// Handler for `POST /ingest`.
///
/// Runs the full ingestion pipeline. Re-running without `overwrite` is
/// idempotent; with `overwrite: true` the store is reset and everything
/// is re-embedded.
async fn handle_ingest(
    State(state): State<AppState>,
    body: Option<Json<IngestRequest>>,
) -> Result<Json<IngestResponse>, AppError> {
    let Json(req) = body.unwrap_or_default();

    let summary = run_ingest(
        &state.config,
        state.store.as_ref(),
        state.embedder.as_ref(),
        req.overwrite,
        req.dry_run,
    )
    .await
    .map_err(classify_pipeline_error)?;

    Ok(Json(summary.into()))
}

// ============ POST /investigate ============

/// Request body for `POST /investigate`.
#[derive(Deserialize)]
struct InvestigateRequest {
    complaint: String,
}

/// Handler for `POST /investigate`.
///
/// Validates the complaint length here, at the boundary, so a rejected
/// request performs no embedding, retrieval, or generation work at all.
async fn handle_investigate(
    State(state): State<AppState>,
    Json(req): Json<InvestigateRequest>,
) -> Result<Json<InvestigationResult>, AppError> {
    let complaint = req.complaint.trim();
    let min_len = state.config.retrieval.min_complaint_len;
    if complaint.chars().count() < min_len {
        return Err(bad_request(format!(
            "complaint must be at least {} characters",
            min_len
        )));
    }

    let result = run_investigation(
        &state.config,
        state.store.as_ref(),
        state.embedder.as_ref(),
        state.generator.as_ref(),
        complaint,
    )
    .await
    .map_err(classify_pipeline_error)?;

    Ok(Json(result))
}
