//! HTTP service: grounded question answering plus a health endpoint.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

use crate::chunks::Answer;
use crate::engine::RagEngine;
use crate::error::RagError;
use crate::store::StoreState;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    engine: Arc<RagEngine>,
    default_top_k: usize,
    max_top_k: usize,
}

impl AppState {
    /// Wraps `engine`; `top_k` requests default to `default_top_k` and are capped at `max_top_k`.
    pub fn new(engine: Arc<RagEngine>, default_top_k: usize, max_top_k: usize) -> Self {
        let max_top_k = max_top_k.max(1);
        Self {
            engine,
            default_top_k: default_top_k.clamp(1, max_top_k),
            max_top_k,
        }
    }

    fn resolve_top_k(&self, requested: Option<usize>) -> Result<usize, RagError> {
        match requested {
            Some(0) => Err(RagError::InvalidArgument("top_k must be > 0".to_string())),
            Some(k) => Ok(k.min(self.max_top_k)),
            None => Ok(self.default_top_k),
        }
    }
}

/// Body of `POST /chat`.
#[derive(Debug, Serialize, Deserialize)]
pub struct QuestionRequest {
    /// Question to answer.
    pub question: String,
    /// Chunks to retrieve; server default when omitted.
    #[serde(default)]
    pub top_k: Option<usize>,
}

/// Body of `GET /healthz`.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `ok` when queries can be served, otherwise `unavailable`.
    pub status: String,
    /// Whether an index snapshot is loaded.
    pub index_loaded: bool,
    /// Number of loaded chunks.
    pub chunks: usize,
    /// Embedding dimension of the loaded index.
    pub dimension: Option<usize>,
    /// Lifecycle state of the index store.
    pub state: StoreState,
}

/// JSON error payload.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable failure description.
    pub message: String,
}

type ApiError = (StatusCode, Json<ErrorBody>);

/// Builds the service router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/chat", post(chat_handler))
        .with_state(state)
}

/// Serves the router on `listener` until Ctrl-C.
pub async fn serve(listener: TcpListener, state: AppState) -> anyhow::Result<()> {
    let addr = listener.local_addr().context("listener has no local address")?;
    tracing::info!(%addr, "mdrag api listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server shutdown")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to listen for ctrl-c; running until killed");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}

async fn healthz(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = state.engine.store().status();
    let ready = status.state == StoreState::Ready;
    Json(HealthResponse {
        status: if ready { "ok" } else { "unavailable" }.to_string(),
        index_loaded: ready,
        chunks: status.chunks,
        dimension: status.dimension,
        state: status.state,
    })
}

async fn chat_handler(
    State(state): State<AppState>,
    Json(request): Json<QuestionRequest>,
) -> Result<Json<Answer>, ApiError> {
    if request.question.trim().is_empty() {
        return Err(error_response(RagError::EmptyQuestion));
    }
    let top_k = state.resolve_top_k(request.top_k).map_err(error_response)?;
    let engine = Arc::clone(&state.engine);
    let start = Instant::now();
    let answer = tokio::task::spawn_blocking(move || engine.answer(&request.question, top_k))
        .await
        .map_err(|err| internal_error(format!("answer task join error: {err}")))?
        .map_err(error_response)?;
    tracing::info!(
        top_k,
        citations = answer.citations.len(),
        latency_ms = start.elapsed().as_secs_f64() * 1000.0,
        "answered question"
    );
    Ok(Json(answer))
}

fn error_response(err: RagError) -> ApiError {
    let status = err.status_code();
    if status.is_server_error() {
        tracing::warn!(error = %err, %status, "request failed");
    }
    (
        status,
        Json(ErrorBody {
            message: err.to_string(),
        }),
    )
}

fn internal_error(message: impl Into<String>) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody {
            message: message.into(),
        }),
    )
}
