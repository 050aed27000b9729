//! HTTP handlers module.
//!
//! Provides the embeddings endpoint and the liveness/readiness probes.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use tracing::{error, info};

use crate::config::Config;
use crate::error::EmbeddingError;
use crate::models::{EmbeddingRequest, EmbeddingResponse, HealthResponse};
use crate::services::{build_response, validate_input, EmbeddingOrchestrator};

/// Application state shared across handlers.
pub struct AppState {
    pub orchestrator: Arc<EmbeddingOrchestrator>,
    /// Router-level settings such as the request body limit.
    pub config: Config,
}

/// Liveness probe for `/` and `/healthz`, independent of model state.
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}

/// Readiness probe: succeeds only once the model is loaded.
pub async fn readiness_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<HealthResponse>) {
    if state.orchestrator.is_ready() {
        (StatusCode::OK, Json(HealthResponse::ok()))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse::loading()),
        )
    }
}

/// `POST /v1/embeddings`.
pub async fn create_embeddings(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<EmbeddingRequest>, JsonRejection>,
) -> Result<Json<EmbeddingResponse>, EmbeddingError> {
    let Json(request) = payload.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            EmbeddingError::PayloadTooLarge(rejection.body_text())
        } else {
            EmbeddingError::InvalidRequest(rejection.body_text())
        }
    })?;

    let input = validate_input(request.input)?;

    info!(
        "Embedding {} text(s), requested model: {}",
        input.len(),
        request.model
    );

    let output = state.orchestrator.embed(input).await.map_err(|e| {
        error!("Embedding failed: {}", e);
        e
    })?;

    Ok(Json(build_response(state.orchestrator.model_name(), output)))
}
