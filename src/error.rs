//! HTTP error handling and response mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::{ErrorDetail, ErrorResponse};

/// Message returned when `input` has the wrong shape.
pub const INVALID_INPUT_MESSAGE: &str = "input needs to be an array of strings or a string";

/// Message returned while the model is still loading.
pub const MODEL_NOT_LOADED_MESSAGE: &str = "model not loaded";

#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// The request body could not be read as an embeddings request.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("request body too large: {0}")]
    PayloadTooLarge(String),

    #[error("{}", INVALID_INPUT_MESSAGE)]
    InvalidInput,

    #[error("{}", MODEL_NOT_LOADED_MESSAGE)]
    ModelNotReady,

    #[error("embedding failed: {0}")]
    Encoding(String),

    #[error("worker pool unavailable: {0}")]
    WorkerPool(String),
}

impl EmbeddingError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            EmbeddingError::InvalidRequest(_) | EmbeddingError::InvalidInput => {
                StatusCode::BAD_REQUEST
            }
            EmbeddingError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            EmbeddingError::ModelNotReady
            | EmbeddingError::Encoding(_)
            | EmbeddingError::WorkerPool(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_type(&self) -> &'static str {
        if self.status_code().is_client_error() {
            "invalid_request_error"
        } else {
            "server_error"
        }
    }

    fn code(&self) -> &'static str {
        match self {
            EmbeddingError::InvalidRequest(_) => "INVALID_REQUEST",
            EmbeddingError::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            EmbeddingError::InvalidInput => "INVALID_INPUT",
            EmbeddingError::ModelNotReady => "MODEL_NOT_READY",
            EmbeddingError::Encoding(_) => "EMBEDDING_FAILED",
            EmbeddingError::WorkerPool(_) => "WORKER_POOL_UNAVAILABLE",
        }
    }
}

impl IntoResponse for EmbeddingError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            error: ErrorDetail {
                message: self.to_string(),
                r#type: self.error_type().to_string(),
                code: Some(self.code().to_string()),
            },
        });

        (self.status_code(), body).into_response()
    }
}
