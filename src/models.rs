//! API models for request/response types.
//!
//! Mirrors the JSON shapes of the common `/v1/embeddings` contract.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::MODEL_NAME;

/// Request body for `POST /v1/embeddings`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRequest {
    /// Raw `input`; its shape is checked by the validator, not by serde.
    #[serde(default)]
    pub input: Value,
    /// Informational only, the fixed model always answers.
    #[serde(default = "default_model")]
    pub model: String,
}

fn default_model() -> String {
    MODEL_NAME.to_string()
}

/// One embedding in the response `data` array.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingData {
    pub embedding: Vec<f32>,
    pub index: usize,
    pub object: String,
}

/// Usage block.
///
/// Both counts hold the summed vector lengths rather than real token counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: usize,
    pub total_tokens: usize,
}

/// Response body for `POST /v1/embeddings`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingResponse {
    pub data: Vec<EmbeddingData>,
    pub model: String,
    pub usage: Usage,
    pub object: String,
}

/// Health and readiness probe body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }

    pub fn loading() -> Self {
        Self {
            status: "loading".to_string(),
        }
    }
}

/// Error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Human-readable message.
    pub message: String,
    /// `invalid_request_error` or `server_error`.
    pub r#type: String,
    /// Error code (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_defaults_model() {
        let request: EmbeddingRequest = serde_json::from_value(json!({"input": "hello"})).unwrap();
        assert_eq!(request.model, MODEL_NAME);
        assert_eq!(request.input, json!("hello"));
    }

    #[test]
    fn test_request_keeps_any_input_shape() {
        let request: EmbeddingRequest =
            serde_json::from_value(json!({"input": [1, 2, 3], "model": "other"})).unwrap();
        assert_eq!(request.model, "other");
        assert!(request.input.is_array());

        let missing: EmbeddingRequest = serde_json::from_value(json!({})).unwrap();
        assert!(missing.input.is_null());
    }

    #[test]
    fn test_error_response_shape() {
        let body = serde_json::to_value(ErrorResponse {
            error: ErrorDetail {
                message: "model not loaded".to_string(),
                r#type: "server_error".to_string(),
                code: None,
            },
        })
        .unwrap();

        assert_eq!(
            body,
            json!({"error": {"message": "model not loaded", "type": "server_error"}})
        );
    }
}
