//! Request input validation.
//!
//! Turns the raw JSON `input` into an [`EmbeddingInput`] before anything else
//! looks at it. Only a string or an array of strings gets through.

use serde_json::Value;

use crate::error::EmbeddingError;
use crate::traits::EmbeddingInput;

/// Classify and check the `input` field of an embeddings request.
///
/// Array elements are checked in order and the first non-string element stops
/// validation. An empty array is valid.
pub fn validate_input(input: Value) -> Result<EmbeddingInput, EmbeddingError> {
    match input {
        Value::String(text) => Ok(EmbeddingInput::Single(text)),
        Value::Array(items) => {
            let mut texts = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::String(text) => texts.push(text),
                    _ => return Err(EmbeddingError::InvalidInput),
                }
            }
            Ok(EmbeddingInput::Batch(texts))
        }
        _ => Err(EmbeddingError::InvalidInput),
    }
}
