//! Core traits and domain types for embedding clients.

use anyhow::Result;

/// Validated `input` of an embeddings request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmbeddingInput {
    /// A bare string; answered with exactly one item at index 0.
    Single(String),
    /// An ordered list of strings, possibly empty.
    Batch(Vec<String>),
}

impl EmbeddingInput {
    /// Number of texts carried by this input.
    pub fn len(&self) -> usize {
        match self {
            EmbeddingInput::Single(_) => 1,
            EmbeddingInput::Batch(texts) => texts.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Model output, shaped like the input it was computed from.
#[derive(Debug, Clone, PartialEq)]
pub enum EmbeddingOutput {
    Single(Vec<f32>),
    Batch(Vec<Vec<f32>>),
}

/// Trait for embedding clients that turn text into vectors.
///
/// Calls are blocking and CPU-bound; callers are expected to run them off the
/// async runtime. Implementations are shared across threads, so one that is not
/// safe for concurrent invocation must serialize calls internally.
pub trait EmbeddingClient: Send + Sync {
    /// Encode a single text.
    fn encode(&self, text: &str) -> Result<Vec<f32>>;

    /// Encode several texts, one vector per text in input order.
    fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Length of every vector this client produces.
    fn dimension(&self) -> usize;

    /// Identifier of the underlying model.
    fn model_name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_len() {
        assert_eq!(EmbeddingInput::Single(String::new()).len(), 1);
        assert!(EmbeddingInput::Batch(vec![]).is_empty());
        assert_eq!(
            EmbeddingInput::Batch(vec!["a".to_string(), "b".to_string()]).len(),
            2
        );
    }
}
