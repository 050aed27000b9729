//! Shapes model output into the `/v1/embeddings` response envelope.

use crate::models::{EmbeddingData, EmbeddingResponse, Usage};
use crate::traits::EmbeddingOutput;

/// Build the response for already-validated output.
///
/// `index` follows input order. Usage counts are the summed vector lengths,
/// kept for compatibility with existing clients of this service.
pub fn build_response(model: &str, output: EmbeddingOutput) -> EmbeddingResponse {
    let vectors = match output {
        EmbeddingOutput::Single(vector) => vec![vector],
        EmbeddingOutput::Batch(vectors) => vectors,
    };

    let tokens: usize = vectors.iter().map(Vec::len).sum();
    let data = vectors
        .into_iter()
        .enumerate()
        .map(|(index, embedding)| EmbeddingData {
            embedding,
            index,
            object: "embedding".to_string(),
        })
        .collect();

    EmbeddingResponse {
        data,
        model: model.to_string(),
        usage: Usage {
            prompt_tokens: tokens,
            total_tokens: tokens,
        },
        object: "list".to_string(),
    }
}
