//! Embedding clients module.

pub mod static_embedding;

pub use static_embedding::StaticEmbeddingClient;
