//! Embedding API - Library Entry Point
//!
//! Serves a single static sentence-embedding model behind an
//! OpenAI-compatible `/v1/embeddings` endpoint. Runs entirely on-device.

pub mod clients;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod server;
pub mod services;
pub mod traits;

// Re-export commonly used types
pub use clients::StaticEmbeddingClient;
pub use config::{Config, ConfigError, Dimension};
pub use error::EmbeddingError;
pub use handlers::AppState;
pub use server::{create_router, run_server, serve_while_loading};
pub use services::EmbeddingOrchestrator;
pub use traits::{EmbeddingClient, EmbeddingInput, EmbeddingOutput};
