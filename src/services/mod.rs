//! Services module.

pub mod cache;
pub mod orchestrator;
pub mod response_builder;
pub mod validator;

pub use cache::EmbeddingCache;
pub use orchestrator::EmbeddingOrchestrator;
pub use response_builder::build_response;
pub use validator::validate_input;
