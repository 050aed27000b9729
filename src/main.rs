//! Embedding API - Main Entry Point
//!
//! Binds the HTTP listener first so liveness probes answer while the model
//! is still loading, then loads the model. A loading failure ends the process,
//! and so does a shutdown signal received mid-load.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use embedding_api::config::Config;
use embedding_api::handlers::AppState;
use embedding_api::services::EmbeddingOrchestrator;
use embedding_api::{create_router, run_server, serve_while_loading};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "embedding_api=info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("❌ {}", e);
            return Err(e.into());
        }
    };

    info!("🚀 Starting Embedding API v{}", env!("CARGO_PKG_VERSION"));
    info!("📦 Model: {} ({}D)", config.model_name, config.dimension);
    info!("🔧 Port: {}", config.port);

    let orchestrator = Arc::new(EmbeddingOrchestrator::new(&config));
    let state = Arc::new(AppState {
        orchestrator: orchestrator.clone(),
        config: config.clone(),
    });

    let listener = tokio::net::TcpListener::bind(config.bind_address())
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_address()))?;
    let server = tokio::spawn(run_server(listener, create_router(state)));

    let loading = async {
        orchestrator.load().await.map_err(|e| {
            error!("❌ Failed to load model {}: {:#}", config.model_name, e);
            e
        })
    };
    serve_while_loading(server, loading).await
}
