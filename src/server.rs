//! Server setup and routing.

use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::handlers::{self, AppState};

/// Create the API router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    let body_limit = state.config.max_body_bytes;

    Router::new()
        // Liveness, independent of model state
        .route("/", get(handlers::health_check))
        .route("/healthz", get(handlers::health_check))
        .route("/readyz", get(handlers::readiness_check))
        .route("/v1/embeddings", post(handlers::create_embeddings))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

/// Serve `router` on `listener` until Ctrl-C.
pub async fn run_server(listener: TcpListener, router: Router) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!("✅ Embeddings Service listening on http://{}", addr);
    }

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

/// Drive the model `loading` future while the spawned `server` keeps serving.
///
/// Returns early when the server stops first (e.g. Ctrl-C during loading).
/// A loading failure aborts the server and is returned.
pub async fn serve_while_loading<F>(
    mut server: JoinHandle<std::io::Result<()>>,
    loading: F,
) -> anyhow::Result<()>
where
    F: Future<Output = anyhow::Result<()>>,
{
    tokio::select! {
        loaded = loading => {
            if let Err(e) = loaded {
                server.abort();
                return Err(e);
            }
        }
        finished = &mut server => {
            info!("Server stopped before the model finished loading");
            finished.context("Server task panicked")??;
            return Ok(());
        }
    }

    server.await.context("Server task panicked")??;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received, draining connections");
    }
}
