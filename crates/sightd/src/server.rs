//! HTTP server for sightd

use crate::config::Config;
use crate::orchestrator::Orchestrator;
use crate::routes;
use anyhow::{Context, Result};
use axum::extract::DefaultBodyLimit;
use axum::Router;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Application state shared across handlers
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub config: Config,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(orchestrator: Orchestrator, config: Config) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            config,
            start_time: Instant::now(),
        }
    }
}

/// Build the router with all routes and layers
pub fn router(state: Arc<AppState>) -> Router {
    let max_body = state.config.server.max_body_bytes;

    Router::new()
        .merge(routes::analyze_routes())
        .merge(routes::health_routes())
        .with_state(state)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_body))
        // Browser pages post frames from other origins
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Run the HTTP server until ctrl-c
pub async fn run(state: AppState) -> Result<()> {
    let addr = state.config.server.bind_addr.clone();
    let app = router(Arc::new(state));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("  Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("  Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
    info!("  Shutdown requested");
}
