// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    extract::{DefaultBodyLimit, State},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, sync::Arc};
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::find_similar::find_similar_handler;
use crate::similarity::SimilarityService;
use crate::version;

/// Room left in the body limit for multipart boundaries and headers
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Shared, read-only state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<SimilarityService>,
    /// Include per-match distances in find-similar responses
    pub expose_distances: bool,
}

impl AppState {
    pub fn new(service: Arc<SimilarityService>) -> Self {
        Self {
            service,
            expose_distances: false,
        }
    }

    pub fn with_distances(mut self, expose: bool) -> Self {
        self.expose_distances = expose;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model: String,
    pub catalog_size: usize,
    pub dimension: usize,
    pub version: String,
}

/// Build the router with CORS open to any origin
pub fn create_app(state: AppState) -> Router {
    let body_limit = state.service.max_upload_bytes() + MULTIPART_OVERHEAD_BYTES;

    Router::new()
        .route("/find-similar", post(find_similar_handler))
        .route("/health", get(health_handler))
        .route("/ping", get(ping_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until Ctrl+C
pub async fn start_server(
    addr: SocketAddr,
    state: AppState,
) -> anyhow::Result<()> {
    let app = create_app(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("API server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("API server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let catalog = state.service.catalog();
    Json(HealthResponse {
        status: "ok".to_string(),
        model: state.service.model_name(),
        catalog_size: catalog.len(),
        dimension: catalog.dimension(),
        version: version::VERSION_NUMBER.to_string(),
    })
}

async fn ping_handler() -> &'static str {
    "PONG"
}
