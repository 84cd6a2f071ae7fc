// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{Context, Result};
use clap::Parser;
use image_similarity_node::{
    api::{start_server, AppState},
    config::ServerConfig,
    similarity::SimilarityService,
    version,
    vision::{FeatureExtractor, OnnxFeatureExtractor},
};
use std::{env, sync::Arc};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    let config = ServerConfig::parse();
    config.validate().context("Invalid configuration")?;

    info!("🚀 Starting {}", version::get_version_string());

    // Catalog artifacts must be present before the server can answer requests
    let catalog = config
        .catalog_loader()
        .load()
        .await
        .context("Failed to load catalog")?;
    info!(
        "✅ Catalog ready: {} images, {}D embeddings",
        catalog.len(),
        catalog.dimension()
    );

    let model_path = config.model_path.clone();
    let options = config.extractor_options();
    let extractor = tokio::task::spawn_blocking(move || OnnxFeatureExtractor::new(model_path, options))
        .await
        .context("Feature extractor loader panicked")?
        .context("Failed to load feature extractor")?;
    info!(
        "✅ Feature extractor ready: {} ({}D)",
        extractor.name(),
        extractor.dimension()
    );

    let service = SimilarityService::new(
        Arc::new(extractor),
        Arc::new(catalog),
        config.max_upload_bytes,
    )
    .context("Feature extractor and catalog are incompatible")?;

    let state = AppState::new(Arc::new(service)).with_distances(config.expose_distances);

    start_server(config.socket_addr()?, state).await
}
