// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod catalog;
pub mod config;
pub mod similarity;
pub mod version;
pub mod vision;

// Re-export main types
pub use api::{create_app, AppState};
pub use catalog::{Catalog, CatalogError, CatalogLoader, MatchOutcome};
pub use config::ServerConfig;
pub use similarity::{BruteForceIndex, Neighbor, SearchError, SimilarityService};
pub use vision::{FeatureExtractor, OnnxFeatureExtractor};
