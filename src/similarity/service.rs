// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Similarity search pipeline
//!
//! `SimilarityService` is the immutable context built once at startup: the
//! feature extractor and the catalog. Each call to `find_similar` runs
//! decode → extract → normalize → k-NN → catalog reads to completion.

use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::knn::{BruteForceIndex, Neighbor};
use crate::catalog::{Catalog, CatalogError, CatalogImage, MatchOutcome};
use crate::vision::{decode_image_bytes, l2_normalize, FeatureExtractor, ImageError};

/// Request-fatal failures of the pipeline
#[derive(Debug, Error)]
pub enum SearchError {
    /// Nothing was uploaded
    #[error("Empty file provided")]
    EmptyUpload,

    /// Upload bytes are not a decodable image
    #[error("Invalid image format or corrupted file: {0}")]
    InvalidImage(#[source] ImageError),

    /// Every matched catalog file was missing or unreadable
    #[error("No similar images found")]
    NoMatches,

    /// Feature extraction failed
    #[error("Feature extraction failed: {0}")]
    Inference(String),

    /// Nearest-neighbor search failed
    #[error("Similarity search failed: {0}")]
    Search(String),
}

impl From<ImageError> for SearchError {
    fn from(err: ImageError) -> Self {
        match err {
            ImageError::EmptyData => SearchError::EmptyUpload,
            other => SearchError::InvalidImage(other),
        }
    }
}

/// Outcome of one query
#[derive(Debug, Clone)]
pub struct SimilarityResult {
    /// Images found on disk, ascending distance
    pub images: Vec<CatalogImage>,
    /// Neighbors whose files were missing or unreadable
    pub skipped: usize,
    pub processing_time_ms: u64,
}

/// Feature extractor plus catalog, shared read-only across requests
pub struct SimilarityService {
    extractor: Arc<dyn FeatureExtractor>,
    catalog: Arc<Catalog>,
    max_upload_bytes: usize,
}

impl std::fmt::Debug for SimilarityService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimilarityService")
            .field("extractor", &self.extractor.name())
            .field("catalog_size", &self.catalog.len())
            .field("dimension", &self.catalog.dimension())
            .field("max_upload_bytes", &self.max_upload_bytes)
            .finish()
    }
}

impl SimilarityService {
    /// Pair an extractor with a catalog
    ///
    /// # Errors
    /// `CatalogError::DimensionMismatch` if the extractor's embeddings cannot
    /// be compared with the catalog's.
    pub fn new(
        extractor: Arc<dyn FeatureExtractor>,
        catalog: Arc<Catalog>,
        max_upload_bytes: usize,
    ) -> Result<Self, CatalogError> {
        if extractor.dimension() != catalog.dimension() {
            return Err(CatalogError::DimensionMismatch {
                catalog: catalog.dimension(),
                extractor: extractor.dimension(),
            });
        }

        Ok(Self {
            extractor,
            catalog,
            max_upload_bytes,
        })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn model_name(&self) -> String {
        self.extractor.name()
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    /// Normalized query embedding for uploaded image bytes
    pub fn embed(&self, bytes: &[u8]) -> Result<Vec<f32>, SearchError> {
        let (image, info) = decode_image_bytes(bytes, self.max_upload_bytes)?;

        debug!(
            "Decoded upload: {}x{} {:?}, {} bytes",
            info.width, info.height, info.format, info.size_bytes
        );

        let mut embedding = self
            .extractor
            .extract(&image)
            .map_err(|e| SearchError::Inference(format!("{:#}", e)))?;

        if embedding.len() != self.catalog.dimension() {
            return Err(SearchError::Inference(format!(
                "extractor returned {} values, catalog expects {}",
                embedding.len(),
                self.catalog.dimension()
            )));
        }

        l2_normalize(&mut embedding);
        Ok(embedding)
    }

    /// Nearest catalog rows for uploaded image bytes, self-match excluded
    pub fn neighbors(&self, bytes: &[u8]) -> Result<Vec<Neighbor>, SearchError> {
        let query = self.embed(bytes)?;
        BruteForceIndex::new(self.catalog.embeddings())
            .similar(&query)
            .map_err(|e| SearchError::Search(e.to_string()))
    }

    /// Run the full pipeline for one upload
    pub fn find_similar(&self, bytes: &[u8]) -> Result<SimilarityResult, SearchError> {
        let start = Instant::now();

        let neighbors = self.neighbors(bytes)?;
        debug!("Nearest neighbors: {:?}", neighbors);

        let outcomes: Vec<MatchOutcome> = neighbors
            .iter()
            .map(|n| self.catalog.read_match(n.index, n.distance))
            .collect();

        let mut images = Vec::with_capacity(outcomes.len());
        let mut skipped = 0;
        for outcome in outcomes {
            match outcome {
                MatchOutcome::Found(image) => images.push(image),
                MatchOutcome::Missing { index, path, reason } => {
                    warn!(
                        "Skipping catalog entry {} ({}): {}",
                        index,
                        path.display(),
                        reason
                    );
                    skipped += 1;
                }
            }
        }

        if images.is_empty() {
            return Err(SearchError::NoMatches);
        }

        let processing_time_ms = start.elapsed().as_millis() as u64;
        info!(
            "Similarity search complete: {} images, {} skipped, {}ms",
            images.len(),
            skipped,
            processing_time_ms
        );

        Ok(SimilarityResult {
            images,
            skipped,
            processing_time_ms,
        })
    }
}
