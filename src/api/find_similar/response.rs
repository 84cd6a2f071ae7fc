// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Find-similar response types

use serde::{Deserialize, Serialize};

use crate::catalog::CatalogImage;

/// Per-image match detail, included only when distances are exposed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchInfo {
    /// Row in the embedding matrix
    pub index: usize,
    /// Catalog path of the image
    pub filename: String,
    /// Euclidean distance from the query embedding
    pub distance: f32,
}

/// Successful find-similar response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindSimilarResponse {
    /// Base64 JPEGs, closest first
    pub similar_images: Vec<String>,
    /// Index-aligned with `similar_images`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matches: Option<Vec<MatchInfo>>,
}

impl FindSimilarResponse {
    pub fn new(images: Vec<CatalogImage>, expose_distances: bool) -> Self {
        let matches = expose_distances.then(|| {
            images
                .iter()
                .map(|img| MatchInfo {
                    index: img.index,
                    filename: img.path.display().to_string(),
                    distance: img.distance,
                })
                .collect()
        });

        Self {
            similar_images: images.into_iter().map(|img| img.jpeg_base64).collect(),
            matches,
        }
    }
}
