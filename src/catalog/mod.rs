// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Static image catalog
//!
//! Holds the precomputed embedding matrix and the index-aligned filename list.
//! Both are loaded once at startup and never mutated afterwards.

pub mod errors;
pub mod loader;

use ndarray::{Array2, ArrayView2};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::vision::{encode_jpeg_base64, read_image_file, JPEG_QUALITY};

pub use errors::CatalogError;
pub use loader::{ArtifactSource, CatalogLoader};

/// A catalog image that was found on disk and re-encoded
#[derive(Debug, Clone)]
pub struct CatalogImage {
    /// Row in the embedding matrix
    pub index: usize,
    /// Resolved path of the image file
    pub path: PathBuf,
    /// Euclidean distance from the query
    pub distance: f32,
    /// Base64-encoded JPEG (quality 100)
    pub jpeg_base64: String,
}

/// Result of reading one matched catalog entry
#[derive(Debug, Clone)]
pub enum MatchOutcome {
    Found(CatalogImage),
    Missing {
        index: usize,
        path: PathBuf,
        reason: String,
    },
}

impl MatchOutcome {
    pub fn is_found(&self) -> bool {
        matches!(self, MatchOutcome::Found(_))
    }
}

/// Embedding matrix plus filename index
#[derive(Debug, Clone)]
pub struct Catalog {
    embeddings: Array2<f32>,
    filenames: Vec<PathBuf>,
    image_root: Option<PathBuf>,
}

impl Catalog {
    /// Build a catalog, checking that it is non-empty, aligned and finite
    pub fn new(
        embeddings: Array2<f32>,
        filenames: Vec<PathBuf>,
        image_root: Option<PathBuf>,
    ) -> Result<Self, CatalogError> {
        if embeddings.nrows() != filenames.len() {
            return Err(CatalogError::LengthMismatch {
                embeddings: embeddings.nrows(),
                filenames: filenames.len(),
            });
        }

        if filenames.is_empty() || embeddings.ncols() == 0 {
            return Err(CatalogError::Empty);
        }

        if let Some(row) = embeddings
            .outer_iter()
            .position(|row| row.iter().any(|v| !v.is_finite()))
        {
            return Err(CatalogError::NonFiniteEmbedding { row });
        }

        Ok(Self {
            embeddings,
            filenames,
            image_root,
        })
    }

    /// Number of catalog entries
    pub fn len(&self) -> usize {
        self.filenames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filenames.is_empty()
    }

    /// Embedding length
    pub fn dimension(&self) -> usize {
        self.embeddings.ncols()
    }

    pub fn embeddings(&self) -> ArrayView2<'_, f32> {
        self.embeddings.view()
    }

    /// Filename exactly as stored in the index
    pub fn filename(&self, index: usize) -> Option<&Path> {
        self.filenames.get(index).map(PathBuf::as_path)
    }

    /// Filename joined onto the image root when it is relative
    pub fn resolve_path(&self, index: usize) -> Option<PathBuf> {
        let filename = self.filename(index)?;
        Some(match &self.image_root {
            Some(root) if filename.is_relative() => root.join(filename),
            _ => filename.to_path_buf(),
        })
    }

    /// Read and re-encode the image for a matched row
    ///
    /// Missing or unreadable files are reported as `MatchOutcome::Missing`
    /// so one bad file never fails the whole request.
    pub fn read_match(&self, index: usize, distance: f32) -> MatchOutcome {
        let Some(path) = self.resolve_path(index) else {
            return MatchOutcome::Missing {
                index,
                path: PathBuf::new(),
                reason: format!("index {} out of range ({} entries)", index, self.len()),
            };
        };

        if !path.exists() {
            warn!("Image not found at path: {}", path.display());
            return MatchOutcome::Missing {
                index,
                path,
                reason: "file not found".to_string(),
            };
        }

        let encoded = read_image_file(&path).and_then(|img| encode_jpeg_base64(&img, JPEG_QUALITY));

        match encoded {
            Ok(jpeg_base64) => {
                debug!(
                    "Encoded catalog image {} ({} base64 bytes)",
                    path.display(),
                    jpeg_base64.len()
                );
                MatchOutcome::Found(CatalogImage {
                    index,
                    path,
                    distance,
                    jpeg_base64,
                })
            }
            Err(e) => {
                warn!("Could not read image at path {}: {}", path.display(), e);
                MatchOutcome::Missing {
                    index,
                    path,
                    reason: e.to_string(),
                }
            }
        }
    }
}
