// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Catalog artifact loading
//!
//! The embedding matrix is a 2D `.npy` array (`f32` or `f64`), the filename
//! index a JSON array of paths. Either can live on local disk or in a
//! Hugging Face Hub model repository, in which case it is downloaded into
//! the local hub cache first.

use ndarray::Array2;
use ndarray_npy::ReadNpyExt;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::errors::CatalogError;
use super::Catalog;

/// Where a catalog artifact comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactSource {
    /// A file on local disk
    Local(PathBuf),
    /// A file inside a Hugging Face Hub model repository
    Hub { repo: String, file: String },
}

impl ArtifactSource {
    /// Resolve to a local path, downloading from the hub when needed
    pub async fn fetch(&self) -> Result<PathBuf, CatalogError> {
        match self {
            ArtifactSource::Local(path) => {
                if !path.exists() {
                    return Err(CatalogError::ArtifactNotFound(path.display().to_string()));
                }
                Ok(path.clone())
            }
            ArtifactSource::Hub { repo, file } => {
                info!("Downloading {} from Hugging Face repo {}", file, repo);

                let download_error = |reason: String| CatalogError::DownloadFailed {
                    repo: repo.clone(),
                    file: file.clone(),
                    reason,
                };

                let api = hf_hub::api::tokio::Api::new().map_err(|e| download_error(e.to_string()))?;
                let path = api
                    .model(repo.clone())
                    .get(file)
                    .await
                    .map_err(|e| download_error(e.to_string()))?;

                debug!("{} cached at {}", file, path.display());
                Ok(path)
            }
        }
    }
}

/// Loads and validates a `Catalog` from its two artifacts
#[derive(Debug, Clone)]
pub struct CatalogLoader {
    pub embeddings: ArtifactSource,
    pub filenames: ArtifactSource,
    pub image_root: Option<PathBuf>,
}

impl CatalogLoader {
    pub fn new(embeddings: ArtifactSource, filenames: ArtifactSource) -> Self {
        Self {
            embeddings,
            filenames,
            image_root: None,
        }
    }

    /// Resolve relative catalog filenames against `root`
    pub fn with_image_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.image_root = Some(root.into());
        self
    }

    /// Fetch both artifacts and build the catalog
    pub async fn load(&self) -> Result<Catalog, CatalogError> {
        let embeddings_path = self.embeddings.fetch().await?;
        let filenames_path = self.filenames.fetch().await?;

        let embeddings = read_embeddings(&embeddings_path)?;
        let filenames = read_filenames(&filenames_path)?;

        info!(
            "Loaded catalog: {} embeddings ({}D), {} filenames",
            embeddings.nrows(),
            embeddings.ncols(),
            filenames.len()
        );

        Catalog::new(embeddings, filenames, self.image_root.clone())
    }
}

fn open(path: &Path) -> Result<File, CatalogError> {
    File::open(path).map_err(|source| CatalogError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Read a 2D embedding matrix from an `.npy` file
///
/// `f64` matrices (the numpy default) are narrowed to `f32`.
pub fn read_embeddings(path: &Path) -> Result<Array2<f32>, CatalogError> {
    match Array2::<f32>::read_npy(open(path)?) {
        Ok(matrix) => Ok(matrix),
        Err(f32_err) => {
            debug!("{} is not an f32 matrix ({}), trying f64", path.display(), f32_err);
            Array2::<f64>::read_npy(open(path)?)
                .map(|matrix| matrix.mapv(|v| v as f32))
                .map_err(|_| CatalogError::InvalidEmbeddings {
                    path: path.display().to_string(),
                    reason: f32_err.to_string(),
                })
        }
    }
}

/// Read the filename index from a JSON array of strings
pub fn read_filenames(path: &Path) -> Result<Vec<PathBuf>, CatalogError> {
    let names: Vec<String> = serde_json::from_reader(BufReader::new(open(path)?)).map_err(|e| {
        CatalogError::InvalidFilenames {
            path: path.display().to_string(),
            reason: e.to_string(),
        }
    })?;

    Ok(names.into_iter().map(PathBuf::from).collect())
}
