// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Server configuration
//!
//! Every option can be given as a flag or an environment variable; a `.env`
//! file in the working directory is loaded first.

use anyhow::{anyhow, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::catalog::{ArtifactSource, CatalogLoader};
use crate::vision::{ExtractorOptions, Normalization, TensorLayout};

/// Default upload cap (10MB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Image similarity search server
#[derive(Parser, Debug, Clone)]
#[command(name = "image-similarity-node")]
#[command(version)]
#[command(about = "Serve visually similar catalog images for an uploaded photo", long_about = None)]
pub struct ServerConfig {
    /// Address to bind the HTTP server to
    #[arg(long, env = "LISTEN_ADDR", default_value = "127.0.0.1:5000")]
    pub listen_addr: String,

    /// ONNX export of the ResNet50 feature extractor
    #[arg(long, env = "MODEL_PATH", default_value = "./models/resnet50-gmp.onnx")]
    pub model_path: PathBuf,

    /// Precomputed embedding matrix (.npy)
    #[arg(long, env = "EMBEDDINGS_PATH", default_value = "./embeddings.npy")]
    pub embeddings_path: PathBuf,

    /// Filename index (JSON array), row-aligned with the embeddings
    #[arg(long, env = "FILENAMES_PATH", default_value = "./filenames.json")]
    pub filenames_path: PathBuf,

    /// Hugging Face model repo to download catalog artifacts from
    #[arg(long, env = "HF_REPO")]
    pub hf_repo: Option<String>,

    /// Embedding matrix file name inside the hub repo
    #[arg(long, env = "HF_EMBEDDINGS_FILE", default_value = "embeddings.npy")]
    pub hf_embeddings_file: String,

    /// Filename index inside the hub repo; local `--filenames-path` when unset
    #[arg(long, env = "HF_FILENAMES_FILE")]
    pub hf_filenames_file: Option<String>,

    /// Directory that relative catalog filenames are resolved against
    #[arg(long, env = "IMAGE_ROOT")]
    pub image_root: Option<PathBuf>,

    /// Input tensor layout of the ONNX model
    #[arg(long, env = "INPUT_LAYOUT", value_enum, default_value_t = TensorLayout::Nhwc)]
    pub input_layout: TensorLayout,

    /// Pixel normalization expected by the model
    #[arg(long, env = "NORMALIZATION", value_enum, default_value_t = Normalization::Caffe)]
    pub normalization: Normalization,

    /// ONNX Runtime intra-op threads
    #[arg(long, env = "INTRA_THREADS", default_value_t = 4)]
    pub intra_threads: usize,

    /// Largest accepted image upload in bytes
    #[arg(long, env = "MAX_UPLOAD_BYTES", default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
    pub max_upload_bytes: usize,

    /// Include per-match distances in responses
    #[arg(long, env = "EXPOSE_DISTANCES", default_value_t = false)]
    pub expose_distances: bool,
}

impl ServerConfig {
    /// Check option values that clap cannot
    pub fn validate(&self) -> Result<()> {
        self.socket_addr()?;

        if self.intra_threads == 0 {
            return Err(anyhow!("intra_threads must be at least 1"));
        }

        if self.max_upload_bytes == 0 {
            return Err(anyhow!("max_upload_bytes must be greater than 0"));
        }

        if let Some(repo) = &self.hf_repo {
            if repo.trim().is_empty() {
                return Err(anyhow!("hf_repo must not be empty when set"));
            }
        }

        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.listen_addr
            .parse()
            .map_err(|e| anyhow!("Invalid listen address '{}': {}", self.listen_addr, e))
    }

    pub fn extractor_options(&self) -> ExtractorOptions {
        ExtractorOptions {
            layout: self.input_layout,
            normalization: self.normalization,
            intra_threads: self.intra_threads,
        }
    }

    /// Catalog loader for the configured artifact locations
    pub fn catalog_loader(&self) -> CatalogLoader {
        let embeddings = match &self.hf_repo {
            Some(repo) => ArtifactSource::Hub {
                repo: repo.clone(),
                file: self.hf_embeddings_file.clone(),
            },
            None => ArtifactSource::Local(self.embeddings_path.clone()),
        };

        let filenames = match (&self.hf_repo, &self.hf_filenames_file) {
            (Some(repo), Some(file)) => ArtifactSource::Hub {
                repo: repo.clone(),
                file: file.clone(),
            },
            _ => ArtifactSource::Local(self.filenames_path.clone()),
        };

        let loader = CatalogLoader::new(embeddings, filenames);
        match &self.image_root {
            Some(root) => loader.with_image_root(root.clone()),
            None => loader,
        }
    }
}
