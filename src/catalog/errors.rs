// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Error types for catalog loading
//!
//! Every variant is fatal at startup: the service cannot answer queries
//! without a complete, aligned catalog.

use thiserror::Error;

/// Errors that can occur while loading the embedding matrix and filename index
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Artifact file does not exist
    #[error("Catalog artifact not found: {0}")]
    ArtifactNotFound(String),

    /// Failed to fetch an artifact from the Hugging Face Hub
    #[error("Failed to download {file} from {repo}: {reason}")]
    DownloadFailed {
        repo: String,
        file: String,
        reason: String,
    },

    /// I/O failure while opening an artifact
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The embedding matrix is not a readable 2D `.npy` array
    #[error("Invalid embedding matrix {path}: {reason}")]
    InvalidEmbeddings { path: String, reason: String },

    /// The filename index is not a JSON array of strings
    #[error("Invalid filename index {path}: {reason}")]
    InvalidFilenames { path: String, reason: String },

    /// Matrix rows and filename entries are not index-aligned
    #[error("Catalog misaligned: {embeddings} embeddings but {filenames} filenames")]
    LengthMismatch { embeddings: usize, filenames: usize },

    /// No catalog entries
    #[error("Catalog is empty")]
    Empty,

    /// NaN or infinite value in the embedding matrix
    #[error("Embedding row {row} contains a non-finite value")]
    NonFiniteEmbedding { row: usize },

    /// Extractor output length differs from the catalog's
    #[error("Dimension mismatch: catalog has {catalog}D embeddings, extractor produces {extractor}D")]
    DimensionMismatch { catalog: usize, extractor: usize },
}
