// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image similarity retrieval
//!
//! Brute-force k-NN over the catalog embeddings plus the request pipeline
//! that wraps it.

pub mod knn;
pub mod service;

pub use knn::{euclidean_distance, BruteForceIndex, Neighbor, NEIGHBOR_COUNT, SELF_MATCH_OFFSET};
pub use service::{SearchError, SimilarityResult, SimilarityService};
