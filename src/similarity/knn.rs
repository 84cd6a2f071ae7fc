// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Brute-force Euclidean k-nearest-neighbor search
//!
//! Every query is compared against every row of the embedding matrix. There
//! is no index structure to build or maintain.

use anyhow::{anyhow, Result};
use ndarray::{ArrayView1, ArrayView2};
use serde::Serialize;
use std::cmp::Ordering;

/// Neighbors requested per query
pub const NEIGHBOR_COUNT: usize = 6;

/// Leading neighbors dropped from every result
///
/// Assumes the query is itself a catalog member, so the first hit is the
/// query's own row. When it is not, the genuine best match is dropped.
pub const SELF_MATCH_OFFSET: usize = 1;

/// One search hit
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Neighbor {
    /// Row in the embedding matrix
    pub index: usize,
    /// Euclidean distance to the query
    pub distance: f32,
}

/// Exhaustive search over a borrowed embedding matrix
#[derive(Debug, Clone, Copy)]
pub struct BruteForceIndex<'a> {
    embeddings: ArrayView2<'a, f32>,
}

impl<'a> BruteForceIndex<'a> {
    pub fn new(embeddings: ArrayView2<'a, f32>) -> Self {
        Self { embeddings }
    }

    pub fn dimension(&self) -> usize {
        self.embeddings.ncols()
    }

    /// Return the `k` closest rows in ascending distance order
    ///
    /// Ties are broken by ascending row index. `k` larger than the matrix is
    /// clamped to the number of rows.
    pub fn kneighbors(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        if query.len() != self.dimension() {
            return Err(anyhow!(
                "Invalid query dimensions: expected {}, got {}",
                self.dimension(),
                query.len()
            ));
        }

        let query = ArrayView1::from(query);
        let mut neighbors: Vec<Neighbor> = self
            .embeddings
            .outer_iter()
            .enumerate()
            .map(|(index, row)| Neighbor {
                index,
                distance: euclidean_distance(query, row),
            })
            .collect();

        let k = k.min(neighbors.len());
        if k == 0 {
            return Ok(Vec::new());
        }

        if k < neighbors.len() {
            neighbors.select_nth_unstable_by(k - 1, compare_neighbors);
            neighbors.truncate(k);
        }
        neighbors.sort_by(compare_neighbors);

        Ok(neighbors)
    }

    /// Similar images for a query: `NEIGHBOR_COUNT` neighbors with the first
    /// `SELF_MATCH_OFFSET` dropped
    pub fn similar(&self, query: &[f32]) -> Result<Vec<Neighbor>> {
        let neighbors = self.kneighbors(query, NEIGHBOR_COUNT)?;
        Ok(neighbors.into_iter().skip(SELF_MATCH_OFFSET).collect())
    }
}

fn compare_neighbors(a: &Neighbor, b: &Neighbor) -> Ordering {
    a.distance
        .total_cmp(&b.distance)
        .then_with(|| a.index.cmp(&b.index))
}

/// Euclidean (L2) distance between two equal-length vectors
pub fn euclidean_distance(a: ArrayView1<'_, f32>, b: ArrayView1<'_, f32>) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum::<f32>()
        .sqrt()
}
