// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Find-similar API endpoint module
//!
//! Provides POST /find-similar for retrieving catalog images that look like
//! an uploaded photo.

pub mod handler;
pub mod request;
pub mod response;

pub use handler::find_similar_handler;
pub use request::{FindSimilarRequest, IMAGE_FIELD};
pub use response::{FindSimilarResponse, MatchInfo};
