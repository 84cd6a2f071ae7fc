// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod errors;
pub mod find_similar;
pub mod http_server;

pub use errors::{ApiError, ErrorResponse};
pub use find_similar::{find_similar_handler, FindSimilarRequest, FindSimilarResponse, MatchInfo};
pub use http_server::{create_app, start_server, AppState, HealthResponse};
