// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Find-similar endpoint handler

use axum::{extract::State, Json};
use axum_extra::extract::multipart::{Multipart, MultipartRejection};
use tracing::{debug, info, warn};

use super::request::FindSimilarRequest;
use super::response::FindSimilarResponse;
use crate::api::errors::ApiError;
use crate::api::http_server::AppState;

/// POST /find-similar - Find catalog images similar to an uploaded photo
///
/// # Request
/// `multipart/form-data` with an `image` file field.
///
/// # Response
/// - `similar_images`: Base64-encoded JPEGs (quality 100), closest first
/// - `matches`: Index, filename and distance per image (only when
///   distance exposure is enabled)
///
/// # Errors
/// - 400 Bad Request: missing, empty, oversized or undecodable `image`, malformed body
/// - 404 Not Found: none of the matched catalog files could be read
/// - 500 Internal Server Error: inference or search failed
pub async fn find_similar_handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<FindSimilarResponse>, ApiError> {
    let multipart = multipart.map_err(|rejection| {
        warn!("Rejected find-similar body: {}", rejection);
        ApiError::InvalidRequest("Expected a multipart/form-data body".to_string())
    })?;

    // 1. Extract and validate the upload
    let request = FindSimilarRequest::from_multipart(multipart).await?;
    let file_name = request.file_name.clone();
    let bytes = request.validate().map_err(|e| {
        warn!("Find-similar validation failed: {}", e);
        e
    })?;

    debug!(
        "Find-similar request: {} bytes ({})",
        bytes.len(),
        file_name.as_deref().unwrap_or("unnamed")
    );

    // 2. Run the pipeline off the async executor
    let service = state.service.clone();
    let result = tokio::task::spawn_blocking(move || service.find_similar(&bytes))
        .await
        .map_err(|e| ApiError::InternalError(format!("search task failed: {}", e)))?
        .map_err(|e| {
            let err = ApiError::from(e);
            if err.status_code() < 500 {
                warn!("Find-similar request rejected: {}", err);
            }
            err
        })?;

    info!(
        "Returning {} similar images ({} skipped) in {}ms",
        result.images.len(),
        result.skipped,
        result.processing_time_ms
    );

    // 3. Build response
    Ok(Json(FindSimilarResponse::new(
        result.images,
        state.expose_distances,
    )))
}
