// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::error;

use crate::similarity::SearchError;
use crate::vision::ImageError;

/// Message returned for every 500, whatever the cause
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// JSON error body: `{"error": "<message>"}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Clone)]
pub enum ApiError {
    NotFound(String),
    InvalidRequest(String),
    ValidationError { field: String, message: String },
    InternalError(String),
}

impl ApiError {
    /// Client-facing body; internal detail never leaves the server
    pub fn to_response(&self) -> ErrorResponse {
        let error = match self {
            ApiError::NotFound(msg) => msg.clone(),
            ApiError::InvalidRequest(msg) => msg.clone(),
            ApiError::ValidationError { message, .. } => message.clone(),
            ApiError::InternalError(_) => INTERNAL_ERROR_MESSAGE.to_string(),
        };

        ErrorResponse { error }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::NotFound(_) => 404,
            ApiError::InvalidRequest(_) | ApiError::ValidationError { .. } => 400,
            ApiError::InternalError(_) => 500,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            ApiError::ValidationError { field, message } => {
                write!(f, "Validation error for {}: {}", field, message)
            }
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<SearchError> for ApiError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::EmptyUpload => ApiError::ValidationError {
                field: "image".to_string(),
                message: "Empty file provided".to_string(),
            },
            SearchError::InvalidImage(ImageError::TooLarge(size, max)) => {
                ApiError::InvalidRequest(format!(
                    "Image too large: {} bytes (max: {} bytes)",
                    size, max
                ))
            }
            SearchError::InvalidImage(_) => {
                ApiError::InvalidRequest("Invalid image format or corrupted file".to_string())
            }
            SearchError::NoMatches => ApiError::NotFound("No similar images found".to_string()),
            SearchError::Inference(msg) | SearchError::Search(msg) => ApiError::InternalError(msg),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::InternalError(detail) = &self {
            error!("Error processing request: {}", detail);
        }

        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_response())).into_response()
    }
}
