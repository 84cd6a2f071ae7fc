// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Find-similar request parsing and validation

use axum::http::StatusCode;
use axum_extra::extract::multipart::{Multipart, MultipartError};
use bytes::Bytes;
use tracing::debug;

use crate::api::errors::ApiError;

/// Multipart field carrying the uploaded photo
pub const IMAGE_FIELD: &str = "image";

/// Upload extracted from a `multipart/form-data` body
#[derive(Debug, Clone, Default)]
pub struct FindSimilarRequest {
    /// Raw bytes of the `image` field, if present
    pub image: Option<Bytes>,
    /// Client-side filename, for logging only
    pub file_name: Option<String>,
}

impl FindSimilarRequest {
    /// Read the `image` field from a multipart body
    ///
    /// Other fields are drained and ignored. When `image` appears more than
    /// once the first occurrence wins.
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut request = Self::default();

        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let name = field.name().unwrap_or_default().to_string();

            if name != IMAGE_FIELD || request.image.is_some() {
                debug!("Ignoring multipart field '{}'", name);
                continue;
            }

            request.file_name = field.file_name().map(str::to_string);
            request.image = Some(field.bytes().await.map_err(multipart_error)?);
        }

        Ok(request)
    }

    /// Validate the request, returning the image bytes
    pub fn validate(self) -> Result<Bytes, ApiError> {
        match self.image {
            None => Err(ApiError::ValidationError {
                field: IMAGE_FIELD.to_string(),
                message: "No image provided".to_string(),
            }),
            Some(bytes) if bytes.is_empty() => Err(ApiError::ValidationError {
                field: IMAGE_FIELD.to_string(),
                message: "Empty file provided".to_string(),
            }),
            Some(bytes) => Ok(bytes),
        }
    }
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::InvalidRequest("Image too large: upload exceeds the maximum request size".to_string())
    } else {
        ApiError::InvalidRequest(format!("Malformed multipart body: {}", err.body_text()))
    }
}
