// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vision processing for similarity search
//!
//! This module provides:
//! - Upload decoding and catalog JPEG re-encoding
//! - ResNet50 input preprocessing
//! - Embedding extraction with global max-pooling
//!
//! Inference runs on CPU.

pub mod extractor;
pub mod image_utils;
pub mod preprocessing;

pub use extractor::{
    l2_normalize, pool_features, ExtractorOptions, FeatureExtractor, OnnxFeatureExtractor,
};
pub use image_utils::{
    decode_image_bytes, detect_format, encode_jpeg_base64, read_image_file, ImageError, ImageInfo,
    JPEG_QUALITY,
};
pub use preprocessing::{preprocess, Normalization, TensorLayout, INPUT_SIZE};
