// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Convolutional feature extractor
//!
//! Runs a frozen ResNet50 backbone exported to ONNX and reduces its spatial
//! feature map to a single embedding with global max-pooling. Models that
//! already end in a pooling layer are used as-is.

use anyhow::{Context, Result};
use image::{DynamicImage, Rgb, RgbImage};
use ndarray::{ArrayViewD, Axis};
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use super::preprocessing::{preprocess, Normalization, TensorLayout, INPUT_SIZE};

/// Produces an embedding for a decoded image
#[cfg_attr(test, mockall::automock)]
pub trait FeatureExtractor: Send + Sync {
    /// Run the backbone and return the pooled, unnormalized embedding
    fn extract(&self, image: &DynamicImage) -> Result<Vec<f32>>;

    /// Length of the embeddings this extractor produces
    fn dimension(&self) -> usize;

    /// Human-readable model name for logs and health output
    fn name(&self) -> String;
}

/// Options for loading the ONNX backbone
#[derive(Debug, Clone, Copy)]
pub struct ExtractorOptions {
    pub layout: TensorLayout,
    pub normalization: Normalization,
    pub intra_threads: usize,
}

impl Default for ExtractorOptions {
    fn default() -> Self {
        Self {
            layout: TensorLayout::Nhwc,
            normalization: Normalization::Caffe,
            intra_threads: 4,
        }
    }
}

/// ResNet50 + global max-pooling running on ONNX Runtime (CPU)
#[derive(Clone)]
pub struct OnnxFeatureExtractor {
    /// ONNX Runtime session, locked for each forward pass
    session: Arc<Mutex<Session>>,
    input_name: String,
    model_name: String,
    options: ExtractorOptions,
    dimension: usize,
}

impl std::fmt::Debug for OnnxFeatureExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxFeatureExtractor")
            .field("input_name", &self.input_name)
            .field("model_name", &self.model_name)
            .field("options", &self.options)
            .field("dimension", &self.dimension)
            .finish_non_exhaustive()
    }
}

impl OnnxFeatureExtractor {
    /// Load the backbone from an ONNX file
    ///
    /// A probe image is pushed through the model once so the embedding
    /// dimension is known before the first request.
    ///
    /// # Errors
    /// Returns error if:
    /// - Model file not found
    /// - ONNX Runtime initialization fails
    /// - The probe inference fails or yields an unsupported output shape
    pub fn new<P: AsRef<Path>>(model_path: P, options: ExtractorOptions) -> Result<Self> {
        let model_path = model_path.as_ref();

        if !model_path.exists() {
            anyhow::bail!("Feature extractor model not found: {}", model_path.display());
        }

        info!("Loading feature extractor from {}", model_path.display());

        let session = Session::builder()
            .context("Failed to create session builder")?
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .context("Failed to set CPU execution provider")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set optimization level")?
            .with_intra_threads(options.intra_threads)
            .context("Failed to set intra threads")?
            .commit_from_file(model_path)
            .context(format!(
                "Failed to load feature extractor from {}",
                model_path.display()
            ))?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "input_1".to_string());

        let model_name = model_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "resnet50".to_string());

        let mut extractor = Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
            model_name,
            options,
            dimension: 0,
        };

        let probe = DynamicImage::ImageRgb8(RgbImage::from_pixel(
            INPUT_SIZE,
            INPUT_SIZE,
            Rgb([128, 128, 128]),
        ));
        extractor.dimension = extractor
            .run(&probe)
            .context("Probe inference failed")?
            .len();

        info!(
            "✅ Feature extractor loaded (input: {}, {:?}, {:?}, {}D embeddings)",
            extractor.input_name, options.layout, options.normalization, extractor.dimension
        );

        Ok(extractor)
    }

    fn run(&self, image: &DynamicImage) -> Result<Vec<f32>> {
        let input = preprocess(image, self.options.layout, self.options.normalization);
        let input_value = Value::from_array(input).context("Failed to create input tensor")?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow::anyhow!("Feature extractor session lock poisoned"))?;

        let outputs = session
            .run(ort::inputs![&self.input_name => input_value])
            .context("Feature extractor inference failed")?;

        let output = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract output tensor")?;

        debug!("Feature extractor output shape: {:?}", output.shape());

        pool_features(output, self.options.layout)
    }
}

impl FeatureExtractor for OnnxFeatureExtractor {
    fn extract(&self, image: &DynamicImage) -> Result<Vec<f32>> {
        self.run(image)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> String {
        self.model_name.clone()
    }
}

/// Reduce a model output to a flat embedding
///
/// - `[1, D]` is returned unchanged
/// - `[1, H, W, D]` (NHWC) or `[1, D, H, W]` (NCHW) is max-pooled over H and W
pub fn pool_features(output: ArrayViewD<'_, f32>, layout: TensorLayout) -> Result<Vec<f32>> {
    let shape = output.shape().to_vec();

    match shape.as_slice() {
        [1, _] => Ok(output.iter().copied().collect()),
        [1, _, _, _] => {
            let batch = output.index_axis(Axis(0), 0);
            let channel_axis = match layout {
                TensorLayout::Nhwc => Axis(2),
                TensorLayout::Nchw => Axis(0),
            };

            Ok(batch
                .axis_iter(channel_axis)
                .map(|channel| channel.iter().copied().fold(f32::NEG_INFINITY, f32::max))
                .collect())
        }
        _ => anyhow::bail!("Unexpected feature extractor output shape: {:?}", shape),
    }
}

/// Scale a vector to unit Euclidean length
///
/// A zero or non-finite norm leaves the vector untouched.
pub fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();

    if norm > 0.0 && norm.is_finite() {
        for value in vector.iter_mut() {
            *value /= norm;
        }
    } else {
        debug!("Skipping normalization of vector with norm {}", norm);
    }
}
