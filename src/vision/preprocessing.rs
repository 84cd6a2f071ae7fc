// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image preprocessing for the ResNet50 feature extractor

use clap::ValueEnum;
use image::imageops::FilterType;
use image::DynamicImage;
use ndarray::Array4;
use serde::{Deserialize, Serialize};

/// Side length of the square backbone input
pub const INPUT_SIZE: u32 = 224;

/// Per-channel means subtracted in caffe mode, in BGR order
pub const CAFFE_MEAN_BGR: [f32; 3] = [103.939, 116.779, 123.68];

/// ImageNet normalization mean values (RGB)
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];

/// ImageNet normalization std values (RGB)
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Memory layout of the input tensor expected by the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TensorLayout {
    /// `[1, H, W, 3]`, the layout of Keras exports
    #[default]
    Nhwc,
    /// `[1, 3, H, W]`, the layout of PyTorch exports
    Nchw,
}

/// Pixel normalization applied before inference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Normalization {
    /// Channels flipped to BGR and mean-centered, values stay in 0..255 scale
    #[default]
    Caffe,
    /// `(pixel / 255 - mean) / std` per RGB channel
    Imagenet,
}

impl Normalization {
    /// Normalize one pixel, returning values in model channel order
    fn apply(self, pixel: [u8; 3]) -> [f32; 3] {
        match self {
            Normalization::Caffe => {
                // channel 0 of the output is blue
                let bgr = [pixel[2], pixel[1], pixel[0]];
                [
                    bgr[0] as f32 - CAFFE_MEAN_BGR[0],
                    bgr[1] as f32 - CAFFE_MEAN_BGR[1],
                    bgr[2] as f32 - CAFFE_MEAN_BGR[2],
                ]
            }
            Normalization::Imagenet => {
                let mut out = [0.0f32; 3];
                for c in 0..3 {
                    out[c] = (pixel[c] as f32 / 255.0 - IMAGENET_MEAN[c]) / IMAGENET_STD[c];
                }
                out
            }
        }
    }
}

/// Resize to the backbone input size
///
/// Stretches to `INPUT_SIZE` x `INPUT_SIZE` with bilinear filtering, so the
/// aspect ratio is not preserved.
pub fn resize_for_backbone(image: &DynamicImage) -> DynamicImage {
    image.resize_exact(INPUT_SIZE, INPUT_SIZE, FilterType::Triangle)
}

/// Preprocess an image into a single-image batch tensor
///
/// Steps:
/// 1. Resize to 224x224
/// 2. Convert to RGB (alpha dropped, grayscale expanded)
/// 3. Apply `normalization`
/// 4. Lay out as `[1, H, W, 3]` or `[1, 3, H, W]`
pub fn preprocess(
    image: &DynamicImage,
    layout: TensorLayout,
    normalization: Normalization,
) -> Array4<f32> {
    let rgb = resize_for_backbone(image).to_rgb8();
    let size = INPUT_SIZE as usize;

    let mut tensor = match layout {
        TensorLayout::Nhwc => Array4::zeros((1, size, size, 3)),
        TensorLayout::Nchw => Array4::zeros((1, 3, size, size)),
    };

    for (x, y, pixel) in rgb.enumerate_pixels() {
        let values = normalization.apply(pixel.0);
        let (x, y) = (x as usize, y as usize);
        for (c, value) in values.into_iter().enumerate() {
            match layout {
                TensorLayout::Nhwc => tensor[[0, y, x, c]] = value,
                TensorLayout::Nchw => tensor[[0, c, y, x]] = value,
            }
        }
    }

    tensor
}
