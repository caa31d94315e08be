// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! CPU luminance feature print
//!
//! A 16x16 grayscale thumbnail, zero-mean and unit-norm. Only the shape of
//! the vector is reported in analysis results.

use image::imageops::FilterType;
use image::DynamicImage;

use super::{Detector, ProviderError};
use crate::vision::image_utils::DecodedImage;
use crate::vision::observations::FeaturePrintSummary;

/// Thumbnail side length
pub const FEATURE_PRINT_SIDE: u32 = 16;

pub const FEATURE_PRINT_ELEMENT_TYPE: &str = "float";

#[derive(Debug, Clone, Default)]
pub struct FeaturePrintDetector;

impl FeaturePrintDetector {
    pub fn new() -> Self {
        Self
    }
}

impl Detector<FeaturePrintSummary> for FeaturePrintDetector {
    fn name(&self) -> &'static str {
        "cpu-feature-print"
    }

    fn detect(&self, image: &DecodedImage) -> Result<FeaturePrintSummary, ProviderError> {
        let vector = descriptor(&image.pixels);
        Ok(FeaturePrintSummary {
            element_count: vector.len(),
            element_type: FEATURE_PRINT_ELEMENT_TYPE.to_string(),
        })
    }
}

/// Compute the normalized luminance descriptor
pub fn descriptor(image: &DynamicImage) -> Vec<f32> {
    let thumb = image
        .resize_exact(FEATURE_PRINT_SIDE, FEATURE_PRINT_SIDE, FilterType::Triangle)
        .to_luma8();

    let mut values: Vec<f32> = thumb.pixels().map(|p| p[0] as f32 / 255.0).collect();
    let mean = values.iter().sum::<f32>() / values.len() as f32;
    values.iter_mut().for_each(|v| *v -= mean);

    let norm = values.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        values.iter_mut().for_each(|v| *v /= norm);
    }
    values
}
