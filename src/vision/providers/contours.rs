// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! CPU contour statistics
//!
//! Binarizes the grayscale image with Otsu's threshold, treats the less
//! common polarity as foreground, and counts 4-connected foreground regions
//! and their boundary pixels.

use image::imageops::FilterType;
use image::GrayImage;

use super::components::Mask;
use super::{Detector, ProviderError};
use crate::vision::image_utils::DecodedImage;
use crate::vision::observations::ContourSummary;

/// Longest side analyzed; larger images are downscaled first
pub const MAX_CONTOUR_DIMENSION: u32 = 512;

/// Regions below this many pixels are ignored
pub const MIN_CONTOUR_AREA: usize = 8;

#[derive(Debug, Clone)]
pub struct ContourDetector {
    max_dimension: u32,
    min_area: usize,
}

impl Default for ContourDetector {
    fn default() -> Self {
        Self {
            max_dimension: MAX_CONTOUR_DIMENSION,
            min_area: MIN_CONTOUR_AREA,
        }
    }
}

impl ContourDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_min_area(mut self, min_area: usize) -> Self {
        self.min_area = min_area.max(1);
        self
    }

    pub fn with_max_dimension(mut self, max_dimension: u32) -> Self {
        self.max_dimension = max_dimension.max(1);
        self
    }

    fn grayscale(&self, image: &DecodedImage) -> GrayImage {
        let pixels = &image.pixels;
        if pixels.width().max(pixels.height()) > self.max_dimension {
            pixels
                .resize(self.max_dimension, self.max_dimension, FilterType::Triangle)
                .to_luma8()
        } else {
            pixels.to_luma8()
        }
    }
}

impl Detector<ContourSummary> for ContourDetector {
    fn name(&self) -> &'static str {
        "cpu-contours"
    }

    fn detect(&self, image: &DecodedImage) -> Result<ContourSummary, ProviderError> {
        let gray = self.grayscale(image);
        let threshold = otsu_threshold(&gray);

        let dark = gray.pixels().filter(|p| p[0] <= threshold).count();
        let light = (gray.width() * gray.height()) as usize - dark;
        let foreground_is_dark = dark <= light;

        let mask = Mask::from_fn(gray.width() as usize, gray.height() as usize, |x, y| {
            let dark_pixel = gray.get_pixel(x as u32, y as u32)[0] <= threshold;
            dark_pixel == foreground_is_dark
        });

        let mut summary = ContourSummary::default();
        for component in mask.components() {
            if component.area() < self.min_area {
                continue;
            }
            summary.contour_count += 1;
            summary.point_count += component
                .pixels
                .iter()
                .filter(|&&(x, y)| mask.is_boundary(x, y))
                .count();
        }
        Ok(summary)
    }
}

/// Otsu's method: the level maximizing between-class variance
///
/// Pixels at or below the returned level form the dark class.
pub fn otsu_threshold(gray: &GrayImage) -> u8 {
    let mut histogram = [0u64; 256];
    for p in gray.pixels() {
        histogram[p[0] as usize] += 1;
    }

    let total: u64 = histogram.iter().sum();
    let weighted_sum: f64 = histogram
        .iter()
        .enumerate()
        .map(|(level, &count)| level as f64 * count as f64)
        .sum();

    let mut best_level = 0u8;
    let mut best_variance = 0.0f64;
    let mut dark_weight = 0u64;
    let mut dark_sum = 0.0f64;

    for (level, &count) in histogram.iter().enumerate() {
        dark_weight += count;
        dark_sum += level as f64 * count as f64;
        let light_weight = total - dark_weight;
        if dark_weight == 0 || light_weight == 0 {
            continue;
        }

        let dark_mean = dark_sum / dark_weight as f64;
        let light_mean = (weighted_sum - dark_sum) / light_weight as f64;
        let variance =
            dark_weight as f64 * light_weight as f64 * (dark_mean - light_mean).powi(2);
        if variance > best_variance {
            best_variance = variance;
            best_level = level as u8;
        }
    }

    best_level
}
