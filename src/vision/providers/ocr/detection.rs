// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Text region detection
//!
//! The detection model emits a per-pixel text probability map. Pixels above
//! the threshold are grouped into 4-connected regions; each region becomes a
//! box in model input space, slightly enlarged because the map marks the
//! shrunk core of a text line.

use anyhow::Result;
use ndarray::{ArrayD, Ix2};
use std::path::Path;
use tracing::{debug, info};

use super::preprocessing::{preprocess_for_detection, PreprocessInfo, DET_INPUT_SIZE};
use crate::vision::providers::components::Mask;
use crate::vision::providers::session::OnnxSession;
use crate::vision::providers::ProviderError;
use image::DynamicImage;

/// Default probability threshold for text pixels
pub const DEFAULT_DET_THRESHOLD: f32 = 0.3;

/// Regions smaller than this many probability-map pixels are noise
pub const MIN_REGION_PIXELS: usize = 10;

/// Each side grows by this fraction of the region height
pub const UNCLIP_RATIO: f32 = 0.3;

/// A detected text region in source pixel coordinates (top-left origin)
#[derive(Debug, Clone, PartialEq)]
pub struct TextBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// Mean probability over the region
    pub confidence: f32,
}

impl TextBox {
    pub fn is_valid(&self) -> bool {
        self.width >= 1.0 && self.height >= 1.0 && self.confidence > 0.0
    }

    /// Clip to the source image bounds
    pub fn clipped(&self, image_width: u32, image_height: u32) -> Option<TextBox> {
        let left = self.x.max(0.0);
        let top = self.y.max(0.0);
        let right = (self.x + self.width).min(image_width as f32);
        let bottom = (self.y + self.height).min(image_height as f32);
        let clipped = TextBox {
            x: left,
            y: top,
            width: right - left,
            height: bottom - top,
            confidence: self.confidence,
        };
        clipped.is_valid().then_some(clipped)
    }
}

/// Text detection stage
#[derive(Debug, Clone)]
pub struct TextDetectionModel {
    session: OnnxSession,
    threshold: f32,
}

impl TextDetectionModel {
    /// Load `det_model.onnx`
    pub fn load(model_path: &Path) -> Result<Self> {
        info!("Loading text detection model from {}", model_path.display());
        let session = OnnxSession::load(model_path, "x")?;
        Ok(Self {
            session,
            threshold: DEFAULT_DET_THRESHOLD,
        })
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold.clamp(0.0, 1.0);
        self
    }

    /// Find text regions in the source image
    pub fn detect(&self, image: &DynamicImage) -> Result<Vec<TextBox>, ProviderError> {
        let (tensor, info) = preprocess_for_detection(image);
        let output = self.session.run(tensor)?;
        let boxes = regions_from_probability_map(output, &info, self.threshold)?;
        debug!("Detected {} text regions", boxes.len());
        Ok(boxes)
    }
}

/// Turn a `[1, 1, H, W]` or `[1, H, W]` probability map into source-space boxes
pub fn regions_from_probability_map(
    output: ArrayD<f32>,
    info: &PreprocessInfo,
    threshold: f32,
) -> Result<Vec<TextBox>, ProviderError> {
    let shape = output.shape().to_vec();
    let map = match shape.len() {
        4 => output.index_axis_move(ndarray::Axis(0), 0).index_axis_move(ndarray::Axis(0), 0),
        3 => output.index_axis_move(ndarray::Axis(0), 0),
        _ => {
            return Err(ProviderError::DetectionFailed(format!(
                "unexpected detection output shape {:?}",
                shape
            )))
        }
    };
    let map = map
        .into_dimensionality::<Ix2>()
        .map_err(|e| ProviderError::DetectionFailed(e.to_string()))?;

    let (map_h, map_w) = map.dim();
    if map_h == 0 || map_w == 0 {
        return Err(ProviderError::DetectionFailed(format!(
            "empty detection map {:?}",
            shape
        )));
    }
    // the map may be downsampled relative to the model input
    let scale_x = DET_INPUT_SIZE as f32 / map_w as f32;
    let scale_y = DET_INPUT_SIZE as f32 / map_h as f32;

    let mask = Mask::from_fn(map_w, map_h, |x, y| map[[y, x]] >= threshold);
    let mut boxes: Vec<TextBox> = mask
        .components()
        .into_iter()
        .filter(|c| c.area() >= MIN_REGION_PIXELS)
        .filter_map(|c| {
            let sum: f32 = c.pixels.iter().map(|&(x, y)| map[[y, x]]).sum();
            let confidence = sum / c.area() as f32;

            let pad = c.height() as f32 * UNCLIP_RATIO;
            let x0 = (c.min_x as f32 - pad) * scale_x;
            let y0 = (c.min_y as f32 - pad) * scale_y;
            let x1 = (c.max_x as f32 + 1.0 + pad) * scale_x;
            let y1 = (c.max_y as f32 + 1.0 + pad) * scale_y;

            let (left, top) = info.map_to_original(x0, y0);
            let (right, bottom) = info.map_to_original(x1, y1);
            TextBox {
                x: left,
                y: top,
                width: right - left,
                height: bottom - top,
                confidence,
            }
            .clipped(info.original_width, info.original_height)
        })
        .collect();

    boxes.sort_by(|a, b| a.y.total_cmp(&b.y).then(a.x.total_cmp(&b.x)));
    Ok(boxes)
}
