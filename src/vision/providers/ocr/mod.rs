// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Two-stage ONNX text provider (PaddleOCR model layout)
//!
//! Components:
//! - `detection` - probability map to text regions
//! - `recognition` - CTC decoding of cropped regions
//! - `preprocessing` - tensor preparation for both models
//!
//! Runs on CPU only.

pub mod detection;
pub mod preprocessing;
pub mod recognition;

use anyhow::Result;
use std::path::Path;
use tracing::{debug, info};

use crate::vision::geometry::NormalizedRect;
use crate::vision::image_utils::DecodedImage;
use crate::vision::observations::TextObservation;
use crate::vision::providers::{Detector, ProviderError};

pub use detection::{TextBox, TextDetectionModel};
pub use recognition::{CharDictionary, RecognizedText, TextRecognitionModel};

pub const DET_MODEL_FILE: &str = "det_model.onnx";
pub const REC_MODEL_FILE: &str = "rec_model.onnx";
pub const DICT_FILE: &str = "ppocr_keys_v1.txt";

/// Text recognizer producing bottom-left normalized observations
#[derive(Debug, Clone)]
pub struct OnnxTextDetector {
    detection: TextDetectionModel,
    recognition: TextRecognitionModel,
}

impl OnnxTextDetector {
    /// Load both stages from a model directory
    ///
    /// Expected files:
    /// - det_model.onnx
    /// - rec_model.onnx
    /// - ppocr_keys_v1.txt
    pub fn load(model_dir: &Path) -> Result<Self> {
        let detection = TextDetectionModel::load(&model_dir.join(DET_MODEL_FILE))?;
        let recognition = TextRecognitionModel::load(
            &model_dir.join(REC_MODEL_FILE),
            &model_dir.join(DICT_FILE),
        )?;
        info!("✅ Text models loaded from {} (CPU-only)", model_dir.display());
        Ok(Self {
            detection,
            recognition,
        })
    }
}

impl Detector<Vec<TextObservation>> for OnnxTextDetector {
    fn name(&self) -> &'static str {
        "onnx-text"
    }

    fn detect(&self, image: &DecodedImage) -> Result<Vec<TextObservation>, ProviderError> {
        let pixels = &image.pixels;
        let boxes = self.detection.detect(pixels)?;

        let mut observations = Vec::with_capacity(boxes.len());
        for text_box in boxes {
            let crop = pixels.crop_imm(
                text_box.x.floor() as u32,
                text_box.y.floor() as u32,
                text_box.width.ceil().max(1.0) as u32,
                text_box.height.ceil().max(1.0) as u32,
            );

            let Some(recognized) = self.recognition.recognize(&crop)? else {
                debug!("No text read in region at ({}, {})", text_box.x, text_box.y);
                continue;
            };
            observations.push(to_observation(&text_box, recognized, image));
        }

        Ok(observations)
    }
}

fn to_observation(
    text_box: &TextBox,
    recognized: RecognizedText,
    image: &DecodedImage,
) -> TextObservation {
    let bounding_box = NormalizedRect::from_pixel_top_left(
        text_box.x as f64,
        text_box.y as f64,
        text_box.width as f64,
        text_box.height as f64,
        image.width(),
        image.height(),
    );
    // combine region and character confidence
    let confidence = (recognized.confidence * text_box.confidence.min(1.0)).sqrt();
    TextObservation::new(recognized.text, confidence, bounding_box)
        .with_alternates(recognized.alternate.into_iter().collect())
}
