// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Whole-image classification with an ImageNet-style ONNX model

use anyhow::{Context, Result};
use image::imageops::FilterType;
use ndarray::ArrayD;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use super::ocr::preprocessing::to_normalized_tensor;
use super::session::OnnxSession;
use super::{Detector, ProviderError};
use crate::vision::image_utils::DecodedImage;
use crate::vision::observations::ClassificationObservation;

/// Square model input size
pub const CLASSIFIER_INPUT_SIZE: u32 = 224;

/// Default number of labels returned
pub const DEFAULT_TOP_K: usize = 10;

pub const MODEL_FILE: &str = "model.onnx";
pub const LABELS_FILE: &str = "labels.txt";

/// Classifier location and output size
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    pub model_dir: PathBuf,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

impl ClassifierConfig {
    pub fn new(model_dir: impl Into<PathBuf>) -> Self {
        Self {
            model_dir: model_dir.into(),
            top_k: DEFAULT_TOP_K,
        }
    }
}

/// Classification provider
#[derive(Debug, Clone)]
pub struct OnnxClassifier {
    session: OnnxSession,
    labels: Vec<String>,
    top_k: usize,
}

impl OnnxClassifier {
    /// Load `model.onnx` and `labels.txt` from the configured directory
    pub fn load(config: &ClassifierConfig) -> Result<Self> {
        let labels_path = config.model_dir.join(LABELS_FILE);
        let labels = load_labels(&labels_path)?;
        let session = OnnxSession::load(&config.model_dir.join(MODEL_FILE), "input")?;

        info!(
            "✅ Classifier loaded from {} ({} labels, top {})",
            config.model_dir.display(),
            labels.len(),
            config.top_k
        );

        Ok(Self {
            session,
            labels,
            top_k: config.top_k.max(1),
        })
    }

    pub fn label_count(&self) -> usize {
        self.labels.len()
    }
}

impl Detector<Vec<ClassificationObservation>> for OnnxClassifier {
    fn name(&self) -> &'static str {
        "onnx-classifier"
    }

    fn detect(&self, image: &DecodedImage) -> Result<Vec<ClassificationObservation>, ProviderError> {
        let resized = image.pixels.resize_exact(
            CLASSIFIER_INPUT_SIZE,
            CLASSIFIER_INPUT_SIZE,
            FilterType::Triangle,
        );
        let output = self.session.run(to_normalized_tensor(&resized.to_rgb8()))?;
        let scores = flatten_scores(output)?;
        Ok(top_labels(&softmax(&scores), &self.labels, self.top_k))
    }
}

/// One label per non-empty line
pub fn load_labels(path: &Path) -> Result<Vec<String>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Labels not found: {}", path.display()))?;
    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

fn flatten_scores(output: ArrayD<f32>) -> Result<Vec<f32>, ProviderError> {
    let non_unit = output.shape().iter().filter(|&&d| d > 1).count();
    if non_unit > 1 {
        return Err(ProviderError::DetectionFailed(format!(
            "unexpected classifier output shape {:?}",
            output.shape()
        )));
    }
    Ok(output.iter().copied().collect())
}

/// Numerically stable softmax
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&v| (v - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    if sum <= 0.0 || !sum.is_finite() {
        return vec![0.0; logits.len()];
    }
    exps.into_iter().map(|e| e / sum).collect()
}

/// Highest `k` probabilities with their labels, best first
///
/// Classes beyond the label table are reported as `class_<index>`.
pub fn top_labels(probabilities: &[f32], labels: &[String], k: usize) -> Vec<ClassificationObservation> {
    let mut ranked: Vec<(usize, f32)> = probabilities.iter().copied().enumerate().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked
        .into_iter()
        .take(k)
        .map(|(index, p)| {
            let label = labels
                .get(index)
                .cloned()
                .unwrap_or_else(|| format!("class_{}", index));
            ClassificationObservation::new(label, p)
        })
        .collect()
}
