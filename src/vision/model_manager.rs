// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vision model manager for the built-in providers

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

use crate::vision::providers::classification::DEFAULT_TOP_K;
use crate::vision::providers::{
    ClassifierConfig, ContourDetector, FeaturePrintDetector, OnnxClassifier, OnnxTextDetector,
    ProviderKind, ProviderSet,
};

/// Configuration for loading the built-in providers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionModelConfig {
    /// Text model directory (det_model.onnx, rec_model.onnx, ppocr_keys_v1.txt)
    pub ocr_model_dir: Option<PathBuf>,
    /// Classifier directory (model.onnx, labels.txt)
    pub classifier_model_dir: Option<PathBuf>,
    /// Labels returned by the classifier before filtering
    pub classifier_top_k: usize,
    pub enable_contours: bool,
    pub enable_feature_print: bool,
}

impl Default for VisionModelConfig {
    fn default() -> Self {
        Self {
            ocr_model_dir: Some(PathBuf::from("./models/paddleocr-onnx")),
            classifier_model_dir: Some(PathBuf::from("./models/classifier-onnx")),
            classifier_top_k: DEFAULT_TOP_K,
            enable_contours: true,
            enable_feature_print: true,
        }
    }
}

impl VisionModelConfig {
    /// Only the CPU providers, no model directories
    pub fn cpu_only() -> Self {
        Self {
            ocr_model_dir: None,
            classifier_model_dir: None,
            ..Self::default()
        }
    }
}

/// Availability of one built-in provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisionModelInfo {
    pub name: String,
    /// Capability served, e.g. "text"
    pub kind: String,
    pub available: bool,
}

/// Loads the built-in providers and assembles the [`ProviderSet`]
///
/// Missing or broken models are logged and skipped; the node still serves
/// whatever loaded.
pub struct VisionModelManager {
    text: Option<Arc<OnnxTextDetector>>,
    classifier: Option<Arc<OnnxClassifier>>,
    contours: Option<ContourDetector>,
    feature_print: Option<FeaturePrintDetector>,
}

impl VisionModelManager {
    pub async fn new(config: VisionModelConfig) -> anyhow::Result<Self> {
        let text = match config.ocr_model_dir.clone() {
            Some(dir) => tokio::task::spawn_blocking(move || match OnnxTextDetector::load(&dir) {
                Ok(model) => Some(Arc::new(model)),
                Err(e) => {
                    tracing::warn!("⚠️ Failed to load text models from {}: {:#}", dir.display(), e);
                    None
                }
            })
            .await?,
            None => None,
        };

        let classifier = match config.classifier_model_dir.clone() {
            Some(dir) => {
                let classifier_config = ClassifierConfig {
                    model_dir: dir,
                    top_k: config.classifier_top_k,
                };
                tokio::task::spawn_blocking(move || match OnnxClassifier::load(&classifier_config) {
                    Ok(model) => Some(Arc::new(model)),
                    Err(e) => {
                        tracing::warn!(
                            "⚠️ Failed to load classifier from {}: {:#}",
                            classifier_config.model_dir.display(),
                            e
                        );
                        None
                    }
                })
                .await?
            }
            None => None,
        };

        let contours = config.enable_contours.then(ContourDetector::new);
        let feature_print = config.enable_feature_print.then(FeaturePrintDetector::new);

        let manager = Self {
            text,
            classifier,
            contours,
            feature_print,
        };
        let available = manager
            .list_models()
            .into_iter()
            .filter(|m| m.available)
            .map(|m| m.name)
            .collect::<Vec<_>>();
        tracing::info!("Vision providers ready: [{}]", available.join(", "));

        Ok(manager)
    }

    pub fn has_text(&self) -> bool {
        self.text.is_some()
    }

    pub fn has_classifier(&self) -> bool {
        self.classifier.is_some()
    }

    /// Provider set for the orchestrator
    pub fn provider_set(&self) -> ProviderSet {
        let mut set = ProviderSet::new();
        if let Some(text) = &self.text {
            set.text = Some(text.clone());
        }
        if let Some(classifier) = &self.classifier {
            set.classifications = Some(classifier.clone());
        }
        if let Some(contours) = &self.contours {
            set = set.with_contours(contours.clone());
        }
        if let Some(feature_print) = &self.feature_print {
            set = set.with_feature_print(feature_print.clone());
        }
        set
    }

    /// Every built-in provider with its availability
    pub fn list_models(&self) -> Vec<VisionModelInfo> {
        let entry = |name: &str, kind: ProviderKind, available: bool| VisionModelInfo {
            name: name.to_string(),
            kind: kind.as_str().to_string(),
            available,
        };

        vec![
            entry("onnx-text", ProviderKind::Text, self.text.is_some()),
            entry(
                "onnx-classifier",
                ProviderKind::Classifications,
                self.classifier.is_some(),
            ),
            entry("cpu-contours", ProviderKind::Contours, self.contours.is_some()),
            entry(
                "cpu-feature-print",
                ProviderKind::FeaturePrint,
                self.feature_print.is_some(),
            ),
        ]
    }
}
