// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detection provider contract
//!
//! Every detection capability (text, faces, barcodes, ...) is a [`Detector`]
//! producing a typed output. Providers are independent of each other: they
//! read the same immutable [`DecodedImage`] and never share configuration.
//!
//! Built-in adapters:
//! - `ocr` - ONNX text detection + recognition
//! - `classification` - ONNX whole-image classifier
//! - `contours` - CPU contour statistics
//! - `feature_print` - CPU luminance descriptor

pub mod classification;
pub mod components;
pub mod contours;
pub mod feature_print;
pub mod ocr;
pub mod session;

use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use super::image_utils::DecodedImage;
use super::observations::{
    BarcodeObservation, ClassificationObservation, ContourSummary, FaceCaptureQuality,
    FaceObservation, FeaturePrintSummary, HorizonObservation, PoseObservation,
    RectangleObservation, SaliencyResult, TextObservation,
};

pub use classification::{ClassifierConfig, OnnxClassifier};
pub use contours::ContourDetector;
pub use feature_print::FeaturePrintDetector;
pub use ocr::OnnxTextDetector;

/// Failure of a single provider on an otherwise valid image
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// Model or engine is not ready
    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    /// Inference or post-processing failed
    #[error("Detection failed: {0}")]
    DetectionFailed(String),

    /// Provider task panicked or was cancelled
    #[error("Provider {provider} aborted: {reason}")]
    Aborted { provider: String, reason: String },
}

impl From<anyhow::Error> for ProviderError {
    fn from(err: anyhow::Error) -> Self {
        ProviderError::DetectionFailed(format!("{:#}", err))
    }
}

/// A detection capability
///
/// Implementations must be stateless with respect to a request: `detect` may
/// run concurrently with other providers on a blocking worker thread.
pub trait Detector<T>: Send + Sync {
    /// Provider name for logging and health reporting
    fn name(&self) -> &'static str;

    /// Run detection against a decoded image
    fn detect(&self, image: &DecodedImage) -> Result<T, ProviderError>;
}

/// Outcome of one provider invocation within one request
#[derive(Debug, Clone)]
pub enum ProviderOutcome<T> {
    /// No provider registered for this capability
    NotRun,
    /// Provider ran and failed; its section is absent from the result
    Failed(ProviderError),
    /// Provider ran to completion (possibly finding nothing)
    Completed(T),
}

impl<T> ProviderOutcome<T> {
    pub fn is_completed(&self) -> bool {
        matches!(self, ProviderOutcome::Completed(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ProviderOutcome::Failed(_))
    }

    pub fn is_not_run(&self) -> bool {
        matches!(self, ProviderOutcome::NotRun)
    }

    pub fn as_completed(&self) -> Option<&T> {
        match self {
            ProviderOutcome::Completed(value) => Some(value),
            _ => None,
        }
    }

    /// Completed output, or `None` when the provider did not run or failed
    pub fn into_completed(self) -> Option<T> {
        match self {
            ProviderOutcome::Completed(value) => Some(value),
            _ => None,
        }
    }
}

/// Capability served by a provider slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Text,
    Faces,
    FaceQuality,
    Barcodes,
    Classifications,
    BodyPoses,
    HandPoses,
    Saliency,
    Rectangles,
    Horizon,
    Contours,
    FeaturePrint,
}

impl ProviderKind {
    /// Every capability, in slot order
    pub const ALL: [ProviderKind; 12] = [
        ProviderKind::Text,
        ProviderKind::Faces,
        ProviderKind::FaceQuality,
        ProviderKind::Barcodes,
        ProviderKind::Classifications,
        ProviderKind::BodyPoses,
        ProviderKind::HandPoses,
        ProviderKind::Saliency,
        ProviderKind::Rectangles,
        ProviderKind::Horizon,
        ProviderKind::Contours,
        ProviderKind::FeaturePrint,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Text => "text",
            ProviderKind::Faces => "faces",
            ProviderKind::FaceQuality => "faceQuality",
            ProviderKind::Barcodes => "barcodes",
            ProviderKind::Classifications => "classifications",
            ProviderKind::BodyPoses => "bodyPoses",
            ProviderKind::HandPoses => "handPoses",
            ProviderKind::Saliency => "saliency",
            ProviderKind::Rectangles => "rectangles",
            ProviderKind::Horizon => "horizon",
            ProviderKind::Contours => "contours",
            ProviderKind::FeaturePrint => "featurePrint",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared handle to a provider producing `T`
pub type SharedDetector<T> = Arc<dyn Detector<T>>;

/// The set of providers invoked for each request, one optional slot per
/// capability
#[derive(Clone, Default)]
pub struct ProviderSet {
    pub text: Option<SharedDetector<Vec<TextObservation>>>,
    pub faces: Option<SharedDetector<Vec<FaceObservation>>>,
    pub face_quality: Option<SharedDetector<Vec<FaceCaptureQuality>>>,
    pub barcodes: Option<SharedDetector<Vec<BarcodeObservation>>>,
    pub classifications: Option<SharedDetector<Vec<ClassificationObservation>>>,
    pub body_poses: Option<SharedDetector<Vec<PoseObservation>>>,
    pub hand_poses: Option<SharedDetector<Vec<PoseObservation>>>,
    pub saliency: Option<SharedDetector<SaliencyResult>>,
    pub rectangles: Option<SharedDetector<Vec<RectangleObservation>>>,
    pub horizon: Option<SharedDetector<Option<HorizonObservation>>>,
    pub contours: Option<SharedDetector<ContourSummary>>,
    pub feature_print: Option<SharedDetector<FeaturePrintSummary>>,
}

impl ProviderSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(mut self, detector: impl Detector<Vec<TextObservation>> + 'static) -> Self {
        self.text = Some(Arc::new(detector));
        self
    }

    pub fn with_faces(mut self, detector: impl Detector<Vec<FaceObservation>> + 'static) -> Self {
        self.faces = Some(Arc::new(detector));
        self
    }

    pub fn with_face_quality(
        mut self,
        detector: impl Detector<Vec<FaceCaptureQuality>> + 'static,
    ) -> Self {
        self.face_quality = Some(Arc::new(detector));
        self
    }

    pub fn with_barcodes(
        mut self,
        detector: impl Detector<Vec<BarcodeObservation>> + 'static,
    ) -> Self {
        self.barcodes = Some(Arc::new(detector));
        self
    }

    pub fn with_classifications(
        mut self,
        detector: impl Detector<Vec<ClassificationObservation>> + 'static,
    ) -> Self {
        self.classifications = Some(Arc::new(detector));
        self
    }

    pub fn with_body_poses(
        mut self,
        detector: impl Detector<Vec<PoseObservation>> + 'static,
    ) -> Self {
        self.body_poses = Some(Arc::new(detector));
        self
    }

    pub fn with_hand_poses(
        mut self,
        detector: impl Detector<Vec<PoseObservation>> + 'static,
    ) -> Self {
        self.hand_poses = Some(Arc::new(detector));
        self
    }

    pub fn with_saliency(mut self, detector: impl Detector<SaliencyResult> + 'static) -> Self {
        self.saliency = Some(Arc::new(detector));
        self
    }

    pub fn with_rectangles(
        mut self,
        detector: impl Detector<Vec<RectangleObservation>> + 'static,
    ) -> Self {
        self.rectangles = Some(Arc::new(detector));
        self
    }

    pub fn with_horizon(
        mut self,
        detector: impl Detector<Option<HorizonObservation>> + 'static,
    ) -> Self {
        self.horizon = Some(Arc::new(detector));
        self
    }

    pub fn with_contours(mut self, detector: impl Detector<ContourSummary> + 'static) -> Self {
        self.contours = Some(Arc::new(detector));
        self
    }

    pub fn with_feature_print(
        mut self,
        detector: impl Detector<FeaturePrintSummary> + 'static,
    ) -> Self {
        self.feature_print = Some(Arc::new(detector));
        self
    }

    /// Registered providers as (capability, provider name)
    pub fn enabled(&self) -> Vec<(ProviderKind, &'static str)> {
        let mut enabled = Vec::new();
        push_name(&mut enabled, ProviderKind::Text, &self.text);
        push_name(&mut enabled, ProviderKind::Faces, &self.faces);
        push_name(&mut enabled, ProviderKind::FaceQuality, &self.face_quality);
        push_name(&mut enabled, ProviderKind::Barcodes, &self.barcodes);
        push_name(&mut enabled, ProviderKind::Classifications, &self.classifications);
        push_name(&mut enabled, ProviderKind::BodyPoses, &self.body_poses);
        push_name(&mut enabled, ProviderKind::HandPoses, &self.hand_poses);
        push_name(&mut enabled, ProviderKind::Saliency, &self.saliency);
        push_name(&mut enabled, ProviderKind::Rectangles, &self.rectangles);
        push_name(&mut enabled, ProviderKind::Horizon, &self.horizon);
        push_name(&mut enabled, ProviderKind::Contours, &self.contours);
        push_name(&mut enabled, ProviderKind::FeaturePrint, &self.feature_print);
        enabled
    }

    pub fn is_empty(&self) -> bool {
        self.enabled().is_empty()
    }

    /// Capabilities with no registered provider; their fields are always
    /// absent from results
    pub fn unregistered(&self) -> Vec<ProviderKind> {
        let enabled = self.enabled();
        ProviderKind::ALL
            .into_iter()
            .filter(|kind| !enabled.iter().any(|(k, _)| k == kind))
            .collect()
    }
}

impl fmt::Debug for ProviderSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSet")
            .field("enabled", &self.enabled())
            .finish()
    }
}

fn push_name<T>(
    out: &mut Vec<(ProviderKind, &'static str)>,
    kind: ProviderKind,
    slot: &Option<SharedDetector<T>>,
) {
    if let Some(detector) = slot {
        out.push((kind, detector.name()));
    }
}
