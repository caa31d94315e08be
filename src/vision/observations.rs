// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Observation records produced by detection providers
//!
//! Every record uses normalized geometry (see [`crate::vision::geometry`]) and
//! serializes in camelCase to match the analysis response schema.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::geometry::{NormalizedPoint, NormalizedRect};

/// A ranked recognition candidate for a text region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextCandidate {
    pub text: String,
    pub confidence: f32,
}

/// A recognized text fragment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextObservation {
    /// Best recognition for the region
    pub text: String,
    /// Confidence of the best recognition (0.0-1.0)
    pub confidence: f32,
    /// Region location
    pub bounding_box: NormalizedRect,
    /// Alternate recognitions, best first (excludes `text`)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternates: Vec<TextCandidate>,
}

impl TextObservation {
    pub fn new(text: impl Into<String>, confidence: f32, bounding_box: NormalizedRect) -> Self {
        Self {
            text: text.into(),
            confidence,
            bounding_box,
            alternates: Vec::new(),
        }
    }

    pub fn with_alternates(mut self, alternates: Vec<TextCandidate>) -> Self {
        self.alternates = alternates;
        self
    }
}

/// Named groups of facial landmark points (e.g. "leftEye" -> points)
pub type FaceLandmarks = BTreeMap<String, Vec<NormalizedPoint>>;

/// A detected face
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceObservation {
    pub bounding_box: NormalizedRect,
    pub confidence: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub landmarks: Option<FaceLandmarks>,
    /// Capture quality, attached from the face-quality provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capture_quality: Option<f32>,
    /// Head roll in degrees
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roll: Option<f64>,
    /// Head yaw in degrees
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yaw: Option<f64>,
    /// Head pitch in degrees
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pitch: Option<f64>,
}

impl FaceObservation {
    pub fn new(bounding_box: NormalizedRect, confidence: f32) -> Self {
        Self {
            bounding_box,
            confidence,
            landmarks: None,
            capture_quality: None,
            roll: None,
            yaw: None,
            pitch: None,
        }
    }
}

/// Per-face capture quality as reported by a face-quality provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceCaptureQuality {
    pub bounding_box: NormalizedRect,
    pub quality: f32,
}

/// A decoded (or merely located) barcode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BarcodeObservation {
    /// Decoded payload, absent when the symbol was located but not read
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
    /// Symbology tag, e.g. "QR", "EAN13"
    pub symbology: String,
    pub bounding_box: NormalizedRect,
    pub confidence: f32,
}

/// A whole-image classification label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationObservation {
    pub label: String,
    pub confidence: f32,
}

impl ClassificationObservation {
    pub fn new(label: impl Into<String>, confidence: f32) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }
}

/// A located body or hand joint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecognizedJoint {
    pub location: NormalizedPoint,
    pub confidence: f32,
}

/// A body or hand pose: joint name -> location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoseObservation {
    pub joints: BTreeMap<String, RecognizedJoint>,
    pub confidence: f32,
}

/// A salient region of the image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalientObject {
    pub bounding_box: NormalizedRect,
    pub confidence: f32,
}

/// Saliency analysis for the whole image
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaliencyResult {
    pub salient_objects: Vec<SalientObject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attention_score: Option<f32>,
}

/// A detected quadrilateral
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RectangleObservation {
    pub top_left: NormalizedPoint,
    pub top_right: NormalizedPoint,
    pub bottom_left: NormalizedPoint,
    pub bottom_right: NormalizedPoint,
    pub bounding_box: NormalizedRect,
    pub confidence: f32,
}

impl RectangleObservation {
    /// Build from four corners; the bounding box is derived from them
    pub fn from_corners(
        top_left: NormalizedPoint,
        top_right: NormalizedPoint,
        bottom_left: NormalizedPoint,
        bottom_right: NormalizedPoint,
        confidence: f32,
    ) -> Self {
        let bounding_box =
            NormalizedRect::enclosing(&[top_left, top_right, bottom_left, bottom_right])
                .unwrap_or(NormalizedRect::new(0.0, 0.0, 0.0, 0.0));
        Self {
            top_left,
            top_right,
            bottom_left,
            bottom_right,
            bounding_box,
            confidence,
        }
    }
}

/// Estimated horizon tilt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HorizonObservation {
    pub angle_degrees: f64,
    pub confidence: f32,
}

/// Aggregate contour statistics
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContourSummary {
    pub contour_count: usize,
    pub point_count: usize,
}

/// Shape of an image feature embedding (the vector itself is not emitted)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeaturePrintSummary {
    pub element_count: usize,
    pub element_type: String,
}
