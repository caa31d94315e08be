// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Unified analysis response

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::image_utils::ImageInfo;
use super::observations::{
    BarcodeObservation, ClassificationObservation, ContourSummary, FaceObservation,
    FeaturePrintSummary, HorizonObservation, PoseObservation, RectangleObservation,
    SaliencyResult, TextObservation,
};

/// Produces response timestamps
///
/// Built once at start-up and handed to the orchestrator; a fixed instant can
/// be supplied for deterministic output.
#[derive(Debug, Clone, Default)]
pub struct Timestamper {
    fixed: Option<DateTime<Utc>>,
}

impl Timestamper {
    /// Timestamps from the system clock
    pub fn system() -> Self {
        Self { fixed: None }
    }

    /// Every timestamp reports `at`
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self { fixed: Some(at) }
    }

    /// Current time as ISO-8601 / RFC 3339 with millisecond precision
    pub fn now(&self) -> String {
        self.fixed
            .unwrap_or_else(Utc::now)
            .to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

/// Image metadata as reported in the response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageInfoResponse {
    pub width: u32,
    pub height: u32,
    pub format: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_space: Option<String>,
}

impl From<&ImageInfo> for ImageInfoResponse {
    fn from(info: &ImageInfo) -> Self {
        Self {
            width: info.width,
            height: info.height,
            format: info.format_tag().to_string(),
            color_space: info.color_space().map(str::to_string),
        }
    }
}

/// Result of analyzing one image
///
/// When `success` is false every detection field is absent and `error`
/// describes the input problem. When `success` is true, `image_info` is always
/// present and each detection field is present only if its provider completed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub success: bool,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_info: Option<ImageInfoResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_observations: Option<Vec<TextObservation>>,
    /// Reading-order text; absent when no text fragment was found
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub faces: Option<Vec<FaceObservation>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub barcodes: Option<Vec<BarcodeObservation>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classifications: Option<Vec<ClassificationObservation>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_poses: Option<Vec<PoseObservation>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hand_poses: Option<Vec<PoseObservation>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saliency: Option<SaliencyResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rectangles: Option<Vec<RectangleObservation>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub horizon: Option<HorizonObservation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contours: Option<ContourSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_print: Option<FeaturePrintSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AnalysisResult {
    /// Successful result with image metadata and no detections yet
    pub fn success(timestamp: String, image_info: ImageInfoResponse) -> Self {
        Self {
            success: true,
            timestamp,
            image_info: Some(image_info),
            text_observations: None,
            full_text: None,
            faces: None,
            barcodes: None,
            classifications: None,
            body_poses: None,
            hand_poses: None,
            saliency: None,
            rectangles: None,
            horizon: None,
            contours: None,
            feature_print: None,
            error: None,
        }
    }

    /// Failed result carrying only the error description
    pub fn failure(timestamp: String, error: impl Into<String>) -> Self {
        Self {
            success: false,
            image_info: None,
            error: Some(error.into()),
            ..Self::success(timestamp, ImageInfoResponse::empty())
        }
    }

    /// Serialize to the JSON wire format
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl ImageInfoResponse {
    fn empty() -> Self {
        Self {
            width: 0,
            height: 0,
            format: String::new(),
            color_space: None,
        }
    }
}
