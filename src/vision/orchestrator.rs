// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Analysis orchestration
//!
//! Decodes the request image once, fans out to every registered provider on
//! the blocking thread pool, waits for all of them to settle, then merges
//! their outputs into a single [`AnalysisResult`].
//!
//! A provider failure only removes that provider's section from the result.
//! Only an undecodable image fails the request.

use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::image_utils::{decode_image_bytes, DecodedImage, ImageError, ImageInfo, DEFAULT_MAX_IMAGE_SIZE};
use super::observations::{
    BarcodeObservation, ClassificationObservation, ContourSummary, FaceCaptureQuality,
    FaceObservation, FeaturePrintSummary, HorizonObservation, PoseObservation,
    RectangleObservation, SaliencyResult, TextObservation,
};
use super::providers::{ProviderError, ProviderKind, ProviderOutcome, ProviderSet, SharedDetector};
use super::reading_order::reconstruct;
use super::result::{AnalysisResult, ImageInfoResponse, Timestamper};

/// Classifications at or below this confidence are dropped
pub const MIN_CLASSIFICATION_CONFIDENCE: f32 = 0.1;

/// Maximum number of classifications reported
pub const MAX_CLASSIFICATIONS: usize = 10;

/// Per-provider outcomes of one request
#[derive(Debug, Clone)]
pub struct ProviderOutcomes {
    pub text: ProviderOutcome<Vec<TextObservation>>,
    pub faces: ProviderOutcome<Vec<FaceObservation>>,
    pub face_quality: ProviderOutcome<Vec<FaceCaptureQuality>>,
    pub barcodes: ProviderOutcome<Vec<BarcodeObservation>>,
    pub classifications: ProviderOutcome<Vec<ClassificationObservation>>,
    pub body_poses: ProviderOutcome<Vec<PoseObservation>>,
    pub hand_poses: ProviderOutcome<Vec<PoseObservation>>,
    pub saliency: ProviderOutcome<SaliencyResult>,
    pub rectangles: ProviderOutcome<Vec<RectangleObservation>>,
    pub horizon: ProviderOutcome<Option<HorizonObservation>>,
    pub contours: ProviderOutcome<ContourSummary>,
    pub feature_print: ProviderOutcome<FeaturePrintSummary>,
}

impl ProviderOutcomes {
    /// Number of providers that ran and failed
    pub fn failed_count(&self) -> usize {
        [
            self.text.is_failed(),
            self.faces.is_failed(),
            self.face_quality.is_failed(),
            self.barcodes.is_failed(),
            self.classifications.is_failed(),
            self.body_poses.is_failed(),
            self.hand_poses.is_failed(),
            self.saliency.is_failed(),
            self.rectangles.is_failed(),
            self.horizon.is_failed(),
            self.contours.is_failed(),
            self.feature_print.is_failed(),
        ]
        .iter()
        .filter(|failed| **failed)
        .count()
    }
}

/// Decoded image metadata plus the raw provider outcomes, before merging
#[derive(Debug, Clone)]
pub struct AnalysisRun {
    pub image: ImageInfo,
    pub outcomes: ProviderOutcomes,
}

/// Per-request fan-out/merge controller
///
/// Holds no per-request state; one instance serves all requests.
pub struct Orchestrator {
    providers: ProviderSet,
    timestamper: Timestamper,
    max_image_bytes: usize,
}

impl Orchestrator {
    pub fn new(providers: ProviderSet, timestamper: Timestamper) -> Self {
        Self {
            providers,
            timestamper,
            max_image_bytes: DEFAULT_MAX_IMAGE_SIZE,
        }
    }

    /// Override the maximum accepted encoded image size
    pub fn with_max_image_bytes(mut self, max_image_bytes: usize) -> Self {
        self.max_image_bytes = max_image_bytes;
        self
    }

    pub fn providers(&self) -> &ProviderSet {
        &self.providers
    }

    pub fn max_image_bytes(&self) -> usize {
        self.max_image_bytes
    }

    /// Analyze raw image bytes
    ///
    /// Never fails: decode problems produce `success == false` with a
    /// descriptive `error`.
    pub async fn analyze(&self, bytes: &[u8]) -> AnalysisResult {
        let request_id = Uuid::new_v4();
        let span = info_span!("analyze", %request_id, size_bytes = bytes.len());

        async {
            let started = Instant::now();
            match self.run(bytes).await {
                Ok(run) => {
                    let failed = run.outcomes.failed_count();
                    let result = assemble(run, self.timestamper.now());
                    info!(
                        "Analysis complete in {}ms ({} provider failures)",
                        started.elapsed().as_millis(),
                        failed
                    );
                    result
                }
                Err(e) => {
                    warn!("Rejected image: {}", e);
                    AnalysisResult::failure(self.timestamper.now(), e.to_string())
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Decode and run every provider, without merging
    pub async fn run(&self, bytes: &[u8]) -> Result<AnalysisRun, ImageError> {
        let image = Arc::new(self.decode(bytes).await?);
        debug!(
            "Decoded image: {}x{} {}",
            image.width(),
            image.height(),
            image.info.format_tag()
        );

        let outcomes = self.run_decoded(Arc::clone(&image)).await;
        Ok(AnalysisRun {
            image: image.info.clone(),
            outcomes,
        })
    }

    /// Run every registered provider against an already decoded image
    ///
    /// Providers run concurrently; this returns only after all of them have
    /// settled.
    pub async fn run_decoded(&self, image: Arc<DecodedImage>) -> ProviderOutcomes {
        let p = &self.providers;
        let (
            text,
            faces,
            face_quality,
            barcodes,
            classifications,
            body_poses,
            hand_poses,
            saliency,
            rectangles,
            horizon,
            contours,
            feature_print,
        ) = tokio::join!(
            invoke(ProviderKind::Text, &p.text, &image),
            invoke(ProviderKind::Faces, &p.faces, &image),
            invoke(ProviderKind::FaceQuality, &p.face_quality, &image),
            invoke(ProviderKind::Barcodes, &p.barcodes, &image),
            invoke(ProviderKind::Classifications, &p.classifications, &image),
            invoke(ProviderKind::BodyPoses, &p.body_poses, &image),
            invoke(ProviderKind::HandPoses, &p.hand_poses, &image),
            invoke(ProviderKind::Saliency, &p.saliency, &image),
            invoke(ProviderKind::Rectangles, &p.rectangles, &image),
            invoke(ProviderKind::Horizon, &p.horizon, &image),
            invoke(ProviderKind::Contours, &p.contours, &image),
            invoke(ProviderKind::FeaturePrint, &p.feature_print, &image),
        );

        ProviderOutcomes {
            text,
            faces,
            face_quality,
            barcodes,
            classifications,
            body_poses,
            hand_poses,
            saliency,
            rectangles,
            horizon,
            contours,
            feature_print,
        }
    }

    async fn decode(&self, bytes: &[u8]) -> Result<DecodedImage, ImageError> {
        // cheap checks first so oversized bodies are never copied
        if bytes.is_empty() {
            return Err(ImageError::EmptyData);
        }
        if bytes.len() > self.max_image_bytes {
            return Err(ImageError::TooLarge(bytes.len(), self.max_image_bytes));
        }

        let owned = bytes.to_vec();
        let max = self.max_image_bytes;
        tokio::task::spawn_blocking(move || decode_image_bytes(&owned, max))
            .await
            .map_err(|e| ImageError::DecodeFailed(format!("decoder task aborted: {}", e)))?
    }
}

async fn invoke<T: Send + 'static>(
    kind: ProviderKind,
    slot: &Option<SharedDetector<T>>,
    image: &Arc<DecodedImage>,
) -> ProviderOutcome<T> {
    let Some(detector) = slot.clone() else {
        return ProviderOutcome::NotRun;
    };

    let name = detector.name();
    let image = Arc::clone(image);
    let started = Instant::now();

    match tokio::task::spawn_blocking(move || detector.detect(&image)).await {
        Ok(Ok(output)) => {
            debug!(
                "Provider {} ({}) completed in {}ms",
                name,
                kind,
                started.elapsed().as_millis()
            );
            ProviderOutcome::Completed(output)
        }
        Ok(Err(e)) => {
            warn!("Provider {} ({}) failed: {}", name, kind, e);
            ProviderOutcome::Failed(e)
        }
        Err(join_error) => {
            let reason = if join_error.is_panic() {
                "panicked"
            } else {
                "cancelled"
            };
            warn!("Provider {} ({}) {}", name, kind, reason);
            ProviderOutcome::Failed(ProviderError::Aborted {
                provider: name.to_string(),
                reason: reason.to_string(),
            })
        }
    }
}

/// Merge provider outcomes into the response
pub fn assemble(run: AnalysisRun, timestamp: String) -> AnalysisResult {
    let AnalysisRun { image, outcomes } = run;
    let mut result = AnalysisResult::success(timestamp, ImageInfoResponse::from(&image));

    let quality = outcomes.face_quality.into_completed();
    result.faces = outcomes
        .faces
        .into_completed()
        .map(|faces| merge_face_quality(faces, quality.as_deref()));

    let text = outcomes.text.into_completed();
    result.full_text = text
        .as_deref()
        .filter(|fragments| !fragments.is_empty())
        .map(reconstruct);
    result.text_observations = text;

    result.classifications = outcomes
        .classifications
        .into_completed()
        .map(filter_classifications);

    result.barcodes = outcomes.barcodes.into_completed();
    result.body_poses = outcomes.body_poses.into_completed();
    result.hand_poses = outcomes.hand_poses.into_completed();
    result.saliency = outcomes.saliency.into_completed();
    result.rectangles = outcomes.rectangles.into_completed();
    result.horizon = outcomes.horizon.into_completed().flatten();
    result.contours = outcomes.contours.into_completed();
    result.feature_print = outcomes.feature_print.into_completed();

    result
}

/// Attach capture quality to faces by position
///
/// The i-th quality entry belongs to the i-th face. When a quality list is
/// present, faces past its end have no quality; extra quality entries are
/// ignored. Without a quality list the faces are returned untouched.
pub fn merge_face_quality(
    mut faces: Vec<FaceObservation>,
    quality: Option<&[FaceCaptureQuality]>,
) -> Vec<FaceObservation> {
    let Some(quality) = quality else {
        return faces;
    };

    if quality.len() != faces.len() {
        debug!(
            "Face quality count {} differs from face count {}",
            quality.len(),
            faces.len()
        );
    }

    for (i, face) in faces.iter_mut().enumerate() {
        face.capture_quality = quality.get(i).map(|q| q.quality);
    }
    faces
}

/// Keep the highest-confidence classifications above the floor
///
/// At most [`MAX_CLASSIFICATIONS`] entries survive, in the provider's order.
pub fn filter_classifications(
    classifications: Vec<ClassificationObservation>,
) -> Vec<ClassificationObservation> {
    let mut ranked: Vec<usize> = (0..classifications.len())
        .filter(|&i| classifications[i].confidence > MIN_CLASSIFICATION_CONFIDENCE)
        .collect();
    ranked.sort_by(|&a, &b| {
        classifications[b]
            .confidence
            .total_cmp(&classifications[a].confidence)
    });
    ranked.truncate(MAX_CLASSIFICATIONS);

    let mut keep = vec![false; classifications.len()];
    for i in ranked {
        keep[i] = true;
    }

    classifications
        .into_iter()
        .zip(keep)
        .filter_map(|(c, kept)| kept.then_some(c))
        .collect()
}
