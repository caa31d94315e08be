// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Orchestrator fan-out/merge tests
//!
//! These tests verify that:
//! - Undecodable input fails the request with a descriptive error
//! - Provider failures only remove that provider's section
//! - Face quality attaches to faces by position
//! - Classifications are filtered and capped
//! - fullText is absent when no text was found

use chrono::{TimeZone, Utc};
use fabstir_vision_node::vision::{
    AnalysisResult, BarcodeObservation, ClassificationObservation, DecodedImage, Detector,
    FaceCaptureQuality, FaceObservation, HorizonObservation, NormalizedRect, Orchestrator,
    ProviderError, ProviderSet, TextObservation, Timestamper,
};
use image::{DynamicImage, ImageFormat};
use mockall::mock;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::time::Duration;
use tokio::time::timeout;

mock! {
    pub TextProvider {}
    impl Detector<Vec<TextObservation>> for TextProvider {
        fn name(&self) -> &'static str;
        fn detect(&self, image: &DecodedImage) -> Result<Vec<TextObservation>, ProviderError>;
    }
}

mock! {
    pub FaceProvider {}
    impl Detector<Vec<FaceObservation>> for FaceProvider {
        fn name(&self) -> &'static str;
        fn detect(&self, image: &DecodedImage) -> Result<Vec<FaceObservation>, ProviderError>;
    }
}

mock! {
    pub FaceQualityProvider {}
    impl Detector<Vec<FaceCaptureQuality>> for FaceQualityProvider {
        fn name(&self) -> &'static str;
        fn detect(&self, image: &DecodedImage) -> Result<Vec<FaceCaptureQuality>, ProviderError>;
    }
}

mock! {
    pub BarcodeProvider {}
    impl Detector<Vec<BarcodeObservation>> for BarcodeProvider {
        fn name(&self) -> &'static str;
        fn detect(&self, image: &DecodedImage) -> Result<Vec<BarcodeObservation>, ProviderError>;
    }
}

mock! {
    pub ClassificationProvider {}
    impl Detector<Vec<ClassificationObservation>> for ClassificationProvider {
        fn name(&self) -> &'static str;
        fn detect(
            &self,
            image: &DecodedImage,
        ) -> Result<Vec<ClassificationObservation>, ProviderError>;
    }
}

mock! {
    pub HorizonProvider {}
    impl Detector<Option<HorizonObservation>> for HorizonProvider {
        fn name(&self) -> &'static str;
        fn detect(&self, image: &DecodedImage) -> Result<Option<HorizonObservation>, ProviderError>;
    }
}

/// Helper: encode a blank RGB image as PNG
fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut buf = Vec::new();
    DynamicImage::new_rgb8(width, height)
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

/// Helper: deterministic clock
fn clock() -> Timestamper {
    Timestamper::fixed(Utc.with_ymd_and_hms(2025, 11, 3, 12, 0, 0).unwrap())
}

fn orchestrator(providers: ProviderSet) -> Orchestrator {
    Orchestrator::new(providers, clock())
}

fn text_returning(fragments: Vec<TextObservation>) -> MockTextProvider {
    let mut mock = MockTextProvider::new();
    mock.expect_name().return_const("mock-text");
    mock.expect_detect()
        .times(1)
        .returning(move |_| Ok(fragments.clone()));
    mock
}

fn failing_barcodes() -> MockBarcodeProvider {
    let mut mock = MockBarcodeProvider::new();
    mock.expect_name().return_const("mock-barcodes");
    mock.expect_detect()
        .times(1)
        .returning(|_| Err(ProviderError::DetectionFailed("engine offline".to_string())));
    mock
}

fn faces_returning(count: usize) -> MockFaceProvider {
    let mut mock = MockFaceProvider::new();
    mock.expect_name().return_const("mock-faces");
    mock.expect_detect().returning(move |_| {
        Ok((0..count)
            .map(|i| FaceObservation::new(NormalizedRect::new(0.1 * i as f64, 0.5, 0.1, 0.1), 0.9))
            .collect())
    });
    mock
}

fn quality_returning(scores: Vec<f32>) -> MockFaceQualityProvider {
    let mut mock = MockFaceQualityProvider::new();
    mock.expect_name().return_const("mock-face-quality");
    mock.expect_detect().returning(move |_| {
        Ok(scores
            .iter()
            .map(|q| FaceCaptureQuality {
                bounding_box: NormalizedRect::new(0.0, 0.0, 0.1, 0.1),
                quality: *q,
            })
            .collect())
    });
    mock
}

#[cfg(test)]
mod orchestrator_tests {
    use super::*;

    /// Test 1: Garbage bytes fail the request, not the process
    #[tokio::test]
    async fn test_undecodable_input() {
        let mut text = MockTextProvider::new();
        text.expect_name().return_const("mock-text");
        text.expect_detect().never();

        let result = orchestrator(ProviderSet::new().with_text(text))
            .analyze(&[0u8; 10])
            .await;

        assert!(!result.success);
        assert!(result.error.is_some());
        assert!(result.image_info.is_none());
        assert!(result.text_observations.is_none());
        assert_eq!(result.timestamp, "2025-11-03T12:00:00.000Z");
    }

    /// Test 2: Empty body is rejected with a descriptive message
    #[tokio::test]
    async fn test_empty_input() {
        let result = orchestrator(ProviderSet::new()).analyze(&[]).await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("Image data is empty"));
    }

    /// Test 3: Oversized input is rejected before decoding
    #[tokio::test]
    async fn test_oversized_input() {
        let bytes = png_bytes(32, 32);
        let result = Orchestrator::new(ProviderSet::new(), clock())
            .with_max_image_bytes(16)
            .analyze(&bytes)
            .await;

        assert!(!result.success);
        assert!(result.error.unwrap().contains("too large"));
    }

    /// Test 4: A failing provider only loses its own section
    #[tokio::test]
    async fn test_partial_failure() {
        let fragments = vec![
            TextObservation::new("Hello", 0.9, NormalizedRect::new(0.10, 0.90, 0.20, 0.05)),
            TextObservation::new("World", 0.9, NormalizedRect::new(0.35, 0.90, 0.20, 0.05)),
        ];
        let providers = ProviderSet::new()
            .with_text(text_returning(fragments))
            .with_barcodes(failing_barcodes());

        let result = orchestrator(providers).analyze(&png_bytes(64, 48)).await;

        assert!(result.success);
        let info = result.image_info.as_ref().unwrap();
        assert_eq!((info.width, info.height), (64, 48));
        assert_eq!(info.format, "png");
        assert_eq!(result.text_observations.as_ref().map(Vec::len), Some(2));
        assert_eq!(result.full_text.as_deref(), Some("Hello World"));
        assert!(result.barcodes.is_none());
        assert!(result.error.is_none());
    }

    /// Test 5: Run reports per-provider outcomes before merging
    #[tokio::test]
    async fn test_outcomes_distinguish_not_run_failed_and_empty() {
        let providers = ProviderSet::new()
            .with_text(text_returning(vec![]))
            .with_barcodes(failing_barcodes());

        let run = orchestrator(providers)
            .run(&png_bytes(8, 8))
            .await
            .unwrap();

        assert!(run.outcomes.text.is_completed());
        assert!(run.outcomes.barcodes.is_failed());
        assert!(run.outcomes.faces.is_not_run());
        assert_eq!(run.outcomes.failed_count(), 1);
    }

    /// Test 6: No text means fullText is absent, not empty
    #[tokio::test]
    async fn test_full_text_absent_without_fragments() {
        let providers = ProviderSet::new().with_text(text_returning(vec![]));
        let result = orchestrator(providers).analyze(&png_bytes(8, 8)).await;

        assert!(result.success);
        assert_eq!(result.text_observations, Some(vec![]));
        assert!(result.full_text.is_none());

        let json = result.to_json().unwrap();
        assert!(json.contains("\"textObservations\":[]"));
        assert!(!json.contains("fullText"));
    }

    /// Test 7: Quality attaches positionally; surplus faces keep none
    #[tokio::test]
    async fn test_face_quality_positional_merge() {
        let providers = ProviderSet::new()
            .with_faces(faces_returning(3))
            .with_face_quality(quality_returning(vec![0.8, 0.4]));

        let result = orchestrator(providers).analyze(&png_bytes(16, 16)).await;
        let faces = result.faces.unwrap();

        assert_eq!(faces.len(), 3);
        assert_eq!(faces[0].capture_quality, Some(0.8));
        assert_eq!(faces[1].capture_quality, Some(0.4));
        assert_eq!(faces[2].capture_quality, None);
    }

    /// Test 8: Extra quality entries are ignored
    #[tokio::test]
    async fn test_face_quality_surplus_ignored() {
        let providers = ProviderSet::new()
            .with_faces(faces_returning(1))
            .with_face_quality(quality_returning(vec![0.7, 0.6, 0.5]));

        let faces = orchestrator(providers)
            .analyze(&png_bytes(16, 16))
            .await
            .faces
            .unwrap();
        assert_eq!(faces.len(), 1);
        assert_eq!(faces[0].capture_quality, Some(0.7));
    }

    /// Test 9: Failed quality provider leaves faces untouched
    #[tokio::test]
    async fn test_face_quality_failure_keeps_faces() {
        let mut quality = MockFaceQualityProvider::new();
        quality.expect_name().return_const("mock-face-quality");
        quality
            .expect_detect()
            .returning(|_| Err(ProviderError::Unavailable("model not loaded".to_string())));

        let providers = ProviderSet::new()
            .with_faces(faces_returning(2))
            .with_face_quality(quality);

        let result = orchestrator(providers).analyze(&png_bytes(16, 16)).await;
        let faces = result.faces.unwrap();
        assert_eq!(faces.len(), 2);
        assert!(faces.iter().all(|f| f.capture_quality.is_none()));
    }

    /// Test 10: Classifications are filtered to > 0.1 and at most ten
    #[tokio::test]
    async fn test_classification_cap() {
        let mut classifier = MockClassificationProvider::new();
        classifier.expect_name().return_const("mock-classifier");
        classifier.expect_detect().returning(|_| {
            Ok((0..25)
                .map(|i| ClassificationObservation::new(format!("label{}", i), i as f32 / 25.0))
                .collect())
        });

        let result = orchestrator(ProviderSet::new().with_classifications(classifier))
            .analyze(&png_bytes(8, 8))
            .await;
        let classes = result.classifications.unwrap();

        assert_eq!(classes.len(), 10);
        assert!(classes.iter().all(|c| c.confidence > 0.1));
        // ten best, still in provider order
        let labels: Vec<&str> = classes.iter().map(|c| c.label.as_str()).collect();
        let expected: Vec<String> = (15..25).map(|i| format!("label{}", i)).collect();
        assert_eq!(labels, expected);
    }

    /// Test 11: A completed horizon provider that finds nothing omits the field
    #[tokio::test]
    async fn test_horizon_not_found() {
        let mut horizon = MockHorizonProvider::new();
        horizon.expect_name().return_const("mock-horizon");
        horizon.expect_detect().returning(|_| Ok(None));

        let result = orchestrator(ProviderSet::new().with_horizon(horizon))
            .analyze(&png_bytes(8, 8))
            .await;
        assert!(result.success);
        assert!(result.horizon.is_none());
    }

    /// Test 12: Every provider sees the same decoded buffer exactly once
    #[tokio::test]
    async fn test_each_provider_invoked_once() {
        let calls = Arc::new(AtomicUsize::new(0));

        let mut text = MockTextProvider::new();
        text.expect_name().return_const("mock-text");
        let text_calls = Arc::clone(&calls);
        text.expect_detect().times(1).returning(move |image| {
            assert_eq!((image.width(), image.height()), (20, 10));
            text_calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![])
        });

        let mut faces = MockFaceProvider::new();
        faces.expect_name().return_const("mock-faces");
        let face_calls = Arc::clone(&calls);
        faces.expect_detect().times(1).returning(move |image| {
            assert_eq!((image.width(), image.height()), (20, 10));
            face_calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![])
        });

        let providers = ProviderSet::new().with_text(text).with_faces(faces);
        let result = orchestrator(providers).analyze(&png_bytes(20, 10)).await;

        assert!(result.success);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    /// Test 13: Result JSON uses camelCase and omits providers that did not run
    #[tokio::test]
    async fn test_result_wire_shape() {
        let result: AnalysisResult = orchestrator(ProviderSet::new())
            .analyze(&png_bytes(8, 8))
            .await;
        let value = serde_json::to_value(&result).unwrap();
        let object = value.as_object().unwrap();

        assert_eq!(object["success"], true);
        assert_eq!(object["imageInfo"]["format"], "png");
        assert!(!object.contains_key("faces"));
        assert!(!object.contains_key("contours"));
        assert!(!object.contains_key("error"));
    }

    /// Test 14: Unpaired faces lose provider-supplied quality
    ///
    /// A face provider that fills `captureQuality` itself does not keep it once
    /// a quality list is present and too short to reach that face.
    #[tokio::test]
    async fn test_face_quality_tail_cleared() {
        let mut faces = MockFaceProvider::new();
        faces.expect_name().return_const("mock-faces");
        faces.expect_detect().returning(|_| {
            Ok((0..2)
                .map(|i| {
                    let mut face = FaceObservation::new(
                        NormalizedRect::new(0.2 * i as f64, 0.5, 0.1, 0.1),
                        0.9,
                    );
                    face.capture_quality = Some(0.2);
                    face
                })
                .collect())
        });

        let providers = ProviderSet::new()
            .with_faces(faces)
            .with_face_quality(quality_returning(vec![0.7]));
        let faces = orchestrator(providers)
            .analyze(&png_bytes(16, 16))
            .await
            .faces
            .unwrap();

        assert_eq!(faces[0].capture_quality, Some(0.7));
        assert_eq!(faces[1].capture_quality, None);
    }

    /// Test 15: Providers are dispatched concurrently
    ///
    /// Both providers block on a shared two-party barrier, so neither can
    /// finish unless the other is running at the same time.
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_providers_run_concurrently() {
        let barrier = Arc::new(Barrier::new(2));

        let mut text = MockTextProvider::new();
        text.expect_name().return_const("mock-text");
        let text_barrier = Arc::clone(&barrier);
        text.expect_detect().times(1).returning(move |_| {
            text_barrier.wait();
            Ok(vec![])
        });

        let mut faces = MockFaceProvider::new();
        faces.expect_name().return_const("mock-faces");
        let face_barrier = Arc::clone(&barrier);
        faces.expect_detect().times(1).returning(move |_| {
            face_barrier.wait();
            Ok(vec![])
        });

        let orchestrator = orchestrator(ProviderSet::new().with_text(text).with_faces(faces));
        let png = png_bytes(8, 8);
        let result = timeout(Duration::from_secs(10), orchestrator.analyze(&png))
            .await
            .expect("providers were not dispatched concurrently");

        assert!(result.success);
        assert_eq!(result.text_observations, Some(vec![]));
        assert_eq!(result.faces, Some(vec![]));
    }
}
