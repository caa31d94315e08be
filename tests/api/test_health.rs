// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Health endpoint tests for GET /health

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
};
use fabstir_vision_node::{
    api::{
        handlers::HealthResponse,
        http_server::{create_app, AppState, RouterLimits},
    },
    vision::{
        providers::{ContourDetector, FeaturePrintDetector},
        Orchestrator, ProviderSet, Timestamper, VisionModelConfig, VisionModelInfo,
        VisionModelManager,
    },
};
use std::time::Duration;
use tower::util::ServiceExt;

fn limits() -> RouterLimits {
    RouterLimits {
        max_body_bytes: 1024,
        request_timeout: Duration::from_secs(5),
    }
}

async fn get_health(state: AppState) -> HealthResponse {
    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let response = create_app(state, limits()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[cfg(test)]
mod health_tests {
    use super::*;

    /// Test 1: Registered providers are listed
    #[tokio::test]
    async fn test_health_lists_registered_providers() {
        let providers = ProviderSet::new()
            .with_contours(ContourDetector::new())
            .with_feature_print(FeaturePrintDetector);
        let state = AppState::new(Orchestrator::new(providers, Timestamper::system()));

        let health = get_health(state).await;

        assert_eq!(health.status, "ok");
        let names: Vec<&str> = health.providers.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["cpu-contours", "cpu-feature-print"]);
        assert!(health.providers.iter().all(|p| p.available));
        assert!(health.unregistered.contains(&"faces".to_string()));
        assert!(health.unregistered.contains(&"barcodes".to_string()));
        assert!(!health.unregistered.contains(&"contours".to_string()));
    }

    /// Test 2: Unloaded built-in models are reported unavailable
    #[tokio::test]
    async fn test_health_reports_unloaded_models() {
        let state = AppState::new(Orchestrator::new(ProviderSet::new(), Timestamper::system()))
            .with_models(vec![VisionModelInfo {
                name: "onnx-text".to_string(),
                kind: "text".to_string(),
                available: false,
            }]);

        let health = get_health(state).await;

        assert_eq!(health.status, "degraded");
        assert_eq!(health.providers.len(), 1);
        assert!(!health.providers[0].available);
    }

    /// Test 3: Loaded models are not listed twice
    #[tokio::test]
    async fn test_health_deduplicates_models_and_providers() {
        let providers = ProviderSet::new().with_contours(ContourDetector::new());
        let state = AppState::new(Orchestrator::new(providers, Timestamper::system()))
            .with_models(vec![VisionModelInfo {
                name: "cpu-contours".to_string(),
                kind: "contours".to_string(),
                available: true,
            }]);

        let health = get_health(state).await;
        assert_eq!(health.providers.len(), 1);
        assert_eq!(health.providers[0].kind, "contours");
    }

    /// Test 4: The CPU-only node leaves faces and barcodes unregistered
    #[tokio::test]
    async fn test_health_reports_unregistered_capabilities() {
        let manager = VisionModelManager::new(VisionModelConfig::cpu_only())
            .await
            .unwrap();
        let state = AppState::new(Orchestrator::new(
            manager.provider_set(),
            Timestamper::system(),
        ))
        .with_models(manager.list_models());

        let health = get_health(state).await;

        for kind in ["text", "faces", "faceQuality", "barcodes", "classifications"] {
            assert!(health.unregistered.iter().any(|k| k == kind), "{} missing", kind);
        }
        assert!(!health.unregistered.iter().any(|k| k == "featurePrint"));
    }
}
