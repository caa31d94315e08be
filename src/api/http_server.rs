// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::extract::DefaultBodyLimit;
use axum::http::Uri;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use super::analyze::analyze_handler;
use super::errors::ApiError;
use super::handlers::health_handler;
use crate::vision::{Orchestrator, VisionModelInfo};

/// Extra body allowance over the image limit, so slightly oversized images
/// still reach the decoder and get a descriptive error
pub const BODY_LIMIT_SLACK: usize = 64 * 1024;

/// Shared state for all handlers
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    /// Built-in providers and whether they loaded
    pub models: Arc<Vec<VisionModelInfo>>,
}

impl AppState {
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            models: Arc::new(Vec::new()),
        }
    }

    pub fn with_models(mut self, models: Vec<VisionModelInfo>) -> Self {
        self.models = Arc::new(models);
        self
    }
}

/// Transport limits applied as middleware
#[derive(Debug, Clone, Copy)]
pub struct RouterLimits {
    pub max_body_bytes: usize,
    pub request_timeout: Duration,
}

impl RouterLimits {
    /// Limits derived from the orchestrator's image size bound
    pub fn for_state(state: &AppState, request_timeout: Duration) -> Self {
        Self {
            max_body_bytes: state.orchestrator.max_image_bytes() + BODY_LIMIT_SLACK,
            request_timeout,
        }
    }
}

/// Build the HTTP router
///
/// Routes:
/// - `POST /v1/analyze` - raw image bytes in, `AnalysisResult` out
/// - `GET /health` - liveness and provider availability
pub fn create_app(state: AppState, limits: RouterLimits) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/v1/analyze", post(analyze_handler))
        .fallback(fallback_handler)
        .layer(DefaultBodyLimit::max(limits.max_body_bytes))
        .layer(TimeoutLayer::new(limits.request_timeout))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn fallback_handler(uri: Uri) -> impl IntoResponse {
    ApiError::NotFound(format!("No route for {}", uri.path()))
}
