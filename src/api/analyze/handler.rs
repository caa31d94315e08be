// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Analysis endpoint handler

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::{debug, warn};

use super::response::AnalyzeResponse;
use crate::api::errors::ApiError;
use crate::api::http_server::{AppState, BODY_LIMIT_SLACK};

/// POST /v1/analyze - Analyze an image with every registered provider
///
/// # Request
/// Raw encoded image bytes (PNG, JPEG, WebP, GIF, BMP, TIFF) as the body.
/// The content type is not inspected.
///
/// # Response
/// An `AnalysisResult` JSON document:
/// - `success`, `timestamp` always
/// - `imageInfo` and one field per completed provider on success
/// - `error` when the image could not be decoded
///
/// # Errors
/// - 400 Bad Request: undecodable image (body is still an `AnalysisResult`)
/// - 413 Payload Too Large: body over the configured limit
pub async fn analyze_handler(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let body = match body {
        Ok(body) => body,
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            let limit = state.orchestrator.max_image_bytes() + BODY_LIMIT_SLACK;
            warn!("Rejected oversized analysis body (limit {} bytes)", limit);
            return ApiError::PayloadTooLarge { limit }.into_response();
        }
        Err(rejection) => {
            warn!("Failed to read analysis body: {}", rejection.body_text());
            return ApiError::InvalidRequest(rejection.body_text()).into_response();
        }
    };

    debug!("Analysis request received: {} bytes", body.len());
    let result = state.orchestrator.analyze(&body).await;
    AnalyzeResponse(result).into_response()
}
