// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Analysis response wrapper

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::vision::AnalysisResult;

/// HTTP form of an [`AnalysisResult`]
///
/// 200 when the image was analyzed, 400 when it could not be decoded. The
/// body is the result JSON in both cases.
#[derive(Debug, Clone)]
pub struct AnalyzeResponse(pub AnalysisResult);

impl AnalyzeResponse {
    pub fn status(&self) -> StatusCode {
        if self.0.success {
            StatusCode::OK
        } else {
            StatusCode::BAD_REQUEST
        }
    }
}

impl IntoResponse for AnalyzeResponse {
    fn into_response(self) -> Response {
        (self.status(), Json(self.0)).into_response()
    }
}
