// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::http_server::AppState;
use crate::version::VERSION_NUMBER;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderStatus {
    pub name: String,
    pub kind: String,
    pub available: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub providers: Vec<ProviderStatus>,
    /// Capabilities with no provider registered (e.g. "faces"); their fields
    /// never appear in analysis results
    #[serde(default)]
    pub unregistered: Vec<String>,
}

impl HealthResponse {
    /// Built-in providers (loaded or not) followed by any other registered
    /// provider
    pub fn from_state(state: &AppState) -> Self {
        let mut providers: Vec<ProviderStatus> = state
            .models
            .iter()
            .map(|m| ProviderStatus {
                name: m.name.clone(),
                kind: m.kind.clone(),
                available: m.available,
            })
            .collect();

        for (kind, name) in state.orchestrator.providers().enabled() {
            if !providers.iter().any(|p| p.name == name) {
                providers.push(ProviderStatus {
                    name: name.to_string(),
                    kind: kind.as_str().to_string(),
                    available: true,
                });
            }
        }

        let status = if providers.iter().any(|p| p.available) {
            "ok"
        } else {
            "degraded"
        };

        let unregistered = state
            .orchestrator
            .providers()
            .unregistered()
            .into_iter()
            .map(|kind| kind.as_str().to_string())
            .collect();

        Self {
            status: status.to_string(),
            version: VERSION_NUMBER.to_string(),
            providers,
            unregistered,
        }
    }
}

/// GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::from_state(&state))
}
