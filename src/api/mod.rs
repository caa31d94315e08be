// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod analyze;
pub mod errors;
pub mod handlers;
pub mod http_server;
pub mod server;

pub use analyze::{analyze_handler, AnalyzeResponse};
pub use errors::{ApiError, ErrorResponse};
pub use handlers::{health_handler, HealthResponse, ProviderStatus};
pub use http_server::{create_app, AppState, RouterLimits};
pub use server::{ApiConfig, ApiServer};
