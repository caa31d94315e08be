// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Analysis API endpoint module
//!
//! Provides POST /v1/analyze for running every registered provider on an image.

pub mod handler;
pub mod response;

pub use handler::analyze_handler;
pub use response::AnalyzeResponse;
