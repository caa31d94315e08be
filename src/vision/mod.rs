// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image analysis pipeline
//!
//! This module provides:
//! - Shared geometry and observation types (normalized, bottom-left origin)
//! - The provider contract and built-in CPU/ONNX providers
//! - The orchestrator that fans a request out to every provider and merges
//!   their results
//! - Reading-order reconstruction for recognized text

pub mod geometry;
pub mod image_utils;
pub mod model_manager;
pub mod observations;
pub mod orchestrator;
pub mod providers;
pub mod reading_order;
pub mod result;

pub use geometry::{NormalizedPoint, NormalizedRect};
pub use image_utils::{decode_image_bytes, detect_format, DecodedImage, ImageError, ImageInfo};
pub use model_manager::{VisionModelConfig, VisionModelInfo, VisionModelManager};
pub use observations::*;
pub use orchestrator::{AnalysisRun, Orchestrator, ProviderOutcomes};
pub use providers::{Detector, ProviderError, ProviderKind, ProviderOutcome, ProviderSet};
pub use reading_order::reconstruct;
pub use result::{AnalysisResult, ImageInfoResponse, Timestamper};
