// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod cli;
pub mod config;
pub mod version;
pub mod vision;

pub use config::{ConfigError, NodeConfig};
pub use vision::{AnalysisResult, Orchestrator, ProviderSet, Timestamper};
