// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Node configuration
//!
//! Sources, lowest precedence first: built-in defaults, an optional TOML
//! file, environment variables, then command-line flags (applied by the
//! binary).

use serde::{Deserialize, Serialize};
use std::env;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::vision::image_utils::DEFAULT_MAX_IMAGE_SIZE;
use crate::vision::VisionModelConfig;

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {name}: {value}")]
    InvalidEnv { name: String, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Full node configuration
#[derive(Debug, Clone, PartialEq)]
pub struct NodeConfig {
    /// HTTP listen address
    pub listen_addr: String,
    /// Whole-request timeout enforced by the transport
    pub request_timeout_secs: u64,
    /// Largest accepted image body
    pub max_image_bytes: usize,
    pub vision: VisionModelConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            max_image_bytes: DEFAULT_MAX_IMAGE_SIZE,
            vision: VisionModelConfig::default(),
        }
    }
}

/// `[server]` table of the config file
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
struct ServerSection {
    listen_addr: Option<String>,
    request_timeout_secs: Option<u64>,
    max_image_bytes: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
struct FileConfig {
    server: ServerSection,
    vision: VisionModelConfig,
}

impl NodeConfig {
    /// Load from a TOML file with `[server]` and `[vision]` tables
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let file: FileConfig = toml::from_str(content)?;
        let defaults = Self::default();

        Ok(Self {
            listen_addr: file.server.listen_addr.unwrap_or(defaults.listen_addr),
            request_timeout_secs: file
                .server
                .request_timeout_secs
                .unwrap_or(defaults.request_timeout_secs),
            max_image_bytes: file
                .server
                .max_image_bytes
                .unwrap_or(defaults.max_image_bytes),
            vision: file.vision,
        })
    }

    /// Defaults overridden by environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_overrides(|name| env::var(name).ok())
    }

    /// Apply environment-style overrides from `lookup`
    ///
    /// Recognized names: `API_LISTEN_ADDR`, `REQUEST_TIMEOUT_SECS`,
    /// `MAX_IMAGE_BYTES`, `OCR_MODEL_DIR`, `CLASSIFIER_MODEL_DIR`,
    /// `CLASSIFIER_TOP_K`, `ENABLE_CONTOURS`, `ENABLE_FEATURE_PRINT`.
    /// An empty model directory disables that model.
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(addr) = lookup("API_LISTEN_ADDR") {
            self.listen_addr = addr;
        }
        if let Some(v) = lookup("REQUEST_TIMEOUT_SECS") {
            self.request_timeout_secs = parse_var("REQUEST_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = lookup("MAX_IMAGE_BYTES") {
            self.max_image_bytes = parse_var("MAX_IMAGE_BYTES", &v)?;
        }
        if let Some(dir) = lookup("OCR_MODEL_DIR") {
            self.vision.ocr_model_dir = (!dir.is_empty()).then(|| PathBuf::from(dir));
        }
        if let Some(dir) = lookup("CLASSIFIER_MODEL_DIR") {
            self.vision.classifier_model_dir = (!dir.is_empty()).then(|| PathBuf::from(dir));
        }
        if let Some(v) = lookup("CLASSIFIER_TOP_K") {
            self.vision.classifier_top_k = parse_var("CLASSIFIER_TOP_K", &v)?;
        }
        if let Some(v) = lookup("ENABLE_CONTOURS") {
            self.vision.enable_contours = v.to_lowercase() != "false";
        }
        if let Some(v) = lookup("ENABLE_FEATURE_PRINT") {
            self.vision.enable_feature_print = v.to_lowercase() != "false";
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.listen_addr.trim().is_empty() {
            return Err(ConfigError::Invalid("listen address is empty".to_string()));
        }
        if self.listen_addr.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::Invalid(format!(
                "listen address '{}' is not host:port",
                self.listen_addr
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "request timeout must be greater than 0".to_string(),
            ));
        }
        if self.max_image_bytes == 0 {
            return Err(ConfigError::Invalid(
                "max image size must be greater than 0".to_string(),
            ));
        }
        if self.vision.classifier_top_k == 0 {
            return Err(ConfigError::Invalid(
                "classifier top-k must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        name: name.to_string(),
        value: value.to_string(),
    })
}
