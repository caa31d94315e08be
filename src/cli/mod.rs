// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use clap::Parser;
use std::path::PathBuf;

use crate::config::{ConfigError, NodeConfig};

/// Fabstir Vision Node
#[derive(Parser, Debug)]
#[command(name = "fabstir-vision-node")]
#[command(version = crate::version::VERSION_NUMBER)]
#[command(about = "HTTP image analysis node", long_about = None)]
pub struct Args {
    /// TOML config file with [server] and [vision] tables
    #[arg(long, env = "VISION_NODE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Listen address, overrides config and environment
    #[arg(long)]
    pub listen: Option<String>,

    /// Whole-request timeout in seconds
    #[arg(long)]
    pub request_timeout_secs: Option<u64>,
}

impl Args {
    /// Resolve the final configuration: file (or defaults), then
    /// environment, then flags
    pub fn load_config(&self) -> Result<NodeConfig, ConfigError> {
        let base = match &self.config {
            Some(path) => NodeConfig::from_file(path)?,
            None => NodeConfig::default(),
        };
        let config = base.with_overrides(|name| std::env::var(name).ok())?;
        let config = self.apply(config);
        config.validate()?;
        Ok(config)
    }

    /// Apply command-line overrides
    pub fn apply(&self, mut config: NodeConfig) -> NodeConfig {
        if let Some(listen) = &self.listen {
            config.listen_addr = listen.clone();
        }
        if let Some(secs) = self.request_timeout_secs {
            config.request_timeout_secs = secs;
        }
        config
    }
}
