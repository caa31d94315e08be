// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{Context, Result};
use clap::Parser;
use fabstir_vision_node::{
    api::{ApiConfig, ApiServer, AppState},
    cli::Args,
    version,
    vision::{Orchestrator, Timestamper, VisionModelManager},
};
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = args.load_config().context("Invalid configuration")?;

    info!("🚀 Starting {}", version::get_version_string());
    info!("📦 BUILD VERSION: {}", version::VERSION);

    let manager = VisionModelManager::new(config.vision.clone()).await?;
    let orchestrator = Orchestrator::new(manager.provider_set(), Timestamper::system())
        .with_max_image_bytes(config.max_image_bytes);
    let unregistered = orchestrator
        .providers()
        .unregistered()
        .iter()
        .map(|kind| kind.as_str())
        .collect::<Vec<_>>();
    if !unregistered.is_empty() {
        info!(
            "No provider registered for: [{}] (fields stay absent)",
            unregistered.join(", ")
        );
    }
    let state = AppState::new(orchestrator).with_models(manager.list_models());

    let server = ApiServer::new(ApiConfig::from(&config), state).await?;
    let addr = server.local_addr();

    info!("✅ Vision node ready");
    info!("  Analyze: POST http://{}/v1/analyze", addr);
    info!("  Health:  GET  http://{}/health", addr);
    info!("  curl --data-binary @photo.jpg http://{}/v1/analyze", addr);

    signal::ctrl_c().await?;

    info!("⏹️  Shutting down...");
    server.shutdown().await;
    info!("👋 Goodbye!");
    Ok(())
}
