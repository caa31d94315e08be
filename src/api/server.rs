// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::http_server::{create_app, AppState, RouterLimits};
use crate::config::NodeConfig;

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub listen_addr: String,
    pub request_timeout: Duration,
    /// How long `shutdown` waits for in-flight requests
    pub shutdown_timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
            request_timeout: Duration::from_secs(30),
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

impl From<&NodeConfig> for ApiConfig {
    fn from(config: &NodeConfig) -> Self {
        Self {
            listen_addr: config.listen_addr.clone(),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
            ..Self::default()
        }
    }
}

/// HTTP server running in a background task
pub struct ApiServer {
    addr: SocketAddr,
    config: ApiConfig,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl ApiServer {
    /// Bind the listener and start serving
    ///
    /// Binding happens before this returns, so `local_addr` reports the real
    /// port when listening on port 0.
    pub async fn new(config: ApiConfig, state: AppState) -> Result<Self> {
        let addr: SocketAddr = config
            .listen_addr
            .parse()
            .with_context(|| format!("Invalid listen address {}", config.listen_addr))?;

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;
        let actual_addr = listener.local_addr()?;

        let limits = RouterLimits::for_state(&state, config.request_timeout);
        let app = create_app(state, limits);
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            let serve_future = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            });

            if let Err(e) = serve_future.await {
                warn!("HTTP server stopped with error: {}", e);
            }
        });

        info!("API server listening on {}", actual_addr);

        Ok(Self {
            addr: actual_addr,
            config,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stop accepting connections and wait for in-flight requests
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            if tokio::time::timeout(self.config.shutdown_timeout, handle)
                .await
                .is_err()
            {
                warn!(
                    "Server did not drain within {:?}",
                    self.config.shutdown_timeout
                );
            }
        }
        info!("API server on {} stopped", self.addr);
    }
}
