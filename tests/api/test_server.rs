// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Live server tests
//!
//! Binds an `ApiServer` on an ephemeral port and drives it over plain TCP.

use fabstir_vision_node::{
    api::{ApiConfig, ApiServer, AppState},
    vision::{providers::ContourDetector, Orchestrator, ProviderSet, Timestamper},
};
use futures::future::join_all;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

fn test_config() -> ApiConfig {
    ApiConfig {
        listen_addr: "127.0.0.1:0".to_string(),
        request_timeout: Duration::from_secs(10),
        shutdown_timeout: Duration::from_secs(5),
    }
}

fn test_state() -> AppState {
    let providers = ProviderSet::new().with_contours(ContourDetector::new());
    AppState::new(Orchestrator::new(providers, Timestamper::system()))
}

/// Helper: PNG with one dark square on a light background
fn square_png() -> Vec<u8> {
    let image = RgbImage::from_fn(32, 32, |x, y| {
        if (8..16).contains(&x) && (8..16).contains(&y) {
            Rgb([0, 0, 0])
        } else {
            Rgb([255, 255, 255])
        }
    });
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(image)
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

/// Helper: send one HTTP/1.1 request and return (status, body)
async fn send(addr: SocketAddr, method: &str, path: &str, body: &[u8]) -> (u16, String) {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let head = format!(
        "{} {} HTTP/1.1\r\nHost: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        method,
        path,
        addr,
        body.len()
    );
    stream.write_all(head.as_bytes()).await.unwrap();
    stream.write_all(body).await.unwrap();

    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await.unwrap();
    let text = String::from_utf8_lossy(&raw).to_string();

    let status = text
        .split_whitespace()
        .nth(1)
        .and_then(|code| code.parse().ok())
        .unwrap();
    let body = text
        .split_once("\r\n\r\n")
        .map(|(_, b)| b.to_string())
        .unwrap_or_default();
    (status, body)
}

#[cfg(test)]
mod server_tests {
    use super::*;

    /// Test 1: Server binds an ephemeral port and answers health checks
    #[tokio::test]
    async fn test_server_health() {
        let server = ApiServer::new(test_config(), test_state()).await.unwrap();
        let addr = server.local_addr();
        assert_ne!(addr.port(), 0);

        let (status, body) = send(addr, "GET", "/health", b"").await;
        assert_eq!(status, 200);
        assert!(body.contains("cpu-contours"));

        server.shutdown().await;
    }

    /// Test 2: Concurrent analysis requests are independent
    #[tokio::test]
    async fn test_concurrent_requests() {
        let server = ApiServer::new(test_config(), test_state()).await.unwrap();
        let addr = server.local_addr();
        let png = square_png();

        let requests = (0..8).map(|i| {
            let png = png.clone();
            async move {
                if i % 2 == 0 {
                    send(addr, "POST", "/v1/analyze", &png).await
                } else {
                    send(addr, "POST", "/v1/analyze", &[0u8; 10]).await
                }
            }
        });
        let responses = join_all(requests).await;

        for (i, (status, body)) in responses.into_iter().enumerate() {
            if i % 2 == 0 {
                assert_eq!(status, 200);
                assert!(body.contains("\"contourCount\":1"));
            } else {
                assert_eq!(status, 400);
                assert!(body.contains("\"success\":false"));
            }
        }

        server.shutdown().await;
    }

    /// Test 3: Invalid listen address is a start-up error
    #[tokio::test]
    async fn test_invalid_listen_address() {
        let config = ApiConfig {
            listen_addr: "not-an-address".to_string(),
            ..test_config()
        };
        assert!(ApiServer::new(config, test_state()).await.is_err());
    }
}
