//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{body::Body, http::HeaderMap, http::Request, routing::any, Router};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use gray_proxy::config::ProxyConfig;
use gray_proxy::host::ManualClock;
use gray_proxy::http::with_gray_filter;
use gray_proxy::WorkerPool;

/// Header the echo upstream uses to report the `gray` headers it received.
pub const SEEN_GRAY: &str = "x-upstream-saw-gray";

/// An in-process upstream that echoes every `gray` request header back, comma-joined.
async fn echo(request: Request<Body>) -> (HeaderMap, &'static str) {
    let mut headers = HeaderMap::new();
    let seen: Vec<&str> = request
        .headers()
        .get_all("gray")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect();
    if !seen.is_empty() {
        headers.insert(SEEN_GRAY, seen.join(",").parse().unwrap());
    }
    (headers, "ok")
}

/// Build the filtered router and its pool around a manual clock.
pub fn filtered_app(config: &ProxyConfig) -> (Router, Arc<WorkerPool>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    let pool = Arc::new(WorkerPool::with_clock(config, clock.clone()));
    let router = Router::new()
        .route("/", any(echo))
        .route("/{*path}", any(echo));
    (with_gray_filter(router, pool.clone()), pool, clock)
}

/// Build a GET request with the given headers.
pub fn request(headers: &[(&str, &str)]) -> Request<Body> {
    let mut builder = Request::builder().uri("/orders");
    for (k, v) in headers {
        builder = builder.header(*k, *v);
    }
    builder.body(Body::empty()).unwrap()
}

/// Flatten response headers for assertions.
pub fn header_map(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or_default().to_string()))
        .collect()
}

/// Start a simple mock backend that returns a fixed response.
pub async fn start_mock_backend(addr: SocketAddr, response: &'static str) {
    start_slow_backend(addr, response, Duration::ZERO).await;
}

/// Start a mock backend that waits `delay` before each reply.
pub async fn start_slow_backend(addr: SocketAddr, response: &'static str, delay: Duration) {
    let listener = TcpListener::bind(addr).await.unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        // Drain the request head before replying.
                        let mut buf = Vec::new();
                        let mut chunk = [0u8; 1024];
                        while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                            match socket.read(&mut chunk).await {
                                Ok(0) | Err(_) => break,
                                Ok(n) => buf.extend_from_slice(&chunk[..n]),
                            }
                        }
                        tokio::time::sleep(delay).await;
                        let response_str = format!(
                            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            response.len(),
                            response
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                    });
                }
                Err(_) => break,
            }
        }
    });
}
