//! Gray proxy.
//!
//! Fronts one upstream, tags gray (canary) traffic and keeps every request of a
//! traced transaction in the same cohort, and rate limits per worker.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http server ──▶ gray filter (worker N, round-robin)
//!                                       │ classifier: rules + marker header
//!                                       │ correlation store: local | shared (CAS)
//!                                       │ admission: fixed window ──▶ 429
//!                                       ▼
//!     Client Response              proxy_handler ──▶ Upstream
//!     ◀────────────── diagnostic headers ◀──────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use gray_proxy::config::{apply_env_overrides, load_config, ProxyConfig};
use gray_proxy::observability::{logging, metrics};
use gray_proxy::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "gray-proxy")]
#[command(about = "Gray traffic tagging proxy with per-worker rate limiting", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let (config, load_error) = match &cli.config {
        Some(path) => match load_config(path) {
            Ok(config) => (config, None),
            Err(e) => {
                let mut config = ProxyConfig::default();
                apply_env_overrides(&mut config);
                (config, Some((path.clone(), e)))
            }
        },
        None => {
            let mut config = ProxyConfig::default();
            apply_env_overrides(&mut config);
            (config, None)
        }
    };

    logging::init_logging(&config.observability);
    tracing::info!("gray-proxy v{} starting", env!("CARGO_PKG_VERSION"));

    if let Some((path, e)) = load_error {
        tracing::error!(path = ?path, error = %e, "Failed to load configuration; using defaults");
    }

    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.address,
        store = ?config.filter.store,
        workers = config.filter.workers,
        capacity = config.rate_limit.capacity,
        refill_interval_ms = config.rate_limit.refill_interval_ms,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;

    let shutdown = Shutdown::new();
    let shutdown_rx = shutdown.subscribe();
    shutdown.trigger_on_ctrl_c();

    let server = HttpServer::new(config);
    server.run(listener, shutdown_rx).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
