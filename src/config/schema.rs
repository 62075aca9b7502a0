//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::host::Retention;

/// Root configuration for the gray proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Where admitted requests are forwarded.
    pub upstream: UpstreamConfig,

    /// Gray classification and correlation settings.
    pub filter: FilterConfig,

    /// Admission control settings.
    pub rate_limit: RateLimitConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Upstream configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Upstream address (e.g., "127.0.0.1:3000").
    pub address: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:3000".to_string(),
        }
    }
}

/// Which correlation store backs the filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreMode {
    /// One map per worker; no cross-worker consistency.
    #[default]
    Local,
    /// Host shared data with compare-and-swap, visible to all workers.
    Shared,
}

/// Gray filter configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Header carrying the correlation key. Env override: `TraceType`.
    pub trace_header: String,

    /// JSON rule groups, e.g. `[[{"header_key":"x-user"}]]`. Env override: `GrayHeader`.
    pub gray_header: String,

    /// Header set by an upstream hop that already tagged the request.
    pub marker_header: String,

    /// Correlation store backing.
    pub store: StoreMode,

    /// Number of extension contexts (one per simulated host worker).
    pub workers: usize,

    /// Maximum keys held by a correlation store (per worker in local mode).
    pub store_max_entries: usize,

    /// Seconds a correlation entry lives after it was last written.
    pub store_ttl_secs: u64,
}

impl FilterConfig {
    /// Retention applied to every correlation store.
    pub fn retention(&self) -> Retention {
        Retention::new(self.store_max_entries, Duration::from_secs(self.store_ttl_secs))
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            trace_header: "X-B3-Traceid".to_string(),
            gray_header: String::new(),
            marker_header: "gray".to_string(),
            store: StoreMode::Local,
            workers: 4,
            store_max_entries: 100_000,
            store_ttl_secs: 600,
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Permits granted per window, per worker.
    pub capacity: u32,

    /// Window length in milliseconds.
    pub refill_interval_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            capacity: 100,
            refill_interval_ms: 1000,
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
