//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (capacity, interval, workers, store bounds all > 0)
//! - Check addresses parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Rule JSON is not validated here; the classifier degrades it to an empty set

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::ProxyConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Check a configuration, collecting every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("invalid socket address {:?}", config.listener.bind_address),
        ));
    }
    if config.upstream.address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "upstream.address",
            format!("invalid socket address {:?}", config.upstream.address),
        ));
    }
    if config.filter.trace_header.trim().is_empty() {
        errors.push(ValidationError::new("filter.trace_header", "must not be empty"));
    }
    if config.filter.workers == 0 {
        errors.push(ValidationError::new("filter.workers", "must be at least 1"));
    }
    if config.filter.store_max_entries == 0 {
        errors.push(ValidationError::new("filter.store_max_entries", "must be at least 1"));
    }
    if config.filter.store_ttl_secs == 0 {
        errors.push(ValidationError::new("filter.store_ttl_secs", "must be greater than 0"));
    }
    if config.rate_limit.capacity == 0 {
        errors.push(ValidationError::new("rate_limit.capacity", "must be at least 1"));
    }
    if config.rate_limit.refill_interval_ms == 0 {
        errors.push(ValidationError::new(
            "rate_limit.refill_interval_ms",
            "must be greater than 0",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
