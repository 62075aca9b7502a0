//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ProxyConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Env key holding the JSON rule groups.
pub const ENV_GRAY_HEADER: &str = "GrayHeader";
/// Env key naming the correlation key header.
pub const ENV_TRACE_TYPE: &str = "TraceType";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file, then apply env overrides.
pub fn load_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let mut config: ProxyConfig = toml::from_str(&content)?;

    apply_env_overrides(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Apply `GrayHeader` / `TraceType` from the process environment.
pub fn apply_env_overrides(config: &mut ProxyConfig) {
    apply_overrides_from(config, |key| std::env::var(key).ok());
}

/// Apply overrides from an arbitrary lookup. Empty values are ignored.
pub fn apply_overrides_from<F>(config: &mut ProxyConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(rules) = lookup(ENV_GRAY_HEADER).filter(|v| !v.trim().is_empty()) {
        config.filter.gray_header = rules;
    }
    if let Some(header) = lookup(ENV_TRACE_TYPE).filter(|v| !v.trim().is_empty()) {
        config.filter.trace_header = header;
    }
}
