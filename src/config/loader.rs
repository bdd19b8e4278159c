//! Configuration loading from disk and the process environment.

use std::fs;
use std::net::SocketAddr;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::RelayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable holding the upstream API key.
pub const ENV_API_KEY: &str = "OPENROUTER_API_KEY";
/// Environment variable overriding the listener port.
pub const ENV_PORT: &str = "PORT";
pub const ENV_UPSTREAM_URL: &str = "RELAY_UPSTREAM_URL";
pub const ENV_DEFAULT_MODEL: &str = "RELAY_DEFAULT_MODEL";
pub const ENV_LOG_LEVEL: &str = "RELAY_LOG_LEVEL";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {name}: {value:?}")]
    Env { name: &'static str, value: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse a TOML file into a configuration, without validating it.
pub fn load_config(path: &Path) -> Result<RelayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse TOML text into a configuration, without validating it.
pub fn parse_config(content: &str) -> Result<RelayConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Apply environment overrides using the given lookup.
///
/// The lookup is injected so callers decide where values come from; the
/// binary passes `std::env::var`.
pub fn apply_env_overrides<F>(config: &mut RelayConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(key) = lookup(ENV_API_KEY) {
        config.upstream.api_key = Some(key);
    }

    if let Some(port) = lookup(ENV_PORT) {
        let parsed: u16 = port.trim().parse().map_err(|_| ConfigError::Env {
            name: ENV_PORT,
            value: port.clone(),
        })?;
        config.listener.bind_address = with_port(&config.listener.bind_address, parsed);
    }

    if let Some(url) = lookup(ENV_UPSTREAM_URL) {
        config.upstream.endpoint = url;
    }

    if let Some(model) = lookup(ENV_DEFAULT_MODEL) {
        config.upstream.default_model = model;
    }

    if let Some(level) = lookup(ENV_LOG_LEVEL) {
        config.observability.log_level = level;
    }

    Ok(())
}

/// Replace the port of a bind address, keeping its host part.
pub fn with_port(bind_address: &str, port: u16) -> String {
    match bind_address.parse::<SocketAddr>() {
        Ok(mut addr) => {
            addr.set_port(port);
            addr.to_string()
        }
        Err(_) => format!("0.0.0.0:{}", port),
    }
}

/// Full startup sequence: defaults or file, then environment, then validation.
pub fn load<F>(path: Option<&Path>, lookup: F) -> Result<RelayConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match path {
        Some(path) => load_config(path)?,
        None => RelayConfig::default(),
    };

    apply_env_overrides(&mut config, lookup)?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}
