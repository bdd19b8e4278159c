//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, ratios in range)
//! - Check that CORS values can become header values
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RelayConfig → Result<(), Vec<ValidationError>>
//! - A missing API key is not an error here; requests report it instead

use std::net::SocketAddr;

use axum::http::{HeaderName, HeaderValue, Method};
use thiserror::Error;
use url::Url;

use crate::config::schema::RelayConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address {0:?} is not a socket address")]
    BindAddress(String),

    #[error("upstream.endpoint {0:?} is not an http(s) URL")]
    Endpoint(String),

    #[error("upstream.default_temperature {0} is outside [0, 2]")]
    Temperature(f64),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("retries.jitter_ratio {0} is outside [0, 1]")]
    JitterRatio(f64),

    #[error("cors.{field} entry {value:?} is not valid")]
    Cors { field: &'static str, value: String },

    #[error("observability.metrics_address {0:?} is not a socket address")]
    MetricsAddress(String),
}

/// Check a configuration, collecting every problem found.
pub fn validate_config(config: &RelayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }

    match Url::parse(&config.upstream.endpoint) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        _ => errors.push(ValidationError::Endpoint(config.upstream.endpoint.clone())),
    }

    let temperature = config.upstream.default_temperature;
    if !(0.0..=2.0).contains(&temperature) {
        errors.push(ValidationError::Temperature(temperature));
    }

    if config.timeouts.attempt_ms == 0 {
        errors.push(ValidationError::Zero("timeouts.attempt_ms"));
    }
    if config.responses.html_preview_chars == 0 {
        errors.push(ValidationError::Zero("responses.html_preview_chars"));
    }
    if config.security.max_body_size == 0 {
        errors.push(ValidationError::Zero("security.max_body_size"));
    }

    let jitter = config.retries.jitter_ratio;
    if !(0.0..=1.0).contains(&jitter) {
        errors.push(ValidationError::JitterRatio(jitter));
    }

    let cors = &config.cors;
    for origin in &cors.allowed_origins {
        if HeaderValue::from_str(origin).is_err() {
            errors.push(ValidationError::Cors { field: "allowed_origins", value: origin.clone() });
        }
    }
    for method in &cors.allow_methods {
        if Method::from_bytes(method.as_bytes()).is_err() {
            errors.push(ValidationError::Cors { field: "allow_methods", value: method.clone() });
        }
    }
    for (field, names) in [("allow_headers", &cors.allow_headers), ("expose_headers", &cors.expose_headers)] {
        for name in names {
            if HeaderName::from_bytes(name.as_bytes()).is_err() {
                errors.push(ValidationError::Cors { field, value: name.clone() });
            }
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(config.observability.metrics_address.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
