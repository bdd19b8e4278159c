//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the relay.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the relay.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RelayConfig {
    /// Listener configuration (bind address, connection hints).
    pub listener: ListenerConfig,

    /// Upstream chat-completions endpoint and payload defaults.
    pub upstream: UpstreamConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Retry configuration.
    pub retries: RetryConfig,

    /// Cross-origin policy applied to every response.
    pub cors: CorsConfig,

    /// How upstream replies are re-packaged for the client.
    pub responses: ResponseConfig,

    /// Inbound request limits.
    pub security: SecurityConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,

    /// Ask clients to close the connection after each response.
    pub close_connections: bool,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            close_connections: true,
        }
    }
}

/// Upstream API configuration.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Chat-completions URL. Never taken from the inbound request.
    pub endpoint: String,

    /// Secret bearer key. Usually supplied through `OPENROUTER_API_KEY`.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Model used when the client does not name one.
    pub default_model: String,

    pub default_max_tokens: u32,

    pub default_temperature: f64,

    /// Prompt used when the client sends none.
    pub default_prompt: String,

    /// Optional `HTTP-Referer` attribution header.
    pub referer: Option<String>,

    /// Optional `X-Title` attribution header.
    pub title: Option<String>,

    /// TCP connect timeout in milliseconds.
    pub connect_timeout_ms: u64,
}

impl UpstreamConfig {
    /// The configured key, ignoring blank values.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }
}

impl std::fmt::Debug for UpstreamConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key().map(|_| "<redacted>"))
            .field("default_model", &self.default_model)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("default_temperature", &self.default_temperature)
            .field("default_prompt", &self.default_prompt)
            .field("referer", &self.referer)
            .field("title", &self.title)
            .field("connect_timeout_ms", &self.connect_timeout_ms)
            .finish()
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://openrouter.ai/api/v1/chat/completions".to_string(),
            api_key: None,
            default_model: "openai/gpt-4o-mini".to_string(),
            default_max_tokens: 300,
            default_temperature: 0.2,
            default_prompt: "Hello".to_string(),
            referer: None,
            title: None,
            connect_timeout_ms: 10_000,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Deadline for a single upstream attempt in milliseconds.
    pub attempt_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { attempt_ms: 60_000 }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Additional attempts after the first one (0 disables retries).
    pub retry_budget: u32,

    /// Linear backoff step: the n-th retry waits `n * backoff_step_ms`.
    pub backoff_step_ms: u64,

    /// Extra random delay as a fraction of the step delay (0.0 = none).
    pub jitter_ratio: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            retry_budget: 1,
            backoff_step_ms: 300,
            jitter_ratio: 0.0,
        }
    }
}

/// How the `Access-Control-Allow-Origin` value is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CorsMode {
    /// Echo origins found in `allowed_origins` with credentials.
    #[default]
    Allowlist,
    /// Always answer `*`, never with credentials.
    Wildcard,
    /// Echo whatever origin the browser sent, with credentials.
    Echo,
}

/// What an allowlist miss resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OriginFallback {
    #[default]
    Wildcard,
    /// Emit no allow-origin header, so the browser blocks the response.
    Deny,
}

/// Cross-origin configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    pub mode: CorsMode,

    /// Exact origins accepted in `allowlist` mode.
    pub allowed_origins: Vec<String>,

    pub fallback: OriginFallback,

    pub allow_methods: Vec<String>,

    /// Fixed header allow-list, used when the browser does not ask for any.
    pub allow_headers: Vec<String>,

    /// Echo `Access-Control-Request-Headers` back on preflight.
    pub mirror_request_headers: bool,

    pub expose_headers: Vec<String>,

    /// `Access-Control-Max-Age` for preflight answers.
    pub max_age_secs: Option<u64>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            mode: CorsMode::Allowlist,
            allowed_origins: Vec::new(),
            fallback: OriginFallback::Wildcard,
            allow_methods: vec!["GET".into(), "POST".into(), "OPTIONS".into()],
            allow_headers: vec![
                "Content-Type".into(),
                "Authorization".into(),
                "Accept".into(),
                "X-Requested-With".into(),
            ],
            mirror_request_headers: true,
            expose_headers: vec!["Content-Type".into(), "X-Request-Id".into()],
            max_age_secs: Some(600),
        }
    }
}

/// Shape of non-2xx upstream replies sent to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPassthrough {
    /// Upstream status and body, unchanged.
    #[default]
    Raw,
    /// Upstream status with a JSON envelope carrying the upstream body.
    Json,
}

/// Body sent for a 2xx upstream reply with an empty body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EmptySuccess {
    /// `{"ok": true, "raw": ""}`
    #[default]
    Envelope,
    /// `null`
    Null,
}

/// Response classification settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ResponseConfig {
    pub error_passthrough: ErrorPassthrough,

    /// Characters of an HTML (or failed) upstream body kept in error envelopes.
    pub html_preview_chars: usize,

    pub empty_success: EmptySuccess,
}

impl Default for ResponseConfig {
    fn default() -> Self {
        Self {
            error_passthrough: ErrorPassthrough::Raw,
            html_preview_chars: 1500,
            empty_success: EmptySuccess::Envelope,
        }
    }
}

/// Inbound request limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 1024 * 1024, // 1MB
        }
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
