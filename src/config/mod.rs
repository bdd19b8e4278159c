//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! optional config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → loader.rs (environment overrides: key, port, endpoint)
//!     → validation.rs (semantic checks)
//!     → RelayConfig (validated, immutable)
//!     → cloned into the server state at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; request handling never reads the environment
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load, ConfigError};
pub use schema::{
    CorsConfig, CorsMode, EmptySuccess, ErrorPassthrough, ListenerConfig, ObservabilityConfig,
    OriginFallback, RelayConfig, ResponseConfig, RetryConfig, SecurityConfig, TimeoutConfig,
    UpstreamConfig,
};
