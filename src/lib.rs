//! LLM chat relay library.
//!
//! Receives chat requests from a browser frontend, normalizes them into a
//! chat-completions payload, forwards them upstream with a server-held key
//! and relays the answer back with CORS headers.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod relay;
pub mod resilience;

pub use config::schema::RelayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
