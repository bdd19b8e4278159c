//! HTTP middleware.

pub mod cors;

pub use cors::{ingress_filter, CorsPolicy, OriginDecision};
