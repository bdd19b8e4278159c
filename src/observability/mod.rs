//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Handlers and the upstream caller produce:
//!     → logging.rs (structured log events, request ID fields)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout
//!     → Metrics endpoint (Prometheus scrape, opt-in)
//! ```

pub mod logging;
pub mod metrics;
