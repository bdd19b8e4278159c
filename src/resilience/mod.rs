//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Upstream attempt:
//!     → timeouts.rs (per-attempt deadline)
//!     → On 5xx / transport error / timeout: retries.rs (budget check)
//!     → backoff.rs (linear delay before the next attempt)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every upstream attempt has a deadline
//! - Retry budget is small and fixed per request
//! - 4xx replies are final

pub mod backoff;
pub mod retries;
pub mod timeouts;

pub use retries::{is_retryable_status, RetryPolicy};
pub use timeouts::{with_deadline, DeadlineExceeded};
