//! Retry logic.
//!
//! # Responsibilities
//! - Decide whether an upstream outcome is worth another attempt
//! - Bound the number of attempts per inbound request
//! - Compute the delay before each retry
//!
//! # Design Decisions
//! - Connection errors and timeouts always retryable; 5xx retryable
//! - 4xx never retried, they reach the client unchanged
//! - The identical payload is re-sent; nothing is cached across requests

use std::time::Duration;

use crate::config::RetryConfig;
use crate::resilience::backoff::linear_backoff;

/// Per-request retry policy derived from configuration.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    retry_budget: u32,
    step_ms: u64,
    jitter_ratio: f64,
}

impl RetryPolicy {
    pub fn new(config: &RetryConfig) -> Self {
        Self {
            retry_budget: config.retry_budget,
            step_ms: config.backoff_step_ms,
            jitter_ratio: config.jitter_ratio,
        }
    }

    /// Total attempts allowed, including the first.
    pub fn max_attempts(&self) -> u32 {
        self.retry_budget.saturating_add(1)
    }

    /// Whether another attempt may follow attempt number `attempt` (1-based).
    pub fn has_budget(&self, attempt: u32) -> bool {
        attempt < self.max_attempts()
    }

    /// Delay before the retry that follows attempt number `attempt`.
    pub fn delay(&self, attempt: u32) -> Duration {
        linear_backoff(attempt, self.step_ms, self.jitter_ratio)
    }
}

/// Whether an upstream status should be retried.
pub fn is_retryable_status(status: u16) -> bool {
    status >= 500
}
