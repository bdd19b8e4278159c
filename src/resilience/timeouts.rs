//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap each upstream attempt with its own deadline
//! - Cancel the in-flight attempt when the deadline passes
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities; dropping the future aborts the call
//! - The deadline belongs to one attempt, never to the whole request
//! - Timeout errors are distinct from other errors

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

/// The attempt did not finish before its deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("attempt timed out after {}ms", .0.as_millis())]
pub struct DeadlineExceeded(pub Duration);

/// Run `fut` to completion or give up after `limit`.
pub async fn with_deadline<F, T>(limit: Duration, fut: F) -> Result<T, DeadlineExceeded>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| DeadlineExceeded(limit))
}
