//! Linear backoff with optional jitter.

use std::time::Duration;
use rand::Rng;

/// Delay before retry number `attempt` (1-based): `attempt * step_ms`.
///
/// `jitter_ratio` adds up to that fraction of the delay on top, drawn at
/// random. A ratio of zero gives exact, reproducible delays.
pub fn linear_backoff(attempt: u32, step_ms: u64, jitter_ratio: f64) -> Duration {
    if attempt == 0 {
        return Duration::from_millis(0);
    }

    let delay_ms = step_ms.saturating_mul(u64::from(attempt));

    let jitter_range = (delay_ms as f64 * jitter_ratio.clamp(0.0, 1.0)) as u64;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(delay_ms + jitter)
}
