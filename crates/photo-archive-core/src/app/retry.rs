//! Retry policy: decides backoff delays for conflicting writes.

use std::time::Duration;

/// Upper bound of a single backoff delay.
pub const MAX_DELAY: Duration = Duration::from_secs(30);

/// Exponential backoff: `delay = base_delay * multiplier^(attempt - 1)`.
///
/// Only used where a retry is known to be safe (merging into a record that
/// another writer changed underneath us). Upstream outages are not retried
/// here; they fail the invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub base_delay: Duration,
    pub multiplier: f64,
    /// Total attempts including the first one.
    pub max_attempts: u32,
}

impl RetryPolicy {
    /// No waiting between attempts (tests).
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            base_delay: Duration::ZERO,
            multiplier: 1.0,
            max_attempts,
        }
    }

    /// Delay before the attempt that follows `attempts` failed ones (1-indexed).
    ///
    /// Example with base_delay=2s, multiplier=2.0:
    /// - after attempt 1: 2s
    /// - after attempt 2: 4s
    /// - after attempt 3: 8s
    ///
    /// Capped at [`MAX_DELAY`]; a product that is not a valid duration
    /// (negative, NaN, overflow) also yields the cap.
    pub fn next_delay(&self, attempts: u32) -> Duration {
        let exponent = i32::try_from(attempts.saturating_sub(1)).unwrap_or(i32::MAX);
        let delay_secs = self.base_delay.as_secs_f64() * self.multiplier.powi(exponent);
        Duration::try_from_secs_f64(delay_secs)
            .unwrap_or(MAX_DELAY)
            .min(MAX_DELAY)
    }

    pub fn should_retry(&self, attempts: u32) -> bool {
        attempts < self.max_attempts
    }
}
