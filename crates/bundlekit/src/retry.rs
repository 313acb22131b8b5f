//! Retry logic with exponential backoff for transient network errors.

use crate::error::Result;
use std::thread;
use std::time::Duration;

/// How often and how patiently to retry network operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
}

impl RetryPolicy {
    /// Create a policy.
    pub fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay,
        }
    }

    /// Never retry.
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Delay before retry number `attempt` (0-indexed), doubling each time.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.initial_delay.saturating_mul(2_u32.saturating_pow(attempt))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(2))
    }
}

/// Run `operation`, retrying while it fails with a retryable error.
///
/// Non-retryable errors and the final failure are returned unchanged.
pub fn with_retry<T, F>(policy: &RetryPolicy, what: &str, mut operation: F) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    let mut attempt = 0;
    loop {
        match operation() {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt + 1 < policy.max_attempts => {
                let delay = policy.delay_for_attempt(attempt);
                attempt += 1;
                log::warn!(
                    "{what} failed (attempt {attempt}/{}): {e}. Retrying in {}s",
                    policy.max_attempts,
                    delay.as_secs()
                );
                thread::sleep(delay);
            }
            Err(e) => return Err(e),
        }
    }
}
