//! Conflict retry
//!
//! Re-runs an operation that failed with `PersistenceConflict`. A conflict
//! means the unit of work rolled back, so running it again cannot apply the
//! movement twice. Every other error is returned on first sight.

use std::future::Future;
use std::time::Duration;

use rand::Rng;

use super::MovementError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one (at least 1)
    pub max_attempts: u32,
    /// Delay before the second attempt; grows linearly
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Backoff before attempt `attempt + 1`, with up to 50% jitter
    fn delay_for(&self, attempt: u32) -> Duration {
        let base = self.base_delay.checked_mul(attempt).unwrap_or(self.base_delay);
        let jitter_ms = u64::try_from(base.as_millis()).unwrap_or(u64::MAX) / 2;
        if jitter_ms == 0 {
            return base;
        }
        base.saturating_add(Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms)))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(50))
    }
}

/// Run `operation` until it succeeds, fails terminally, or attempts run out.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, mut operation: F) -> Result<T, MovementError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, MovementError>>,
{
    let mut attempt = 1;
    loop {
        match operation().await {
            Err(e) if e.is_retryable() && attempt < policy.max_attempts => {
                let delay = policy.delay_for(attempt);
                tracing::warn!(
                    error = %e,
                    delay_ms = %delay.as_millis(),
                    "Persistence conflict, retrying (attempt {}/{})",
                    attempt + 1,
                    policy.max_attempts
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            result => return result,
        }
    }
}
