//! Bounded retry with exponential backoff
//!
//! [`retry_with_backoff`] runs an async operation until it succeeds, fails
//! with a non-transient error, or uses up `max_attempts` tries. Whether an
//! error is worth retrying is decided by the error itself through
//! [`Retryable`].

use std::fmt;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Errors that know whether another attempt could succeed
pub trait Retryable {
    fn is_transient(&self) -> bool;

    /// Server-requested delay before the next attempt, if any
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

/// Attempt budget and backoff curve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total tries, including the first; values below 1 behave as 1
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_delay,
        }
    }

    /// Delay after `attempt` (1-based) failed: `base * 2^(attempt - 1)`, capped
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(5, Duration::from_millis(500), Duration::from_secs(30))
    }
}

/// Terminal failure of a retried operation
#[derive(Debug)]
pub struct RetryError<E> {
    /// Attempts made before giving up
    pub attempts: u32,
    /// Error from the final attempt
    pub source: E,
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (after {} attempt{})",
            self.source,
            self.attempts,
            if self.attempts == 1 { "" } else { "s" }
        )
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for RetryError<E> {}

/// Run `op` under `policy`.
///
/// `op` receives the 1-based attempt number. Transient errors are retried
/// after the backoff delay (or the server's `Retry-After`, capped at
/// `max_delay`); any other error ends the loop immediately.
pub async fn retry_with_backoff<T, E, F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    mut op: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + fmt::Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;

        match op(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(operation, attempt, "Succeeded after retry");
                }
                return Ok(value);
            },
            Err(err) if err.is_transient() && attempt < max_attempts => {
                let delay = err
                    .retry_after()
                    .map(|d| d.min(policy.max_delay))
                    .unwrap_or_else(|| policy.delay_for(attempt));

                warn!(
                    operation,
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Transient failure, backing off"
                );
                tokio::time::sleep(delay).await;
            },
            Err(err) => {
                return Err(RetryError {
                    attempts: attempt,
                    source: err,
                });
            },
        }
    }
}
