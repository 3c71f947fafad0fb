//! Exponential backoff retry for transient backend failures.

use std::time::Duration;
use tracing::{debug, warn};

/// Errors that can tell whether a retry might succeed.
pub trait Retryable: std::fmt::Display {
    /// Whether the failure is transient (network, timeout, rate limit, 5xx).
    fn is_retryable(&self) -> bool;

    /// Server-provided delay hint in seconds (e.g. `Retry-After`).
    fn retry_after_secs(&self) -> Option<u64> {
        None
    }
}

impl Retryable for crate::error::BackendError {
    fn is_retryable(&self) -> bool {
        self.is_transient()
    }
}

/// Retry policy configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts (0 = no retries).
    pub max_retries: u32,
    /// Base delay in seconds for exponential backoff.
    pub base_delay_secs: u64,
    /// Maximum delay cap in seconds.
    pub max_delay_secs: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_secs: 1,
            max_delay_secs: 30,
        }
    }
}

impl RetryPolicy {
    /// Create a new retry policy. The delay cap defaults to 30 seconds.
    #[must_use]
    pub fn new(max_retries: u32, base_delay_secs: u64) -> Self {
        Self {
            max_retries,
            base_delay_secs,
            max_delay_secs: 30,
        }
    }

    /// A policy that never retries.
    #[must_use]
    pub fn none() -> Self {
        Self::new(0, 0)
    }

    /// Whether the error should be retried at the given attempt number.
    #[must_use]
    pub fn should_retry<E: Retryable>(&self, attempt: u32, error: &E) -> bool {
        attempt < self.max_retries && error.is_retryable()
    }

    /// Delay before the next attempt.
    ///
    /// A server-provided hint is used directly (capped at `max_delay_secs`);
    /// otherwise `min(base_delay_secs * 2^attempt, max_delay_secs)`.
    #[must_use]
    pub fn delay_for<E: Retryable>(&self, attempt: u32, error: &E) -> Duration {
        let secs = match error.retry_after_secs() {
            Some(hint) => hint.min(self.max_delay_secs),
            None => self
                .base_delay_secs
                .saturating_mul(2u64.saturating_pow(attempt))
                .min(self.max_delay_secs),
        };
        Duration::from_secs(secs)
    }

    /// Execute an async operation with retry.
    ///
    /// `f` is called until it succeeds, fails with a non-retryable error, or
    /// the retry budget is exhausted; the last error is returned in both
    /// failure cases.
    pub async fn execute<F, Fut, T, E>(&self, operation_name: &str, mut f: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
        E: Retryable,
    {
        let mut attempt: u32 = 0;
        loop {
            match f().await {
                Ok(value) => {
                    if attempt > 0 {
                        debug!(
                            operation = operation_name,
                            attempt = attempt + 1,
                            "Operation succeeded after retries"
                        );
                    }
                    return Ok(value);
                }
                Err(error) => {
                    if !self.should_retry(attempt, &error) {
                        if attempt > 0 && error.is_retryable() {
                            warn!(
                                operation = operation_name,
                                attempts = attempt + 1,
                                error = %error,
                                "Max retries exceeded"
                            );
                        }
                        return Err(error);
                    }

                    let delay = self.delay_for(attempt, &error);
                    debug!(
                        operation = operation_name,
                        attempt = attempt + 1,
                        max_retries = self.max_retries,
                        delay_secs = delay.as_secs(),
                        error = %error,
                        "Retrying after transient error"
                    );

                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
