//! Bounded retry with linear backoff and fallback substitution.
//!
//! Only network-class errors are retried. The delay before attempt `n + 1`
//! is `base_delay * n`.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{QueryError, Result};

// == Retry Policy ==
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Upper bound on total attempts, including the first
    pub max_attempts: u32,
    /// Delay unit for linear backoff
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// Attempts actually made; a zero budget still makes one attempt.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(1_000))
    }
}

// == Retry Outcome ==
/// Result of a retried operation that did not propagate an error.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryOutcome<V> {
    /// The operation returned a value
    Succeeded { value: V, attempts: u32 },
    /// Every attempt failed with a network-class error and the fallback was used
    FellBack {
        value: V,
        attempts: u32,
        last_error: QueryError,
    },
}

impl<V> RetryOutcome<V> {
    pub fn is_degraded(&self) -> bool {
        matches!(self, RetryOutcome::FellBack { .. })
    }

    pub fn attempts(&self) -> u32 {
        match self {
            RetryOutcome::Succeeded { attempts, .. } | RetryOutcome::FellBack { attempts, .. } => {
                *attempts
            }
        }
    }

    pub fn into_value(self) -> V {
        match self {
            RetryOutcome::Succeeded { value, .. } | RetryOutcome::FellBack { value, .. } => value,
        }
    }
}

// == With Retry ==
/// Runs `operation` until it succeeds, fails with a non-network error, or the
/// attempt budget runs out.
///
/// Non-network errors propagate unmodified on first occurrence. On exhaustion
/// the `fallback` is returned as [`RetryOutcome::FellBack`] when supplied,
/// otherwise the last error propagates.
pub async fn with_retry<V, F, Fut>(
    policy: &RetryPolicy,
    fallback: Option<V>,
    mut operation: F,
) -> Result<RetryOutcome<V>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<V>>,
{
    let max_attempts = policy.attempts();
    let mut attempt = 0;

    let last_error = loop {
        attempt += 1;
        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(attempt, "operation succeeded after retry");
                }
                return Ok(RetryOutcome::Succeeded {
                    value,
                    attempts: attempt,
                });
            }
            Err(err) if !err.is_transient() => return Err(err),
            Err(err) if attempt >= max_attempts => break err,
            Err(err) => {
                let delay = policy.delay_after(attempt);
                warn!(
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "transient failure, retrying"
                );
                tokio::time::sleep(delay).await;
            }
        }
    };

    match fallback {
        Some(value) => {
            warn!(attempts = attempt, error = %last_error, "retries exhausted, using fallback data");
            Ok(RetryOutcome::FellBack {
                value,
                attempts: attempt,
                last_error,
            })
        }
        None => Err(last_error),
    }
}
