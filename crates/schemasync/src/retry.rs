//! Retry policy with exponential backoff.
//!
//! Every suspension point of a run (connect, health check, extraction,
//! statement execution) goes through [`RetryPolicy::run`]. Each attempt is
//! bounded by the operation timeout, and both the attempt and the backoff
//! sleep race the run's cancellation token.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use schemasync_core::error::{Result, SyncError};

/// How failed operations are retried.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub base_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
    /// Growth factor between consecutive delays.
    pub multiplier: f64,
    /// Bound on a single attempt.
    pub operation_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            operation_timeout: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// A policy that tries once.
    #[must_use]
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Sets the attempt budget. Zero is treated as one.
    #[must_use]
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Sets the base delay.
    #[must_use]
    pub fn base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Sets the delay cap.
    #[must_use]
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the backoff multiplier.
    #[must_use]
    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Sets the per-attempt timeout.
    #[must_use]
    pub fn operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    /// Delay to wait after failed attempt number `attempt` (1-based):
    /// `base * multiplier^(attempt - 1)`, capped at `max_delay`.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if self.base_delay.is_zero() {
            return Duration::ZERO;
        }
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let factor = self.multiplier.max(1.0).powi(exponent);
        Duration::try_from_secs_f64(self.base_delay.as_secs_f64() * factor)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }

    /// Runs `operation` until it succeeds, fails with a non-recoverable
    /// error, runs out of attempts, or `cancel` fires.
    ///
    /// A non-recoverable error is returned as is after one attempt. When the
    /// budget is exhausted the last error is returned with an `attempts`
    /// context entry. Cancellation, before or during an attempt or during a
    /// backoff sleep, yields an interruption error and stops retrying.
    pub async fn run<T, F, Fut>(
        &self,
        name: &str,
        cancel: &CancellationToken,
        mut operation: F,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            if cancel.is_cancelled() {
                return Err(interrupted(name, attempt));
            }

            let outcome = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(interrupted(name, attempt)),
                outcome = tokio::time::timeout(self.operation_timeout, operation()) => outcome,
            };

            let err = match outcome {
                Ok(Ok(value)) => {
                    if attempt > 1 {
                        debug!(operation = name, attempt, "Operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Ok(Err(err)) => err,
                Err(_) => SyncError::timeout(format!(
                    "{name} timed out after {:?}",
                    self.operation_timeout
                ))
                .with_context("operation", name),
            };

            if !err.is_recoverable() {
                return Err(err);
            }
            if attempt >= max_attempts {
                warn!(operation = name, attempts = attempt, error = %err, "Giving up");
                return Err(err.with_context("attempts", attempt));
            }

            let delay = self.delay_for(attempt);
            warn!(
                operation = name,
                attempt,
                max_attempts,
                ?delay,
                error = %err,
                "Recoverable failure, retrying"
            );

            tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(interrupted(name, attempt)),
                () = tokio::time::sleep(delay) => {}
            }
            attempt += 1;
        }
    }
}

fn interrupted(name: &str, attempt: u32) -> SyncError {
    SyncError::interruption(format!("{name} was cancelled"))
        .with_context("operation", name)
        .with_context("attempt", attempt)
}
