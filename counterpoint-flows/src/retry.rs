//! Bounded retries with linear backoff.
//!
//! `run` drives one logical call: it invokes the attempt closure, and on
//! failure sleeps `base_delay * attempt` before the next try. The first
//! attempt starts immediately and nothing is slept after the last one. Every
//! per-attempt error is logged and swallowed; only `RetryExhausted` or
//! `Cancelled` reach the caller.

use crate::error::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub const DEFAULT_MAX_ATTEMPTS: usize = 3;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);

/// How many times to try and how long to wait in between
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }
}

impl RetryPolicy {
    pub const fn new(max_attempts: usize, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    #[must_use]
    pub const fn with_max_attempts(mut self, max: usize) -> Self {
        self.max_attempts = max;
        self
    }

    #[must_use]
    pub const fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Delay to sleep after failed attempt `attempt` (1-indexed).
    ///
    /// `None` once the budget is spent.
    pub fn delay_after(&self, attempt: usize) -> Option<Duration> {
        if attempt >= self.max_attempts {
            return None;
        }
        let factor = u32::try_from(attempt).unwrap_or(u32::MAX);
        Some(self.base_delay.saturating_mul(factor))
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(Error::config_invalid("max_attempts must be at least 1")
                .with_operation("retry::validate"));
        }
        Ok(())
    }
}

/// Per-invocation bookkeeping. Lives only as long as one `run` call.
#[derive(Default)]
struct AttemptState {
    attempt: usize,
    last_error: Option<Error>,
}

/// Run `attempt_fn` until it succeeds, the policy is exhausted, or `cancel` fires.
///
/// `attempt_fn` receives the 1-indexed attempt number. `operation` names the
/// call in logs and in the terminal error.
pub async fn run<T, F, Fut>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    operation: &'static str,
    mut attempt_fn: F,
) -> Result<T>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    policy.validate()?;

    let mut state = AttemptState::default();

    loop {
        if cancel.is_cancelled() {
            return Err(Error::cancelled(state.attempt).with_operation(operation));
        }

        state.attempt += 1;
        let attempt = state.attempt;

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(Error::cancelled(attempt).with_operation(operation));
            }
            outcome = attempt_fn(attempt) => outcome,
        };

        let err = match outcome {
            Ok(value) => {
                debug!(operation, attempt, "attempt succeeded");
                return Ok(value);
            }
            Err(err) => err,
        };

        warn!(
            operation,
            attempt,
            max_attempts = policy.max_attempts,
            kind = %err.kind(),
            error = %err.message(),
            "attempt {} failed",
            attempt
        );

        let delay = policy.delay_after(attempt);
        state.last_error = Some(err);

        let Some(delay) = delay else {
            break;
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(Error::cancelled(attempt).with_operation(operation));
            }
            _ = tokio::time::sleep(delay) => {}
        }
    }

    let last = state
        .last_error
        .unwrap_or_else(|| Error::unexpected("retry loop ended without an error"));
    Err(Error::retry_exhausted(state.attempt, last).with_operation(operation))
}
