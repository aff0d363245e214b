//! Per-chunk retry policy with exponential backoff.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Re-attempts after the first try of a chunk: 4 attempts in total.
pub const MAX_RETRIES: u32 = 3;

/// Backoff schedule for a single chunk transfer.
///
/// Only the delays are configurable; the attempt budget is always
/// [`MAX_RETRIES`] + 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Delay before the first re-attempt.
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay_ms: 250,
            max_delay_ms: 2_000,
            backoff_factor: 2.0,
        }
    }
}

/// The last error once every attempt has failed.
#[derive(Debug)]
pub struct RetryExhausted<E> {
    pub attempts: u32,
    pub error: E,
}

impl RetryPolicy {
    /// Same retry budget with no delay between attempts.
    pub fn immediate() -> Self {
        Self {
            initial_delay_ms: 0,
            max_delay_ms: 0,
            ..Self::default()
        }
    }

    /// Total attempts allowed, including the first.
    pub fn max_attempts(&self) -> u32 {
        MAX_RETRIES + 1
    }

    /// Delay to wait before re-attempt number `retry` (1-based).
    pub fn delay_for_attempt(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }
        let exp = retry.saturating_sub(1).min(63) as i32;
        let ms = self.initial_delay_ms as f64 * self.backoff_factor.max(1.0).powi(exp);
        let capped = ms.min(self.max_delay_ms as f64).max(0.0);
        Duration::from_millis(capped as u64)
    }

    /// Runs `op` until it succeeds or the attempt budget is spent.
    pub async fn run<T, E, F, Fut>(&self, mut op: F) -> Result<T, RetryExhausted<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let max_attempts = self.max_attempts();
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(attempt, "succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(error) if attempt >= max_attempts => {
                    return Err(RetryExhausted {
                        attempts: attempt,
                        error,
                    });
                }
                Err(error) => {
                    let delay = self.delay_for_attempt(attempt);
                    warn!(
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "attempt failed, retrying"
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    attempt += 1;
                }
            }
        }
    }
}
