//! Bounded retries for source reads.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Backoff strategy for retries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// Fixed delay between retries
    Fixed,
    /// Exponential backoff: base * 2^(attempt - 1)
    #[default]
    Exponential,
    /// Linear backoff: base * attempt
    Linear,
}

/// Retry policy for reads against the event and reference stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Maximum number of retries after the first attempt (0 = no retries)
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub strategy: BackoffStrategy,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 100,
            max_delay_ms: 2_000,
            strategy: BackoffStrategy::Exponential,
        }
    }
}

impl RetryPolicy {
    /// Create a policy with no retries.
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Create a policy with fixed delays.
    pub fn fixed(max_retries: u32, delay: Duration) -> Self {
        let ms = delay.as_millis() as u64;
        Self {
            max_retries,
            base_delay_ms: ms,
            max_delay_ms: ms,
            strategy: BackoffStrategy::Fixed,
        }
    }

    /// Delay before retry number `attempt` (1-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let delay_ms = match self.strategy {
            BackoffStrategy::Fixed => self.base_delay_ms,
            BackoffStrategy::Exponential => {
                let factor = 1u64.checked_shl(attempt - 1).unwrap_or(u64::MAX);
                self.base_delay_ms.saturating_mul(factor)
            }
            BackoffStrategy::Linear => self.base_delay_ms.saturating_mul(u64::from(attempt)),
        };

        Duration::from_millis(delay_ms.min(self.max_delay_ms))
    }

    /// Run `op`, retrying transient failures up to `max_retries` times.
    pub fn run<T, E>(
        &self,
        operation: &str,
        is_transient: impl Fn(&E) -> bool,
        mut op: impl FnMut() -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: core::fmt::Display,
    {
        let mut attempt = 0;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(err) if attempt < self.max_retries && is_transient(&err) => {
                    attempt += 1;
                    let delay = self.delay_for_attempt(attempt);
                    tracing::warn!(
                        operation,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "read failed; retrying"
                    );
                    std::thread::sleep(delay);
                }
                Err(err) => return Err(err),
            }
        }
    }
}
