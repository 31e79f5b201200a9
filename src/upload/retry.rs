//! Bounded retry with exponential backoff
//!
//! The loop owns all retry state. Each attempt is a function of its number
//! only; nothing is carried from one attempt to the next.

use crate::config::schema::UploadConfig;
use crate::error::{PkgflowError, PkgflowResult};
use crate::upload::response::{UploadOutcome, UploadReceipt};
use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

/// Attempt budget and timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Delay after the first failure; doubles after each further failure
    pub base_delay: Duration,
    /// Hard limit for a single attempt
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            attempt_timeout: Duration::from_secs(10 * 60),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &UploadConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_secs(config.base_delay_secs),
            attempt_timeout: Duration::from_secs(config.attempt_timeout_secs),
        }
    }

    /// Delay before attempt `attempt + 1`: `base * 2^(attempt - 1)`
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_delay.saturating_mul(1u32 << exponent)
    }
}

/// Run `attempt` until it succeeds, fails fatally, or the budget is spent.
///
/// When the budget is spent the error carries the last attempt's reason.
pub async fn run<F, Fut>(policy: &RetryPolicy, mut attempt: F) -> PkgflowResult<UploadReceipt>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = UploadOutcome>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut last = String::new();

    for n in 1..=max_attempts {
        match attempt(n).await {
            UploadOutcome::Success(receipt) => return Ok(receipt),
            UploadOutcome::FatalFailure(err) => return Err(err),
            UploadOutcome::RetryableFailure { reason } => {
                warn!("Attempt {}/{} failed: {}", n, max_attempts, reason);
                last = reason;
            }
        }

        if n < max_attempts {
            let delay = policy.delay_after(n);
            info!("Retrying in {}s...", delay.as_secs_f64());
            tokio::time::sleep(delay).await;
        }
    }

    Err(PkgflowError::UploadExhausted {
        attempts: max_attempts,
        last,
    })
}
