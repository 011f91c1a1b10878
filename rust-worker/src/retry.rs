//! Retry with backoff, shared by the document verifier and downloader.
//!
//! Delays are real-time sleeps. There is no cancellation: once started, a
//! retry loop runs until success or until its attempt budget is spent.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::debug;

/// Upper bound for a single backoff delay.
const MAX_DELAY: Duration = Duration::from_secs(300);

/// Shape of the delay between attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    /// `attempt × step` after the n-th failed attempt.
    Linear { step: Duration },
    /// `initial × multiplier^(attempt - 1)` after the n-th failed attempt.
    Exponential { initial: Duration, multiplier: f64 },
}

impl Backoff {
    /// Delay to wait after the given failed attempt (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let attempt = attempt.max(1);
        let delay = match *self {
            Backoff::Linear { step } => step.saturating_mul(attempt),
            Backoff::Exponential {
                initial,
                multiplier,
            } => {
                let exponent = i32::try_from(attempt - 1).unwrap_or(i32::MAX);
                let secs = initial.as_secs_f64() * multiplier.powi(exponent);
                Duration::try_from_secs_f64(secs).unwrap_or(MAX_DELAY)
            }
        };
        delay.min(MAX_DELAY)
    }
}

/// Attempt budget plus backoff shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Sleep for the backoff delay that follows `attempt`.
    pub async fn wait(&self, attempt: u32) {
        let delay = self.backoff.delay_after(attempt);
        debug!(
            attempt = attempt,
            delay_ms = delay.as_millis() as u64,
            "retry_backoff_sleep"
        );
        sleep(delay).await;
    }

    /// Total time spent sleeping if every attempt fails.
    pub fn worst_case_wait(&self) -> Duration {
        (1..self.max_attempts)
            .map(|attempt| self.backoff.delay_after(attempt))
            .sum()
    }
}

/// Run `op` until it succeeds or the policy's attempts are spent.
///
/// `op` receives the 1-based attempt number. The error of the final attempt
/// is returned on exhaustion; no sleep follows the final attempt.
pub async fn retry<T, E, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) if attempt >= policy.max_attempts => return Err(err),
            Err(_) => {
                policy.wait(attempt).await;
                attempt += 1;
            }
        }
    }
}
