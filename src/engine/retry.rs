use crate::config::{Backoff, RetryConfig};
use crate::error::ExecutionError;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

/// Outcome of one execute attempt
#[derive(Debug)]
pub enum Attempt<T> {
    Success(T),
    /// Worth another try if the budget allows
    Retryable(ExecutionError),
    /// Stop now: no further attempts, no fallback
    Fatal(ExecutionError),
}

impl<T> From<Result<T, ExecutionError>> for Attempt<T> {
    fn from(result: Result<T, ExecutionError>) -> Self {
        match result {
            Ok(value) => Attempt::Success(value),
            Err(e) if e.is_retryable() => Attempt::Retryable(e),
            Err(e) => Attempt::Fatal(e),
        }
    }
}

/// Passed to every attempt so execute can adapt (e.g. add a correction prompt)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttemptInfo {
    /// 1-based
    pub number: u32,
    pub previous_error: Option<String>,
}

impl AttemptInfo {
    pub fn first() -> Self {
        Self {
            number: 1,
            previous_error: None,
        }
    }

    pub fn is_retry(&self) -> bool {
        self.number > 1
    }
}

#[derive(Debug)]
pub enum RetryFailure {
    Exhausted { attempts: u32, error: ExecutionError },
    Fatal { attempts: u32, error: ExecutionError },
}

/// Wait after failed attempt number `retry_number`
fn delay_before(policy: &RetryConfig, retry_number: u32) -> Duration {
    match policy.backoff {
        Backoff::Fixed => Duration::from_millis(policy.wait_ms),
        Backoff::Exponential => {
            if policy.wait_ms == 0 {
                return Duration::ZERO;
            }
            // base * 2^(n-1) + random(0..base)
            let factor = 1u64
                .checked_shl(retry_number.saturating_sub(1))
                .unwrap_or(u64::MAX);
            let jitter = rand::random::<u64>() % policy.wait_ms;
            Duration::from_millis(
                policy
                    .wait_ms
                    .saturating_mul(factor)
                    .saturating_add(jitter),
            )
        }
    }
}

/// Run `operation` until it succeeds, fails fatally, or the attempt budget
/// (`max_retries + 1`) is spent.
pub async fn retry_with_backoff<F, Fut, T>(
    policy: &RetryConfig,
    label: &str,
    mut operation: F,
) -> Result<(T, u32), RetryFailure>
where
    F: FnMut(AttemptInfo) -> Fut,
    Fut: Future<Output = Attempt<T>>,
{
    let total = policy.total_attempts();
    let budget = policy.timeout();
    let mut info = AttemptInfo::first();

    loop {
        let attempt = match budget {
            Some(limit) => match timeout(limit, operation(info.clone())).await {
                Ok(attempt) => attempt,
                Err(_) => Attempt::Retryable(ExecutionError::Timeout(limit)),
            },
            None => operation(info.clone()).await,
        };

        let error = match attempt {
            Attempt::Success(value) => {
                if info.is_retry() {
                    debug!("{} succeeded on attempt {}", label, info.number);
                }
                return Ok((value, info.number));
            }
            Attempt::Fatal(error) => {
                warn!("{} failed fatally on attempt {}: {}", label, info.number, error);
                return Err(RetryFailure::Fatal {
                    attempts: info.number,
                    error,
                });
            }
            Attempt::Retryable(error) => error,
        };

        if info.number >= total {
            warn!("{}: all {} attempts failed: {}", label, total, error);
            return Err(RetryFailure::Exhausted {
                attempts: info.number,
                error,
            });
        }

        let delay = delay_before(policy, info.number);
        warn!(
            "{}: attempt {} failed: {}. Retrying in {:?}...",
            label, info.number, error, delay
        );
        if delay > Duration::ZERO {
            sleep(delay).await;
        }

        info = AttemptInfo {
            number: info.number + 1,
            previous_error: Some(error.to_string()),
        };
    }
}
