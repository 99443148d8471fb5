//! Bounded retry for IAM propagation delays.
//!
//! A role can take several seconds after creation before CodeBuild or
//! CodePipeline will accept it. The services signal this with
//! `InvalidInputException` / `InvalidStructureException`; nothing else is
//! retried.

use std::future::Future;
use std::time::Duration;

use pipewright_types::{AwsError, AwsResult};

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 12,
            base_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Exponential backoff for a 1-based attempt number, capped at
    /// `max_delay`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        let delay = self.base_delay.saturating_mul(1u32 << shift);
        delay.min(self.max_delay)
    }
}

/// Run `op`, retrying propagation-delay errors with backoff until it
/// succeeds, fails with a different error, or the attempt budget runs out.
///
/// # Errors
///
/// Non-propagation errors pass through untouched. Exhaustion returns
/// [`AwsError::RetriesExhausted`] wrapping the last propagation error.
pub async fn retry_on_propagation<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    mut op: F,
) -> AwsResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AwsResult<T>>,
{
    let mut attempt = 1u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_propagation_delay() => {
                if attempt >= policy.max_attempts {
                    return Err(AwsError::RetriesExhausted {
                        attempts: attempt,
                        last: Box::new(err),
                    });
                }
                let delay = policy.backoff(attempt);
                tracing::info!(
                    operation,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Waiting for IAM propagation before retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
