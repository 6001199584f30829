//! Retry with exponential backoff for calls to external collaborators.

use std::{future::Future, time::Duration};

/// Backoff configuration.
///
/// Defaults: 3 retries, 100ms initial delay, doubling, capped at 5s.
#[derive(Clone, Debug, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: usize,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// A policy that tries once and never waits.
    #[must_use]
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            multiplier: 1.0,
        }
    }

    /// Delay before retry number `attempt` (0-based), capped at `max_delay`.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: usize) -> Duration {
        if attempt == 0 {
            return self.initial_delay.min(self.max_delay);
        }
        let factor = self.multiplier.powi(i32::try_from(attempt).unwrap_or(i32::MAX));
        let delay_ms = self.initial_delay.as_millis() as f64 * factor;
        if !delay_ms.is_finite() || delay_ms >= self.max_delay.as_millis() as f64 {
            return self.max_delay;
        }
        Duration::from_millis(delay_ms as u64)
    }
}

/// Run `operation` until it succeeds or the policy is exhausted.
///
/// Returns the last error on exhaustion. The operation must be idempotent.
pub async fn retry_with_backoff<F, Fut, T, E>(policy: &RetryPolicy, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    tracing::debug!(attempt, "operation succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) => {
                if attempt >= policy.max_retries {
                    return Err(err);
                }
                let delay = policy.delay_for_attempt(attempt);
                tracing::debug!(attempt, ?delay, "operation failed, retrying: {err}");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn delay_grows_and_caps() {
        let policy = RetryPolicy {
            max_retries: 10,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(500),
            multiplier: 2.0,
        };
        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(400));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(500));
        assert_eq!(policy.delay_for_attempt(60), Duration::from_millis(500));
    }

    #[tokio::test]
    async fn retries_until_success() {
        let calls = AtomicUsize::new(0);
        let policy = RetryPolicy {
            max_retries: 3,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            multiplier: 1.0,
        };

        let calls = &calls;
        let result: Result<usize, String> = retry_with_backoff(&policy, move || async move {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < 2 { Err(format!("fail {n}")) } else { Ok(n) }
        })
        .await;

        assert_eq!(result, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_with_last_error() {
        let calls = AtomicUsize::new(0);
        let counter = &calls;
        let result: Result<(), String> = retry_with_backoff(&RetryPolicy::no_retry(), move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err("down".to_string())
        })
        .await;

        assert_eq!(result, Err("down".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
