use std::future::Future;
use std::time::Duration;

use anyhow::{anyhow, Result};
use rand::Rng;
use tracing::warn;

/// Bounds for a retried collaborator call.
#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Base backoff; actual delay is base * 2^attempt plus jitter.
    pub base_delay: Duration,
    /// Per-attempt deadline. A hung call counts as a transient failure.
    pub attempt_timeout: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            attempt_timeout: Duration::from_secs(90),
        }
    }
}

/// Run `op` under `policy`, retrying transient failures with exponential
/// backoff. `is_transient` classifies errors; anything it rejects fails
/// immediately.
pub async fn with_backoff<T, F, Fut>(
    policy: BackoffPolicy,
    label: &str,
    is_transient: impl Fn(&anyhow::Error) -> bool,
    mut op: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut last_error = None;

    for attempt in 0..policy.max_attempts {
        if attempt > 0 {
            let backoff = policy.base_delay * 2u32.pow(attempt - 1);
            let jitter = Duration::from_millis(rand::rng().random_range(0..500));
            tokio::time::sleep(backoff + jitter).await;
        }

        match tokio::time::timeout(policy.attempt_timeout, op()).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(e)) => {
                if !is_transient(&e) {
                    return Err(e);
                }
                warn!(label, attempt = attempt + 1, error = %e, "Transient failure, will retry");
                last_error = Some(e);
            }
            Err(_) => {
                warn!(label, attempt = attempt + 1, "Call timed out, will retry");
                last_error = Some(anyhow!(
                    "{label} timed out after {}s",
                    policy.attempt_timeout.as_secs()
                ));
            }
        }
    }

    Err(last_error
        .unwrap_or_else(|| anyhow!("{label} failed with no attempts"))
        .context(format!(
            "{label} gave up after {} attempts",
            policy.max_attempts
        )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy() -> BackoffPolicy {
        BackoffPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            attempt_timeout: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = with_backoff(fast_policy(), "test", |_| true, || async {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(anyhow!("flaky"))
            } else {
                Ok(42)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_errors_fail_fast() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = with_backoff(fast_policy(), "test", |_| false, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(anyhow!("permanent"))
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhausts_attempts_then_fails() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = with_backoff(fast_policy(), "test", |_| true, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(anyhow!("still flaky"))
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn hung_calls_hit_the_attempt_deadline() {
        let policy = BackoffPolicy {
            max_attempts: 2,
            base_delay: Duration::from_millis(1),
            attempt_timeout: Duration::from_millis(10),
        };
        let result: Result<()> = with_backoff(policy, "test", |_| true, || async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        })
        .await;
        let message = format!("{:#}", result.unwrap_err());
        assert!(message.contains("timed out"), "{message}");
    }
}
