use std::future::Future;

use rand::Rng as _;

/// Retry decision returned by the error classifier callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryAction {
    Retry,
    Abort,
}

/// Attempt budget plus exponential backoff with jitter between attempts.
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    pub base_delay_secs: u64,
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_secs: 1,
            max_delay_secs: 30,
        }
    }
}

impl RetryConfig {
    /// Compute the delay before retry number `retry` (0-indexed).
    ///
    /// Formula: `min(base_delay * 2^retry, max_delay) + random_jitter(0..base_delay)`
    pub fn delay_for_retry(&self, retry: u32) -> std::time::Duration {
        let exp_delay = self
            .base_delay_secs
            .saturating_mul(1u64.checked_shl(retry).unwrap_or(u64::MAX));
        let capped = exp_delay.min(self.max_delay_secs);
        let jitter = if self.base_delay_secs > 0 {
            rand::thread_rng().gen_range(0..self.base_delay_secs)
        } else {
            0
        };
        std::time::Duration::from_secs(capped + jitter)
    }
}

/// Run `operation` up to `config.max_attempts` times and return the first
/// `Ok`.
///
/// On exhaustion the error from the *first* attempt is returned; errors
/// from later attempts are logged and dropped. A systemic problem (bad
/// key, unknown user) shows up on the first attempt, while later failures
/// tend to be noise. `classifier` may cut the loop short with `Abort`,
/// which still reports the first error.
pub async fn retry_with_backoff<F, Fut, T, E, C>(
    config: &RetryConfig,
    classifier: C,
    operation: F,
) -> Result<T, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    C: Fn(&E) -> RetryAction,
    E: std::fmt::Display,
{
    let total_attempts = config.max_attempts.max(1);

    let first_err = match operation().await {
        Ok(val) => return Ok(val),
        Err(e) => e,
    };
    if classifier(&first_err) == RetryAction::Abort || total_attempts == 1 {
        return Err(first_err);
    }

    for attempt in 1..total_attempts {
        let delay = config.delay_for_retry(attempt - 1);
        tracing::warn!(
            "Attempt {}/{} failed, retrying in {}s: {}",
            attempt,
            total_attempts,
            delay.as_secs(),
            first_err
        );
        tokio::time::sleep(delay).await;

        match operation().await {
            Ok(val) => {
                tracing::debug!("Succeeded on attempt {}/{}", attempt + 1, total_attempts);
                return Ok(val);
            }
            Err(e) => {
                tracing::debug!(
                    "Attempt {}/{} failed (not reported): {}",
                    attempt + 1,
                    total_attempts,
                    e
                );
                if classifier(&e) == RetryAction::Abort {
                    break;
                }
            }
        }
    }

    Err(first_err)
}

/// Classifier for calls where every failure is worth another attempt.
pub fn always_retry<E>(_: &E) -> RetryAction {
    RetryAction::Retry
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn no_delay(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            base_delay_secs: 0,
            max_delay_secs: 0,
        }
    }

    #[test]
    fn test_default_config() {
        let config = RetryConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.base_delay_secs, 1);
        assert_eq!(config.max_delay_secs, 30);
    }

    #[test]
    fn test_delay_exponential_backoff() {
        let config = RetryConfig {
            max_attempts: 5,
            base_delay_secs: 2,
            max_delay_secs: 60,
        };
        let d = config.delay_for_retry(0);
        assert!(d.as_secs() >= 2 && d.as_secs() < 4);

        let d = config.delay_for_retry(1);
        assert!(d.as_secs() >= 4 && d.as_secs() < 6);

        let d = config.delay_for_retry(2);
        assert!(d.as_secs() >= 8 && d.as_secs() < 10);
    }

    #[test]
    fn test_delay_capped_at_max() {
        let config = RetryConfig {
            max_attempts: 10,
            base_delay_secs: 5,
            max_delay_secs: 30,
        };
        let d = config.delay_for_retry(10);
        assert!(d.as_secs() >= 30 && d.as_secs() < 35);
    }

    #[test]
    fn test_delay_zero_base() {
        assert_eq!(no_delay(3).delay_for_retry(0).as_secs(), 0);
    }

    #[tokio::test]
    async fn test_succeeds_first_try() {
        let result: Result<i32, String> =
            retry_with_backoff(&no_delay(3), always_retry, || async { Ok(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_succeeds_after_two_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let cc = calls.clone();
        let result: Result<i32, String> = retry_with_backoff(&no_delay(3), always_retry, || {
            let cc = cc.clone();
            async move {
                let n = cc.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(format!("transient {n}"))
                } else {
                    Ok(99)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 99);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhausted_reports_first_error_only() {
        let calls = Arc::new(AtomicU32::new(0));
        let cc = calls.clone();
        let result: Result<i32, String> = retry_with_backoff(&no_delay(3), always_retry, || {
            let cc = cc.clone();
            async move {
                let n = cc.fetch_add(1, Ordering::SeqCst);
                Err(format!("failure #{}", n + 1))
            }
        })
        .await;
        assert_eq!(result.unwrap_err(), "failure #1");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_abort_on_first_attempt_stops_immediately() {
        let calls = Arc::new(AtomicU32::new(0));
        let cc = calls.clone();
        let result: Result<i32, String> = retry_with_backoff(
            &no_delay(3),
            |_| RetryAction::Abort,
            || {
                let cc = cc.clone();
                async move {
                    cc.fetch_add(1, Ordering::SeqCst);
                    Err("fatal".to_string())
                }
            },
        )
        .await;
        assert_eq!(result.unwrap_err(), "fatal");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_abort_on_later_attempt_still_reports_first_error() {
        let calls = Arc::new(AtomicU32::new(0));
        let cc = calls.clone();
        let result: Result<i32, String> = retry_with_backoff(
            &no_delay(5),
            |e: &String| {
                if e == "permanent" {
                    RetryAction::Abort
                } else {
                    RetryAction::Retry
                }
            },
            || {
                let cc = cc.clone();
                async move {
                    let n = cc.fetch_add(1, Ordering::SeqCst);
                    if n == 0 {
                        Err("transient".to_string())
                    } else {
                        Err("permanent".to_string())
                    }
                }
            },
        )
        .await;
        assert_eq!(result.unwrap_err(), "transient");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_zero_attempts_still_runs_once() {
        let calls = Arc::new(AtomicU32::new(0));
        let cc = calls.clone();
        let result: Result<i32, String> = retry_with_backoff(&no_delay(0), always_retry, || {
            let cc = cc.clone();
            async move {
                cc.fetch_add(1, Ordering::SeqCst);
                Err("nope".to_string())
            }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
