//! Retry logic with exponential backoff
//!
//! This module provides the retry layer used by the request executor.
//! Transient failures are retried with exponential backoff and optional
//! jitter; an explicit rate-limit signal switches to a longer backoff base so
//! the credential pool gets time to recover its budget.

use crate::config::RetryConfig;
use crate::error::Error;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Trait for errors that can be classified as retryable or not
///
/// Transient failures (network errors, rate limiting, failed token exchanges,
/// API-reported logical errors) should return `true`. Permanent failures
/// (configuration, database, missing identifiers) should return `false`.
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;

    /// Returns true if the error is an explicit rate-limit signal, which
    /// retries with the longer `rate_limit_delay` backoff base
    fn is_rate_limited(&self) -> bool {
        false
    }
}

impl IsRetryable for Error {
    fn is_retryable(&self) -> bool {
        match self {
            // All transport failures are retried: connection errors, timeouts,
            // and malformed (non-JSON) response bodies all surface here
            Error::Transport(_) => true,
            // Too-many-requests is retried after a longer pause
            Error::RateLimited => true,
            // Login/refresh failure for one credential is recoverable; the
            // next attempt rotates to a different session
            Error::Auth { .. } => true,
            // HTTP 200 with an embedded error field is treated like a
            // transport failure for retry purposes
            Error::Api(_) => true,
            // Permanent failures
            Error::Config { .. } => false,
            Error::Database(_) | Error::Sqlx(_) => false,
            Error::NoCredentials => false,
            Error::Serialization(_) => false,
            Error::Other(_) => false,
        }
    }

    fn is_rate_limited(&self) -> bool {
        matches!(self, Error::RateLimited)
    }
}

/// Execute an async operation with exponential backoff retry logic
///
/// Retries while the error is retryable and attempts remain. A rate-limited
/// error restarts the backoff curve from `config.rate_limit_delay` instead of
/// the current short-delay position. Returns the successful result or the
/// last error once attempts are exhausted — the caller decides whether an
/// exhausted unit is fatal.
pub async fn with_retry<F, Fut, T, E>(config: &RetryConfig, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
{
    let mut attempt = 0;
    let mut delay = config.initial_delay;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    tracing::info!(attempts = attempt + 1, "request succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) if e.is_retryable() && attempt < config.max_attempts => {
                attempt += 1;

                if e.is_rate_limited() {
                    delay = delay.max(config.rate_limit_delay);
                }

                tracing::warn!(
                    error = %e,
                    attempt = attempt,
                    max_attempts = config.max_attempts,
                    delay_ms = delay.as_millis(),
                    "request failed, retrying"
                );

                let jittered_delay = if config.jitter {
                    add_jitter(delay)
                } else {
                    delay
                };

                tokio::time::sleep(jittered_delay).await;

                let next_delay =
                    Duration::from_secs_f64(delay.as_secs_f64() * config.backoff_multiplier);
                delay = next_delay.min(config.max_delay);
            }
            Err(e) => {
                if e.is_retryable() {
                    tracing::error!(
                        error = %e,
                        attempts = attempt + 1,
                        "request failed after all retry attempts exhausted"
                    );
                } else {
                    tracing::error!(error = %e, "request failed with non-retryable error");
                }
                return Err(e);
            }
        }
    }
}

/// Add random jitter to a delay to prevent thundering herd
///
/// Jitter is uniformly distributed between 0% and 100% of the delay, so the
/// actual delay is between `delay` and `2 * delay`.
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    let jittered_secs = delay.as_secs_f64() * (1.0 + jitter_factor);
    Duration::from_secs_f64(jittered_secs)
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug)]
    enum TestError {
        Transient,
        Throttled,
        Permanent,
    }

    impl std::fmt::Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                TestError::Transient => write!(f, "transient error"),
                TestError::Throttled => write!(f, "throttled"),
                TestError::Permanent => write!(f, "permanent error"),
            }
        }
    }

    impl IsRetryable for TestError {
        fn is_retryable(&self) -> bool {
            !matches!(self, TestError::Permanent)
        }

        fn is_rate_limited(&self) -> bool {
            matches!(self, TestError::Throttled)
        }
    }

    fn fast_config() -> RetryConfig {
        RetryConfig {
            max_attempts: 3,
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_secs(1),
            backoff_multiplier: 2.0,
            rate_limit_delay: Duration::from_millis(100),
            jitter: false,
        }
    }

    #[tokio::test]
    async fn success_without_retry_calls_once() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = with_retry(&fast_config(), || {
            let counter = counter_clone.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, TestError>(42)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(counter.load(Ordering::SeqCst), 1, "should only call once");
    }

    #[tokio::test]
    async fn transient_error_retried_until_success() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = with_retry(&fast_config(), || {
            let counter = counter_clone.clone();
            async move {
                let count = counter.fetch_add(1, Ordering::SeqCst);
                if count < 2 {
                    Err(TestError::Transient)
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(
            counter.load(Ordering::SeqCst),
            3,
            "should retry twice before success"
        );
    }

    #[tokio::test]
    async fn retry_exhaustion_returns_last_error() {
        let config = RetryConfig {
            max_attempts: 2,
            ..fast_config()
        };

        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = with_retry(&config, || {
            let counter = counter_clone.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<i32, _>(TestError::Transient)
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(
            counter.load(Ordering::SeqCst),
            3,
            "should try initial + 2 retries"
        );
    }

    #[tokio::test]
    async fn permanent_error_not_retried() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = with_retry(&fast_config(), || {
            let counter = counter_clone.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<i32, _>(TestError::Permanent)
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(
            counter.load(Ordering::SeqCst),
            1,
            "should not retry permanent error"
        );
    }

    #[tokio::test]
    async fn rate_limited_error_uses_longer_delay() {
        let config = RetryConfig {
            max_attempts: 1,
            initial_delay: Duration::from_millis(5),
            rate_limit_delay: Duration::from_millis(80),
            ..fast_config()
        };

        let start = std::time::Instant::now();
        let _result =
            with_retry(&config, || async { Err::<i32, _>(TestError::Throttled) }).await;
        let elapsed = start.elapsed();

        assert!(
            elapsed >= Duration::from_millis(70),
            "rate-limited retry should wait ~80ms, waited {:?}",
            elapsed
        );
    }

    #[tokio::test]
    async fn backoff_delays_increase_exponentially() {
        let config = RetryConfig {
            max_attempts: 3,
            initial_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
            rate_limit_delay: Duration::from_secs(1),
            jitter: false,
        };

        let timestamps = Arc::new(tokio::sync::Mutex::new(Vec::new()));
        let ts_clone = timestamps.clone();

        let _result = with_retry(&config, || {
            let ts = ts_clone.clone();
            async move {
                ts.lock().await.push(std::time::Instant::now());
                Err::<i32, _>(TestError::Transient)
            }
        })
        .await;

        let ts = timestamps.lock().await;
        assert_eq!(ts.len(), 4, "initial + 3 retries = 4 calls");

        let gap1 = ts[1].duration_since(ts[0]);
        let gap2 = ts[2].duration_since(ts[1]);
        let gap3 = ts[3].duration_since(ts[2]);

        assert!(gap1 >= Duration::from_millis(40), "first delay ~50ms, was {gap1:?}");
        assert!(gap2 >= Duration::from_millis(80), "second delay ~100ms, was {gap2:?}");
        assert!(gap3 >= Duration::from_millis(160), "third delay ~200ms, was {gap3:?}");
    }

    #[tokio::test]
    async fn delays_capped_at_max_delay() {
        let config = RetryConfig {
            max_attempts: 4,
            initial_delay: Duration::from_millis(50),
            max_delay: Duration::from_millis(200),
            backoff_multiplier: 10.0,
            rate_limit_delay: Duration::from_secs(1),
            jitter: false,
        };

        let timestamps = Arc::new(tokio::sync::Mutex::new(Vec::new()));
        let ts_clone = timestamps.clone();

        let _result = with_retry(&config, || {
            let ts = ts_clone.clone();
            async move {
                ts.lock().await.push(std::time::Instant::now());
                Err::<i32, _>(TestError::Transient)
            }
        })
        .await;

        let ts = timestamps.lock().await;
        assert_eq!(ts.len(), 5, "initial + 4 retries = 5 calls");

        let max_allowed = Duration::from_millis(350); // 200ms + scheduling tolerance
        for i in 1..ts.len() {
            let gap = ts[i].duration_since(ts[i - 1]);
            assert!(
                gap <= max_allowed,
                "delay between attempt {} and {} was {:?}, exceeds cap + tolerance",
                i,
                i + 1,
                gap
            );
        }
    }

    #[test]
    fn add_jitter_stays_within_bounds() {
        let delay = Duration::from_millis(50);
        for i in 0..200 {
            let jittered = add_jitter(delay);
            assert!(
                jittered >= delay,
                "iteration {i}: jittered {jittered:?} < base delay {delay:?}"
            );
            assert!(
                jittered <= delay * 2,
                "iteration {i}: jittered {jittered:?} > 2x base delay"
            );
        }
    }

    #[test]
    fn error_classification_transient() {
        assert!(Error::RateLimited.is_retryable());
        assert!(Error::RateLimited.is_rate_limited());
        assert!(
            Error::Auth {
                identifier: "crawler@example.com".to_string(),
                reason: "bad token".to_string(),
            }
            .is_retryable()
        );
        assert!(Error::Api("search backend unavailable".to_string()).is_retryable());
    }

    #[test]
    fn error_classification_permanent() {
        use crate::error::DatabaseError;

        assert!(
            !Error::Config {
                message: "bad config".to_string(),
                key: None,
            }
            .is_retryable()
        );
        assert!(
            !Error::Database(DatabaseError::QueryFailed("db error".to_string())).is_retryable()
        );
        assert!(!Error::NoCredentials.is_retryable());
        assert!(!Error::Other("unknown problem".to_string()).is_retryable());
    }
}
