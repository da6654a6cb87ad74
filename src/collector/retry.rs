//! Retry policy wrapping collector fetches.
//!
//! A single generic combinator parameterized by max attempts and a fixed
//! delay. Error handling is driven entirely by [`ErrorClass`]: transient
//! connection errors are retried, everything else gets one attempt. The
//! policy never propagates an error past its boundary — the scheduler only
//! ever sees "samples" or "no samples".

use std::time::Duration;

use crate::collector::{Collector, ErrorClass};
use crate::metrics::Sample;

/// Default attempt budget per cycle.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default delay between attempts (5 seconds).
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Bounded retry with fixed backoff.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum number of attempts per cycle, including the first.
    pub max_attempts: u32,
    /// Fixed delay between attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

/// Outcome of one retry-wrapped fetch.
///
/// `samples` is `None` when the fetch failed on a non-retryable class or
/// exhausted its attempt budget; the registry's existing values for the
/// adapter's metrics are then left untouched for the cycle.
#[derive(Debug)]
pub struct FetchOutcome {
    pub samples: Option<Vec<Sample>>,
    pub attempts: u32,
}

impl FetchOutcome {
    /// Whether the fetch ultimately produced samples.
    pub fn is_success(&self) -> bool {
        self.samples.is_some()
    }
}

impl RetryPolicy {
    /// Create a policy with an explicit attempt budget and delay.
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// A policy that performs a single attempt.
    pub fn single_attempt() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Run a collector's fetch under this policy.
    pub async fn fetch(&self, collector: &dyn Collector) -> FetchOutcome {
        let name = collector.name();
        let mut attempt = 0;

        loop {
            attempt += 1;
            match collector.fetch().await {
                Ok(samples) => {
                    return FetchOutcome {
                        samples: Some(samples),
                        attempts: attempt,
                    };
                }
                Err(e) => {
                    let class = e.class();
                    if !class.is_retryable() {
                        tracing::warn!(
                            collector = %name,
                            class = %class,
                            error = %e,
                            "Fetch failed; not retrying"
                        );
                        return FetchOutcome {
                            samples: None,
                            attempts: attempt,
                        };
                    }
                    if attempt >= self.max_attempts {
                        tracing::error!(
                            collector = %name,
                            class = %class,
                            attempts = attempt,
                            error = %e,
                            "Fetch failed after all attempts; giving up for this cycle"
                        );
                        return FetchOutcome {
                            samples: None,
                            attempts: attempt,
                        };
                    }

                    tracing::warn!(
                        collector = %name,
                        class = %class,
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = self.delay.as_millis() as u64,
                        error = %e,
                        "Fetch failed; retrying"
                    );
                    tokio::time::sleep(self.delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::collector::CollectorError;
    use crate::metrics::MetricDefinition;

    /// Fails with the given error builder until `succeed_after` calls, then
    /// returns one sample.
    struct FlakyCollector {
        calls: AtomicU32,
        succeed_after: u32,
        error: fn() -> CollectorError,
    }

    impl FlakyCollector {
        fn new(succeed_after: u32, error: fn() -> CollectorError) -> Self {
            Self {
                calls: AtomicU32::new(0),
                succeed_after,
                error,
            }
        }
    }

    #[async_trait::async_trait]
    impl Collector for FlakyCollector {
        fn name(&self) -> &str {
            "flaky"
        }

        fn definitions(&self) -> Vec<MetricDefinition> {
            vec![MetricDefinition::gauge("flaky_value", "test value")]
        }

        async fn fetch(&self) -> Result<Vec<Sample>, CollectorError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call > self.succeed_after {
                Ok(vec![Sample::new("flaky_value", 1.0)])
            } else {
                Err((self.error)())
            }
        }
    }

    fn connection_error() -> CollectorError {
        CollectorError::Connection("connection refused".into())
    }

    fn authorization_error() -> CollectorError {
        CollectorError::Authorization("HTTP 401".into())
    }

    #[tokio::test]
    async fn test_success_on_first_attempt() {
        let collector = FlakyCollector::new(0, connection_error);
        let policy = RetryPolicy::new(3, Duration::ZERO);

        let outcome = policy.fetch(&collector).await;
        assert!(outcome.is_success());
        assert_eq!(outcome.attempts, 1);
    }

    #[tokio::test]
    async fn test_transient_error_retried_until_success() {
        let collector = FlakyCollector::new(2, connection_error);
        let policy = RetryPolicy::new(3, Duration::ZERO);

        let outcome = policy.fetch(&collector).await;
        assert!(outcome.is_success());
        assert_eq!(outcome.attempts, 3);
    }

    #[tokio::test]
    async fn test_transient_error_exhausts_budget() {
        let collector = FlakyCollector::new(u32::MAX, connection_error);
        let policy = RetryPolicy::new(3, Duration::ZERO);

        let outcome = policy.fetch(&collector).await;
        assert!(!outcome.is_success());
        assert_eq!(outcome.attempts, 3);
        assert_eq!(collector.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_authorization_error_single_attempt() {
        let collector = FlakyCollector::new(u32::MAX, authorization_error);
        let policy = RetryPolicy::new(3, Duration::ZERO);

        let outcome = policy.fetch(&collector).await;
        assert!(!outcome.is_success());
        assert_eq!(outcome.attempts, 1);
        assert_eq!(collector.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_not_found_single_attempt() {
        let collector =
            FlakyCollector::new(u32::MAX, || CollectorError::NotFound("no such city".into()));
        let policy = RetryPolicy::default();

        let outcome = policy.fetch(&collector).await;
        assert!(!outcome.is_success());
        assert_eq!(outcome.attempts, 1);
    }

    #[test]
    fn test_attempt_budget_floor() {
        let policy = RetryPolicy::new(0, Duration::ZERO);
        assert_eq!(policy.max_attempts, 1);
    }
}
