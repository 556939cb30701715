//! Bounded retry/timeout executor for outbound calls.
//!
//! One policy object wraps every network operation in the pipeline: each
//! attempt runs under `tokio::time::timeout`, transient failures sleep the
//! configured delay and try again, non-transient failures (4xx, auth, quota)
//! return immediately without touching the remaining budget. Plain generics,
//! no async-trait, no boxed futures.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::errors::GithubError;
use gemini_service::AiServiceError;

/// Classifies an operation's errors for the retry loop.
pub trait Retryable {
    /// True for failures worth another attempt (timeout, 5xx, transport).
    fn is_transient(&self) -> bool;

    /// Error representing a per-attempt deadline expiry.
    fn timed_out(after: Duration) -> Self;
}

/// Attempt budget and pacing for one class of outbound calls.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Fixed sleep between attempts.
    pub delay: Duration,
    /// Per-attempt deadline.
    pub timeout: Duration,
}

/// Terminal result of a retried operation.
#[derive(Debug)]
pub enum RetryError<E> {
    /// Transient failures exhausted the whole attempt budget.
    Exhausted { attempts: u32, last: E },
    /// Non-transient failure; surfaced at once, budget untouched.
    Rejected(E),
}

/// Runs `call` under `policy`, logging every attempt with its outcome.
pub async fn run<T, E, F, Fut>(
    policy: RetryPolicy,
    op: &'static str,
    mut call: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + std::fmt::Display,
{
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 1u32;
    loop {
        let outcome = match tokio::time::timeout(policy.timeout, call()).await {
            Ok(result) => result,
            Err(_) => Err(E::timed_out(policy.timeout)),
        };
        match outcome {
            Ok(value) => {
                debug!("{op}: attempt {attempt}/{attempts} succeeded");
                return Ok(value);
            }
            Err(err) if !err.is_transient() => {
                warn!("{op}: attempt {attempt}/{attempts} rejected, not retrying: {err}");
                return Err(RetryError::Rejected(err));
            }
            Err(err) if attempt >= attempts => {
                warn!("{op}: attempt {attempt}/{attempts} failed, budget exhausted: {err}");
                return Err(RetryError::Exhausted {
                    attempts,
                    last: err,
                });
            }
            Err(err) => {
                warn!(
                    "{op}: attempt {attempt}/{attempts} failed, retrying in {:?}: {err}",
                    policy.delay
                );
                tokio::time::sleep(policy.delay).await;
                attempt += 1;
            }
        }
    }
}

impl Retryable for GithubError {
    fn is_transient(&self) -> bool {
        matches!(
            self,
            GithubError::Timeout
                | GithubError::Network(_)
                | GithubError::Server(_)
                | GithubError::RateLimited
        )
    }

    fn timed_out(_after: Duration) -> Self {
        GithubError::Timeout
    }
}

impl Retryable for AiServiceError {
    fn is_transient(&self) -> bool {
        match self {
            AiServiceError::Timeout(_) | AiServiceError::Server(_) => true,
            AiServiceError::HttpTransport(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }

    fn timed_out(after: Duration) -> Self {
        AiServiceError::Timeout(after)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug)]
    enum FakeError {
        Transient,
        Fatal,
    }

    impl std::fmt::Display for FakeError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                FakeError::Transient => f.write_str("transient"),
                FakeError::Fatal => f.write_str("fatal"),
            }
        }
    }

    impl Retryable for FakeError {
        fn is_transient(&self) -> bool {
            matches!(self, FakeError::Transient)
        }
        fn timed_out(_after: Duration) -> Self {
            FakeError::Transient
        }
    }

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            delay: Duration::from_secs(2),
            timeout: Duration::from_secs(5),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failure_uses_whole_budget_with_delays() {
        let calls = AtomicU32::new(0);
        let started = tokio::time::Instant::now();

        let out: Result<(), _> = run(policy(), "test_op", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(FakeError::Transient) }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(matches!(
            out,
            Err(RetryError::Exhausted { attempts: 3, .. })
        ));
        // Two sleeps of 2s between three attempts.
        assert!(started.elapsed() >= Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn rejection_fails_fast_with_zero_retries() {
        let calls = AtomicU32::new(0);

        let out: Result<(), _> = run(policy(), "test_op", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(FakeError::Fatal) }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(out, Err(RetryError::Rejected(FakeError::Fatal))));
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_after_one_transient_failure() {
        let calls = AtomicU32::new(0);

        let out = run(policy(), "test_op", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(FakeError::Transient)
                } else {
                    Ok(42u32)
                }
            }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(matches!(out, Ok(42)));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_attempts_hit_the_per_attempt_deadline() {
        let calls = AtomicU32::new(0);

        let out: Result<(), RetryError<FakeError>> = run(policy(), "test_op", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(())
            }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(matches!(out, Err(RetryError::Exhausted { .. })));
    }

    #[test]
    fn github_error_classification() {
        assert!(GithubError::Timeout.is_transient());
        assert!(GithubError::Server(502).is_transient());
        assert!(GithubError::RateLimited.is_transient());
        assert!(!GithubError::Unauthorized.is_transient());
        assert!(!GithubError::NotFound.is_transient());
        assert!(!GithubError::HttpStatus(422).is_transient());
    }
}
