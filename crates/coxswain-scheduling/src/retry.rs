//! Retry wrapper for scheduling service calls.
//!
//! Two named policies: `interactive` for calls a member is waiting on,
//! `background` for webhook and batch work. Every failure is currently
//! classified transient and retried until the attempt budget runs out;
//! see DESIGN.md for the reasoning behind keeping that classification.

use crate::error::{Result, SchedulingError};
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// How the delay between attempts grows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backoff {
    /// Fixed increment per attempt, capped
    Linear {
        start: Duration,
        increment: Duration,
        cap: Duration,
    },
    /// Doubling per attempt with random jitter, capped
    Exponential {
        start: Duration,
        jitter: Duration,
        cap: Duration,
    },
}

/// A named, bounded retry schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub name: &'static str,
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl RetryPolicy {
    /// Policy for calls a member is actively waiting on. Bounded so the
    /// worst case stays inside human patience: 5 attempts, delays of
    /// 2s, 3s, 4s, 4s between them.
    pub fn interactive() -> Self {
        Self {
            name: "interactive",
            max_attempts: 5,
            backoff: Backoff::Linear {
                start: Duration::from_secs(2),
                increment: Duration::from_secs(1),
                cap: Duration::from_secs(4),
            },
        }
    }

    /// Policy for webhook and batch work where nobody is watching the
    /// spinner: 10 attempts, 1s doubling with +-0.5s jitter, 30s cap.
    pub fn background() -> Self {
        Self {
            name: "background",
            max_attempts: 10,
            backoff: Backoff::Exponential {
                start: Duration::from_secs(1),
                jitter: Duration::from_millis(500),
                cap: Duration::from_secs(30),
            },
        }
    }

    /// Whether a failure is worth another attempt.
    ///
    /// Deliberately `true` for everything: permanent failures burn the
    /// budget and then surface unchanged. A stricter classifier would
    /// hook in here.
    pub fn is_transient(&self, _err: &SchedulingError) -> bool {
        true
    }

    /// Delay before the next attempt, given the 1-based attempt number
    /// that just failed.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match &self.backoff {
            Backoff::Linear {
                start,
                increment,
                cap,
            } => {
                let delay = *start + *increment * attempt.saturating_sub(1);
                delay.min(*cap)
            }
            Backoff::Exponential { start, jitter, cap } => {
                let doubled = start
                    .checked_mul(1u32 << attempt.saturating_sub(1).min(16))
                    .unwrap_or(*cap);
                let capped = doubled.min(*cap);
                if jitter.is_zero() {
                    return capped;
                }
                let jitter_ms = jitter.as_millis() as i64;
                let offset = rand::thread_rng().gen_range(-jitter_ms..=jitter_ms);
                let with_jitter = capped.as_millis() as i64 + offset;
                Duration::from_millis(with_jitter.max(0) as u64)
            }
        }
    }
}

/// Runs an operation under a retry policy.
///
/// Attempts are made until one succeeds, the failure is classified
/// permanent, or the budget is exhausted; the last error is then returned
/// unchanged. Attempt count and elapsed time are logged either way.
pub async fn retry_with<T, F, Fut>(policy: &RetryPolicy, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let started = Instant::now();
    let mut attempt = 1u32;
    loop {
        match operation().await {
            Ok(value) => {
                tracing::debug!(
                    "[Retry] {} call succeeded (attempt {}/{}, {:?} elapsed)",
                    policy.name,
                    attempt,
                    policy.max_attempts,
                    started.elapsed()
                );
                return Ok(value);
            }
            Err(err) if attempt >= policy.max_attempts || !policy.is_transient(&err) => {
                tracing::warn!(
                    "[Retry] {} call failed permanently after {} attempts ({:?} elapsed): {}",
                    policy.name,
                    attempt,
                    started.elapsed(),
                    err
                );
                return Err(err);
            }
            Err(err) => {
                let delay = policy.delay_for(attempt);
                tracing::debug!(
                    "[Retry] {} call attempt {}/{} failed ({}), retrying in {:?}",
                    policy.name,
                    attempt,
                    policy.max_attempts,
                    err,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn instant_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            name: "test",
            max_attempts,
            backoff: Backoff::Linear {
                start: Duration::ZERO,
                increment: Duration::ZERO,
                cap: Duration::ZERO,
            },
        }
    }

    #[test]
    fn test_interactive_delays() {
        let policy = RetryPolicy::interactive();
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2), Duration::from_secs(3));
        assert_eq!(policy.delay_for(3), Duration::from_secs(4));
        // Capped from here on
        assert_eq!(policy.delay_for(4), Duration::from_secs(4));
    }

    #[test]
    fn test_background_delays_double_within_jitter() {
        let policy = RetryPolicy::background();
        for (attempt, base_secs) in [(1u32, 1u64), (2, 2), (3, 4), (4, 8)] {
            let delay = policy.delay_for(attempt);
            let base = Duration::from_secs(base_secs);
            assert!(delay >= base.saturating_sub(Duration::from_millis(500)));
            assert!(delay <= base + Duration::from_millis(500));
        }
        // Far attempts stay near the cap
        let far = policy.delay_for(10);
        assert!(far >= Duration::from_millis(29_500));
        assert!(far <= Duration::from_millis(30_500));
    }

    #[tokio::test]
    async fn test_succeeds_without_retry() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let result = retry_with(&instant_policy(5), move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, SchedulingError>(42)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let result = retry_with(&instant_policy(5), move || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(SchedulingError::transport("flaky"))
                } else {
                    Ok(7)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhaustion_returns_last_error() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let result: Result<()> = retry_with(&instant_policy(3), move || {
            let counter = counter.clone();
            async move {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                Err(SchedulingError::transport(format!("failure {}", n)))
            }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        match result {
            Err(SchedulingError::Transport(message)) => assert_eq!(message, "failure 2"),
            other => panic!("expected transport error, got {:?}", other.err()),
        }
    }

    #[tokio::test]
    async fn test_rejections_are_retried_like_everything_else() {
        // Retry-everything classification: even a validation rejection
        // burns the full budget before surfacing
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let result: Result<()> = retry_with(&instant_policy(3), move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(SchedulingError::rejected("double booking"))
            }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(matches!(result, Err(SchedulingError::Rejected { .. })));
    }
}
