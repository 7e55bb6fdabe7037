//! Bounded retry with jittered exponential backoff
//!
//! Each attempt returns an explicit [`AttemptError`] tag instead of driving
//! control flow through opaque errors, so the orchestrator loop only
//! inspects the tag: retryable failures back off and try again, terminal
//! failures short-circuit. On exhaustion the last raw model response is
//! logged for diagnosis but never returned to the caller.

use std::future::Future;
use std::time::Duration;

use tracing::{error, warn};

use crate::DresscastError;

/// Outcome classification for a single attempt
#[derive(Debug)]
pub enum AttemptError {
    /// Worth another attempt: transport failures, JSON parse failures,
    /// semantic validation failures
    Retryable {
        reason: String,
        /// Raw model text of the failed attempt, kept for the exhaustion log
        raw_text: Option<String>,
    },
    /// Pointless to retry
    Terminal(DresscastError),
}

impl AttemptError {
    pub fn retryable<S: Into<String>>(reason: S) -> Self {
        Self::Retryable {
            reason: reason.into(),
            raw_text: None,
        }
    }

    pub fn retryable_with_raw<S: Into<String>>(reason: S, raw_text: &str) -> Self {
        Self::Retryable {
            reason: reason.into(),
            raw_text: Some(raw_text.to_string()),
        }
    }
}

impl From<DresscastError> for AttemptError {
    fn from(err: DresscastError) -> Self {
        match err {
            DresscastError::Model { ref message } => AttemptError::Retryable {
                reason: message.clone(),
                raw_text: None,
            },
            other => AttemptError::Terminal(other),
        }
    }
}

/// Retry budget and backoff base for one kind of model call
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Backoff base; the delay after failed attempt `n` is
    /// `base * 2^n` jittered uniformly into `[0.5x, 1.5x]`
    pub base_delay: Duration,
}

impl RetryPolicy {
    #[must_use]
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    fn backoff(&self, failed_attempt: u32) -> Duration {
        let base = self.base_delay.as_millis() as f64 * 2f64.powi(failed_attempt as i32);
        let jitter: f64 = rand::random_range(0.5..1.5);
        Duration::from_millis((base * jitter) as u64)
    }
}

/// Run `attempt_fn` up to `policy.max_attempts` times.
///
/// The closure receives the 1-based attempt number. Attempts are strictly
/// sequential; the backoff delay is an async suspension between them.
pub async fn run_with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut attempt_fn: F,
) -> Result<T, DresscastError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, AttemptError>>,
{
    let mut last_reason = String::from("no attempt was made");
    let mut last_raw: Option<String> = None;

    for attempt in 1..=policy.max_attempts {
        match attempt_fn(attempt).await {
            Ok(value) => return Ok(value),
            Err(AttemptError::Terminal(err)) => {
                error!(label, attempt, error = %err, "terminal failure, not retrying");
                return Err(err);
            }
            Err(AttemptError::Retryable { reason, raw_text }) => {
                warn!(label, attempt, max = policy.max_attempts, %reason, "attempt failed");
                last_reason = reason;
                if raw_text.is_some() {
                    last_raw = raw_text;
                }
                if attempt < policy.max_attempts {
                    tokio::time::sleep(policy.backoff(attempt)).await;
                }
            }
        }
    }

    if let Some(raw) = last_raw {
        error!(label, raw_text = %raw, "last model response could not be used");
    }

    Err(DresscastError::RetriesExhausted {
        attempts: policy.max_attempts,
        message: last_reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_always_failing_attempt_exhausts_budget() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = run_with_retry(&fast_policy(), "weather", |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(AttemptError::retryable("boom")) }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        match result.unwrap_err() {
            DresscastError::RetriesExhausted { attempts, message } => {
                assert_eq!(attempts, 3);
                assert_eq!(message, "boom");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_recovery_on_third_attempt() {
        let calls = AtomicU32::new(0);
        let result = run_with_retry(&fast_policy(), "weather", |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 3 {
                    Err(AttemptError::retryable("not yet"))
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_terminal_error_short_circuits() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = run_with_retry(&fast_policy(), "weather", |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(AttemptError::Terminal(DresscastError::config(
                    "no API key",
                )))
            }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(
            result.unwrap_err(),
            DresscastError::Config { .. }
        ));
    }

    #[tokio::test]
    async fn test_first_attempt_success_needs_no_backoff() {
        let result = run_with_retry(&fast_policy(), "weather", |_| async { Ok("done") }).await;
        assert_eq!(result.unwrap(), "done");
    }

    #[test]
    fn test_backoff_is_exponential_and_jittered() {
        let policy = RetryPolicy::new(3, Duration::from_millis(800));
        for failed_attempt in 1..=2u32 {
            let expected_base = 800.0 * 2f64.powi(failed_attempt as i32);
            let delay = policy.backoff(failed_attempt).as_millis() as f64;
            assert!(
                delay >= expected_base * 0.5 && delay <= expected_base * 1.5,
                "attempt {failed_attempt}: {delay}ms outside jitter range of {expected_base}ms"
            );
        }
    }

    #[test]
    fn test_model_errors_classify_as_retryable() {
        let err: AttemptError = DresscastError::model("503 from upstream").into();
        assert!(matches!(err, AttemptError::Retryable { .. }));

        let err: AttemptError = DresscastError::validation("bad input").into();
        assert!(matches!(err, AttemptError::Terminal(_)));
    }
}
