//! Retry wrapper for rate-limited provider calls.
//!
//! [`call_with_retry`] runs any async operation and retries it while it fails
//! with a transient (rate-limit / quota) error. When the error text carries a
//! server hint such as `Please retry in 56.36s.` the wrapper waits for the
//! hinted duration plus a one second margin; otherwise it backs off
//! exponentially from [`RetryPolicy::base_delay`] with up to one second of
//! jitter. Waiting suspends only the calling task.

use crate::config::ReliabilityConfig;
use rand::Rng;
use regex::Regex;
use std::future::Future;
use std::sync::OnceLock;
use std::time::Duration;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(5);

/// Added on top of a server-suggested wait.
const HINT_MARGIN: Duration = Duration::from_secs(1);

/// Error-text tokens that mark a failure as transient.
const TRANSIENT_MARKERS: [&str; 2] = ["429", "RESOURCE_EXHAUSTED"];

/// Explicit marker for backends that want a failure retried without relying
/// on error text.
#[derive(Debug, thiserror::Error)]
#[error("transient failure: {0}")]
pub struct TransientError(pub String);

/// How many times to attempt a call and how long to back off between tries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one. Never below 1.
    pub max_attempts: u32,
    /// Base of the exponential backoff (`base * 2^attempt`).
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    pub fn from_config(config: &ReliabilityConfig) -> Self {
        Self::new(
            config.max_attempts,
            Duration::from_millis(config.base_delay_ms),
        )
    }

    /// Exponential delay for a zero-based attempt index, without jitter.
    fn exponential(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt.min(16)))
    }

    /// Delay before the next try after `attempt` (zero-based) failed with `error_text`.
    pub(crate) fn delay_for(&self, attempt: u32, error_text: &str) -> Duration {
        if let Some(hint) = parse_retry_hint(error_text) {
            return hint + HINT_MARGIN;
        }
        let jitter = rand::thread_rng().gen_range(0.0..1.0);
        self.exponential(attempt) + Duration::from_secs_f64(jitter)
    }
}

fn retry_hint_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)retry in (\d+(?:\.\d+)?)s").expect("retry hint pattern is valid")
    })
}

/// Extract a server-suggested wait (`retry in <number>s`) from error text.
pub fn parse_retry_hint(text: &str) -> Option<Duration> {
    let captures = retry_hint_pattern().captures(text)?;
    let seconds: f64 = captures.get(1)?.as_str().parse().ok()?;
    Duration::try_from_secs_f64(seconds).ok()
}

/// Whether an error belongs to the retryable rate-limit class.
pub fn is_transient(error: &anyhow::Error) -> bool {
    if error.chain().any(|cause| cause.is::<TransientError>()) {
        return true;
    }
    let text = format!("{error:#}");
    TRANSIENT_MARKERS.iter().any(|marker| text.contains(marker))
}

/// Run `operation`, retrying transient failures according to `policy`.
///
/// Non-transient errors are returned after the first attempt. On the final
/// attempt any error is returned unchanged. Dropping the returned future (for
/// example from an enclosing `tokio::time::timeout`) stops retrying.
pub async fn call_with_retry<T, F, Fut>(policy: &RetryPolicy, mut operation: F) -> anyhow::Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt: u32 = 0;

    loop {
        let error = match operation().await {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };

        let is_last = attempt + 1 >= max_attempts;
        if is_last || !is_transient(&error) {
            return Err(error);
        }

        let text = format!("{error:#}");
        let delay = policy.delay_for(attempt, &text);
        let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        tracing::warn!(
            attempt = attempt + 1,
            max_attempts,
            delay_ms,
            hinted = parse_retry_hint(&text).is_some(),
            "Rate limit hit; retrying after backoff"
        );
        crate::observability::runtime_trace::record_event(
            "retry",
            None,
            Some(false),
            Some(&crate::providers::sanitize_api_error(&text)),
            serde_json::json!({ "attempt": attempt + 1, "delay_ms": delay_ms }),
        );

        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::from_millis(10))
    }

    #[test]
    fn parse_retry_hint_reads_fractional_seconds() {
        let hint = parse_retry_hint("429 RESOURCE_EXHAUSTED. Please retry in 56.360130679s.");
        let hint = hint.expect("hint should parse");
        assert!((hint.as_secs_f64() - 56.360_130_679).abs() < 1e-6);
    }

    #[test]
    fn parse_retry_hint_reads_whole_seconds() {
        assert_eq!(
            parse_retry_hint("quota exceeded, retry in 2s"),
            Some(Duration::from_secs(2))
        );
    }

    #[test]
    fn parse_retry_hint_absent() {
        assert_eq!(parse_retry_hint("429 Too Many Requests"), None);
        assert_eq!(parse_retry_hint("retry in a moment"), None);
    }

    #[test]
    fn transient_detection_by_code_and_token() {
        assert!(is_transient(&anyhow::anyhow!(
            "gemini API error (429 Too Many Requests)"
        )));
        assert!(is_transient(&anyhow::anyhow!("status RESOURCE_EXHAUSTED")));
        assert!(is_transient(&anyhow::Error::new(TransientError(
            "throttled".into()
        ))));
        assert!(!is_transient(&anyhow::anyhow!("401 Unauthorized")));
    }

    #[test]
    fn transient_detection_walks_context_chain() {
        let err = anyhow::anyhow!("429 Too Many Requests").context("classification call");
        assert!(is_transient(&err));
    }

    #[test]
    fn hinted_delay_adds_one_second_margin() {
        let policy = RetryPolicy::default();
        assert_eq!(
            policy.delay_for(0, "Please retry in 2s."),
            Duration::from_secs(3)
        );
    }

    #[test]
    fn exponential_delay_doubles_with_bounded_jitter() {
        let policy = RetryPolicy::new(5, Duration::from_secs(5));
        for attempt in 0..3 {
            let delay = policy.delay_for(attempt, "429");
            let floor = Duration::from_secs(5 * 2u64.pow(attempt));
            assert!(delay >= floor, "attempt {attempt}: {delay:?} < {floor:?}");
            assert!(delay < floor + Duration::from_secs(1));
        }
    }

    #[test]
    fn policy_never_drops_below_one_attempt() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn honours_server_hint_then_returns_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let started = tokio::time::Instant::now();

        let result = call_with_retry(&RetryPolicy::default(), || {
            let counter = counter.clone();
            async move {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                if n <= 2 {
                    anyhow::bail!("429 RESOURCE_EXHAUSTED: Please retry in 2s.");
                }
                Ok("done")
            }
        })
        .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // Two waits of 2s hint + 1s margin each.
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(6), "waited {elapsed:?}");
        assert!(elapsed < Duration::from_millis(6100), "waited {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn non_transient_error_is_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result: anyhow::Result<()> = call_with_retry(&fast_policy(5), || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                anyhow::bail!("invalid request: model not found")
            }
        })
        .await;

        let err = result.unwrap_err();
        assert_eq!(err.to_string(), "invalid request: model not found");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_errors_exhaust_attempts_and_propagate() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result: anyhow::Result<()> = call_with_retry(&fast_policy(3), || {
            let counter = counter.clone();
            async move {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                anyhow::bail!("429 Too Many Requests (call {n})")
            }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(result.unwrap_err().to_string(), "429 Too Many Requests (call 3)");
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_grows_between_attempts() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = seen.clone();

        let _: anyhow::Result<()> = call_with_retry(&fast_policy(3), || {
            let log = log.clone();
            async move {
                log.lock().push(tokio::time::Instant::now());
                anyhow::bail!("RESOURCE_EXHAUSTED")
            }
        })
        .await;

        let stamps = seen.lock().clone();
        assert_eq!(stamps.len(), 3);
        let first_gap = stamps[1] - stamps[0];
        let second_gap = stamps[2] - stamps[1];
        assert!(first_gap >= Duration::from_millis(10));
        assert!(second_gap >= Duration::from_millis(20));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_cancels_pending_retry() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let outcome: Result<anyhow::Result<()>, _> = tokio::time::timeout(
            Duration::from_secs(10),
            call_with_retry(&RetryPolicy::default(), || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    anyhow::bail!("429: retry in 60s")
                }
            }),
        )
        .await;

        assert!(outcome.is_err(), "timeout should fire during the retry wait");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
