//! Exponential backoff around fallible LLM calls.

use std::future::Future;
use std::time::Duration;

use ai_llm_service::AiLlmError;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one; at least 1.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubled for every further one.
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay after failed attempt number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(1u32 << shift)
            .min(self.max_delay)
    }

    /// Runs `op` until it succeeds, fails with a non-retryable error, or the
    /// attempt budget is spent. The last error is returned.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, AiLlmError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, AiLlmError>>,
    {
        let max = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(err) if attempt < max && err.is_retryable() => {
                    let delay = self.delay_for(attempt);
                    warn!(attempt, ?delay, error = %err, "retrying LLM call");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ai_llm_service::error_handler::ConfigError;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    #[test]
    fn delays_double_and_cap() {
        let p = RetryPolicy {
            max_attempts: 10,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(500),
        };
        assert_eq!(p.delay_for(1), Duration::from_millis(100));
        assert_eq!(p.delay_for(2), Duration::from_millis(200));
        assert_eq!(p.delay_for(3), Duration::from_millis(400));
        assert_eq!(p.delay_for(4), Duration::from_millis(500));
        assert_eq!(p.delay_for(40), Duration::from_millis(500));
    }

    #[tokio::test]
    async fn transient_errors_are_retried_until_success() {
        let calls = &AtomicU32::new(0);
        let out = fast(3)
            .run(move || async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(AiLlmError::Timeout(Duration::from_secs(1)))
                } else {
                    Ok("あり")
                }
            })
            .await
            .unwrap();
        assert_eq!(out, "あり");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn budget_is_respected() {
        let calls = &AtomicU32::new(0);
        let res: Result<(), _> = fast(2)
            .run(move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(AiLlmError::Timeout(Duration::from_secs(1)))
            })
            .await;
        assert!(matches!(res, Err(AiLlmError::Timeout(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn permanent_errors_fail_fast() {
        let calls = &AtomicU32::new(0);
        let res: Result<(), _> = fast(5)
            .run(move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ConfigError::MissingVar("OPENAI_API_KEY").into())
            })
            .await;
        assert!(matches!(res, Err(AiLlmError::Config(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
