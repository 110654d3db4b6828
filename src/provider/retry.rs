// src/provider/retry.rs — Retry with exponential backoff for model providers
//
// Retries rate limits, 5xx responses and dropped connections.
// Bad requests and auth failures surface immediately.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::{ChatRequest, ChatResponse, ModelProvider};
use crate::infra::config::RetrySettings;
use crate::infra::errors::ReviserError;

const BACKOFF_FACTOR: f64 = 2.0;
const JITTER_FRACTION: f64 = 0.2;

pub struct RetryProvider {
    inner: Arc<dyn ModelProvider>,
    settings: RetrySettings,
}

impl RetryProvider {
    pub fn new(inner: Arc<dyn ModelProvider>) -> Self {
        Self::with_settings(inner, RetrySettings::default())
    }

    pub fn with_settings(inner: Arc<dyn ModelProvider>, settings: RetrySettings) -> Self {
        Self { inner, settings }
    }

    /// Delay before retry `attempt` (0-indexed).
    fn delay_for_attempt(&self, attempt: u32, rate_limit_delay: Option<Duration>) -> Duration {
        if let Some(rl_delay) = rate_limit_delay {
            return rl_delay + Duration::from_millis(100);
        }

        let base_ms = self.settings.initial_delay().as_millis() as f64
            * BACKOFF_FACTOR.powi(attempt as i32);
        let capped_ms = base_ms.min(self.settings.max_delay().as_millis() as f64);
        let final_ms = (capped_ms * deterministic_jitter(attempt, JITTER_FRACTION)).max(100.0);

        Duration::from_millis(final_ms as u64)
    }
}

fn rate_limit_delay(error: &ReviserError) -> Option<Duration> {
    match error {
        ReviserError::RateLimited { retry_after_ms, .. } if *retry_after_ms > 0 => {
            Some(Duration::from_millis(*retry_after_ms))
        }
        _ => None,
    }
}

/// Multiplier in [1 - fraction, 1 + fraction], fixed per attempt.
fn deterministic_jitter(attempt: u32, fraction: f64) -> f64 {
    let hash = (attempt.wrapping_mul(2654435761)) as f64 / u32::MAX as f64;
    1.0 + fraction * (2.0 * hash - 1.0)
}

#[async_trait]
impl ModelProvider for RetryProvider {
    fn id(&self) -> &str {
        self.inner.id()
    }

    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ReviserError> {
        let mut attempt = 0;
        loop {
            match self.inner.chat(request.clone()).await {
                Ok(response) => return Ok(response),
                Err(e) if !e.is_retriable() || attempt >= self.settings.max_retries => {
                    return Err(e)
                }
                Err(e) => {
                    let delay = self.delay_for_attempt(attempt, rate_limit_delay(&e));
                    tracing::warn!(
                        provider = self.inner.id(),
                        attempt = attempt + 1,
                        max_retries = self.settings.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        "Retrying after error: {}",
                        e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{StopReason, TokenUsage};
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails with an HTTP 503 for the first `failures` calls, then answers.
    struct FlakyProvider {
        failures: u32,
        retriable: bool,
        calls: AtomicU32,
    }

    #[async_trait]
    impl ModelProvider for FlakyProvider {
        fn id(&self) -> &str {
            "flaky"
        }
        fn name(&self) -> &str {
            "Flaky"
        }
        async fn chat(&self, _req: ChatRequest) -> Result<ChatResponse, ReviserError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                return Err(ReviserError::Provider {
                    provider: "flaky".into(),
                    message: "HTTP 503".into(),
                    retriable: self.retriable,
                });
            }
            Ok(ChatResponse {
                content: "ok".into(),
                tool_calls: vec![],
                usage: TokenUsage::default(),
                stop_reason: StopReason::EndTurn,
            })
        }
    }

    fn flaky(failures: u32, retriable: bool) -> Arc<FlakyProvider> {
        Arc::new(FlakyProvider {
            failures,
            retriable,
            calls: AtomicU32::new(0),
        })
    }

    fn fast() -> RetrySettings {
        RetrySettings {
            max_retries: 3,
            initial_delay_ms: 1,
            max_delay_ms: 1,
        }
    }

    #[test]
    fn test_rate_limit_delay_extraction() {
        let err = ReviserError::RateLimited {
            provider: "test".into(),
            retry_after_ms: 3000,
        };
        assert_eq!(rate_limit_delay(&err), Some(Duration::from_millis(3000)));
    }

    #[test]
    fn test_rate_limit_delay_zero() {
        let err = ReviserError::RateLimited {
            provider: "test".into(),
            retry_after_ms: 0,
        };
        assert!(rate_limit_delay(&err).is_none());
    }

    #[test]
    fn test_delay_for_attempt_exponential() {
        let provider = RetryProvider::new(flaky(0, true));
        let d0 = provider.delay_for_attempt(0, None);
        let d1 = provider.delay_for_attempt(1, None);
        let d2 = provider.delay_for_attempt(2, None);

        // d0 ≈ 1000ms, d1 ≈ 2000ms, d2 ≈ 4000ms
        assert!(d0.as_millis() >= 750 && d0.as_millis() <= 1250);
        assert!(d1.as_millis() >= 1500 && d1.as_millis() <= 2500);
        assert!(d2.as_millis() >= 3000 && d2.as_millis() <= 5000);
    }

    #[test]
    fn test_delay_capped_at_max() {
        let provider = RetryProvider::new(flaky(0, true));
        let d = provider.delay_for_attempt(10, None);
        assert!(d.as_millis() <= 36_000);
    }

    #[test]
    fn test_delay_uses_rate_limit_hint() {
        let provider = RetryProvider::new(flaky(0, true));
        let d = provider.delay_for_attempt(0, Some(Duration::from_millis(10_000)));
        assert_eq!(d.as_millis(), 10_100);
    }

    #[test]
    fn test_deterministic_jitter_range() {
        for attempt in 0..20 {
            let j = deterministic_jitter(attempt, 0.2);
            assert!((0.8..=1.2).contains(&j), "jitter {j} out of range for attempt {attempt}");
        }
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failures() {
        let inner = flaky(2, true);
        let provider = RetryProvider::with_settings(inner.clone(), fast());
        let resp = provider.chat(ChatRequest::default()).await.unwrap();
        assert_eq!(resp.content, "ok");
        assert_eq!(inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let inner = flaky(10, true);
        let provider = RetryProvider::with_settings(inner.clone(), fast());
        assert!(provider.chat(ChatRequest::default()).await.is_err());
        assert_eq!(inner.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_non_retriable_fails_fast() {
        let inner = flaky(1, false);
        let provider = RetryProvider::with_settings(inner.clone(), fast());
        assert!(provider.chat(ChatRequest::default()).await.is_err());
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
    }
}
