//! The classification client: semaphore-bounded, timeout-guarded, retrying
//! wrapper around a provider, sharing one circuit breaker across all calls.
//! Calls beyond the in-flight bound are rejected immediately rather than
//! queued; feed responsiveness beats completeness.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use super::breaker::CircuitBreaker;
use super::error::ClassifyError;
use super::provider::ClassifierProvider;
use super::retry::{RetryDecision, RetryPolicy};
use super::Classification;
use crate::config::ScreenerConfig;

pub struct ClassifyClient {
    provider: Arc<dyn ClassifierProvider>,
    semaphore: Semaphore,
    policy: RetryPolicy,
    breaker: Mutex<CircuitBreaker>,
    request_timeout: Duration,
    max_text_len: usize,
    /// Set once `Unauthorized` is seen; retry cannot fix a bad credential,
    /// so the messaging layer reports it until the key is replaced.
    credential_rejected: AtomicBool,
}

impl ClassifyClient {
    pub fn new(provider: Arc<dyn ClassifierProvider>, cfg: &ScreenerConfig) -> Self {
        Self {
            provider,
            semaphore: Semaphore::new(cfg.max_in_flight),
            policy: RetryPolicy::new(cfg.max_attempts, cfg.retry_base()),
            breaker: Mutex::new(CircuitBreaker::new(
                cfg.breaker_threshold,
                cfg.breaker_cooldown_secs,
            )),
            request_timeout: cfg.request_timeout(),
            max_text_len: cfg.max_text_len,
            credential_rejected: AtomicBool::new(false),
        }
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    pub fn breaker_open(&self) -> bool {
        self.breaker.lock().expect("breaker mutex poisoned").is_open()
    }

    pub fn credential_rejected(&self) -> bool {
        self.credential_rejected.load(Ordering::SeqCst)
    }

    /// A replaced credential clears the rejection flag optimistically.
    pub fn clear_credential_rejected(&self) {
        self.credential_rejected.store(false, Ordering::SeqCst);
    }

    /// Classify `text`, truncated to the configured maximum length.
    pub async fn classify(&self, text: &str) -> Result<Classification, ClassifyError> {
        let _permit = match self.semaphore.try_acquire() {
            Ok(p) => p,
            Err(_) => {
                debug!("in-flight bound hit, shedding classify call");
                return Err(ClassifyError::Busy);
            }
        };

        let text = truncate(text, self.max_text_len);
        let mut attempt: u32 = 1;
        loop {
            // Re-checked before every attempt: a concurrent caller (or our
            // own earlier attempts) may have tripped the breaker during the
            // backoff sleep, and an open breaker means no network I/O.
            {
                let mut b = self.breaker.lock().expect("breaker mutex poisoned");
                if !b.allow(Utc::now()) {
                    return Err(ClassifyError::CircuitOpen);
                }
            }

            let outcome = match tokio::time::timeout(self.request_timeout, self.provider.fetch(&text))
                .await
            {
                Ok(res) => res,
                // The in-flight request future is dropped here; that single
                // request is cancelled, nothing else.
                Err(_) => Err(ClassifyError::Timeout),
            };

            match outcome {
                Ok(result) => {
                    self.breaker
                        .lock()
                        .expect("breaker mutex poisoned")
                        .record_success();
                    return Ok(result);
                }
                Err(err) => {
                    if err.counts_as_breaker_failure() {
                        self.breaker
                            .lock()
                            .expect("breaker mutex poisoned")
                            .record_failure(Utc::now());
                    }
                    match self.policy.decide(err, attempt) {
                        RetryDecision::Retry(delay) => {
                            debug!(%err, attempt, delay_ms = delay.as_millis() as u64, "retrying classify");
                            tokio::time::sleep(delay).await;
                            attempt += 1;
                        }
                        RetryDecision::Fail => {
                            if err == ClassifyError::Unauthorized {
                                self.credential_rejected.store(true, Ordering::SeqCst);
                                warn!("credential invalid, escalating to configuration owner");
                            }
                            return Err(err);
                        }
                    }
                }
            }
        }
    }
}

/// Truncate on a char boundary; provider token limits, not correctness.
fn truncate(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        text.to_string()
    } else {
        text.chars().take(max_len).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::provider::MockProvider;
    use crate::classify::Label;

    fn small_cfg() -> ScreenerConfig {
        ScreenerConfig {
            max_in_flight: 2,
            max_attempts: 3,
            retry_base_ms: 5,
            request_timeout_ms: 100,
            breaker_threshold: 3,
            breaker_cooldown_secs: 300,
            max_text_len: 200,
            ..ScreenerConfig::default()
        }
    }

    #[tokio::test]
    async fn retries_transient_then_succeeds() {
        let provider = Arc::new(
            MockProvider::fixed(Classification::of(Label::HumbleBrag)).script(vec![
                Err(ClassifyError::ServerError),
                Err(ClassifyError::RateLimited),
            ]),
        );
        let client = ClassifyClient::new(provider.clone(), &small_cfg());
        let res = client.classify("some long enough post text").await;
        assert_eq!(res.unwrap().label, Label::HumbleBrag);
        assert_eq!(provider.calls(), 3);
    }

    #[tokio::test]
    async fn unauthorized_is_not_retried_and_escalates() {
        let provider = Arc::new(
            MockProvider::fixed(Classification::of(Label::NoMatch))
                .script(vec![Err(ClassifyError::Unauthorized)]),
        );
        let client = ClassifyClient::new(provider.clone(), &small_cfg());
        let res = client.classify("text").await;
        assert_eq!(res.unwrap_err(), ClassifyError::Unauthorized);
        assert_eq!(provider.calls(), 1);
        assert!(client.credential_rejected());
    }

    #[tokio::test]
    async fn open_breaker_stops_mid_retry_sequence() {
        // Threshold below the attempt budget: the breaker trips during the
        // retry loop, and later attempts must short-circuit instead of
        // reaching the provider.
        let provider = Arc::new(MockProvider::fixed(Classification::of(Label::NoMatch)).script(
            vec![
                Err(ClassifyError::ServerError),
                Err(ClassifyError::ServerError),
                Err(ClassifyError::ServerError),
                Err(ClassifyError::ServerError),
                Err(ClassifyError::ServerError),
            ],
        ));
        let cfg = ScreenerConfig {
            max_attempts: 5,
            breaker_threshold: 2,
            ..small_cfg()
        };
        let client = ClassifyClient::new(provider.clone(), &cfg);
        let res = client.classify("text").await;
        assert_eq!(res.unwrap_err(), ClassifyError::CircuitOpen);
        assert_eq!(
            provider.calls(),
            2,
            "no network attempts once the breaker is open"
        );
        assert!(client.breaker_open());
    }

    #[tokio::test]
    async fn timeout_cancels_and_is_not_retried() {
        let provider = Arc::new(
            MockProvider::fixed(Classification::of(Label::NoMatch))
                .with_delay(Duration::from_millis(500)),
        );
        let client = ClassifyClient::new(provider.clone(), &small_cfg());
        let res = client.classify("text").await;
        assert_eq!(res.unwrap_err(), ClassifyError::Timeout);
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn truncates_before_sending() {
        assert_eq!(truncate("abcdef", 4), "abcd");
        assert_eq!(truncate("abc", 4), "abc");
        // Multibyte safety.
        assert_eq!(truncate("🚀🚀🚀", 2), "🚀🚀");
    }
}
