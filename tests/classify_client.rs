// tests/classify_client.rs
//
// Concurrency discipline and circuit breaker behavior of the classification
// client, exercised through the public API with a scripted provider.

use std::sync::Arc;
use std::time::Duration;

use feed_screener::classify::provider::MockProvider;
use feed_screener::classify::{Classification, ClassifyClient, ClassifyError, Label};
use feed_screener::config::ScreenerConfig;

fn cfg() -> ScreenerConfig {
    ScreenerConfig {
        max_in_flight: 2,
        max_attempts: 1,
        retry_base_ms: 5,
        request_timeout_ms: 1_000,
        breaker_threshold: 3,
        breaker_cooldown_secs: 1,
        max_text_len: 200,
        ..ScreenerConfig::default()
    }
}

#[tokio::test]
async fn calls_beyond_the_bound_are_shed_not_queued() {
    let provider = Arc::new(
        MockProvider::fixed(Classification::of(Label::NoMatch))
            .with_delay(Duration::from_millis(200)),
    );
    let client = Arc::new(ClassifyClient::new(provider.clone(), &cfg()));

    let a = {
        let c = client.clone();
        tokio::spawn(async move { c.classify("first long in-flight request").await })
    };
    let b = {
        let c = client.clone();
        tokio::spawn(async move { c.classify("second long in-flight request").await })
    };
    // Let both tasks grab their permits before the third call.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let third = client.classify("third call while saturated").await;
    assert_eq!(third.unwrap_err(), ClassifyError::Busy);

    assert!(a.await.unwrap().is_ok());
    assert!(b.await.unwrap().is_ok());
    assert_eq!(provider.calls(), 2, "the shed call never reached the provider");
}

#[tokio::test]
async fn bound_frees_up_once_requests_finish() {
    let provider = Arc::new(MockProvider::fixed(Classification::of(Label::NoMatch)));
    let client = ClassifyClient::new(provider.clone(), &cfg());

    for _ in 0..5 {
        assert!(client.classify("sequential calls never saturate").await.is_ok());
    }
    assert_eq!(provider.calls(), 5);
}

#[tokio::test]
async fn breaker_opens_after_threshold_and_short_circuits() {
    let provider = Arc::new(MockProvider::fixed(Classification::of(Label::NoMatch)).script(vec![
        Err(ClassifyError::ServerError),
        Err(ClassifyError::ServerError),
        Err(ClassifyError::ServerError),
    ]));
    let client = ClassifyClient::new(provider.clone(), &cfg());

    for _ in 0..3 {
        assert_eq!(
            client.classify("failing text").await.unwrap_err(),
            ClassifyError::ServerError
        );
    }
    assert!(client.breaker_open());

    // Short-circuited: no network I/O happens while open.
    let res = client.classify("while open").await;
    assert_eq!(res.unwrap_err(), ClassifyError::CircuitOpen);
    assert_eq!(provider.calls(), 3);
}

#[tokio::test]
async fn breaker_probes_after_cooldown_and_recovers() {
    let provider = Arc::new(MockProvider::fixed(Classification::of(Label::NoMatch)).script(vec![
        Err(ClassifyError::ServerError),
        Err(ClassifyError::ServerError),
        Err(ClassifyError::ServerError),
    ]));
    let client = ClassifyClient::new(provider.clone(), &cfg());

    for _ in 0..3 {
        let _ = client.classify("failing text").await;
    }
    assert!(client.breaker_open());

    // Cooldown is 1s in this config; wait it out, then the next call is
    // allowed through and its success closes the breaker.
    tokio::time::sleep(Duration::from_millis(1_100)).await;
    let res = client.classify("probe after cooldown").await;
    assert_eq!(res.unwrap().label, Label::NoMatch);
    assert!(!client.breaker_open());
    assert_eq!(provider.calls(), 4);
}
