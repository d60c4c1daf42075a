// tests/api_http.rs
//
// HTTP-level tests for the messaging boundary without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.
//
// Covered:
// - GET /health
// - POST /message ({classify, generateSummary, ping, test, updateApiKey})
// - GET /debug/cache + /admin/reset

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value as Json};
use tower::ServiceExt as _; // for `oneshot`

use feed_screener::api::{self, AppState};
use feed_screener::classify::provider::MockProvider;
use feed_screener::classify::{Classification, Label};
use feed_screener::config::{ApiKeyStore, ScreenerConfig};
use feed_screener::host::MemoryFeed;
use feed_screener::pipeline::ScreenerContext;
use feed_screener::triggers::TriggerConfig;

const BODY_LIMIT: usize = 1024 * 1024; // 1MB, safe for tests

/// Build the same Router the binary uses, with a scripted provider.
fn test_router() -> Router {
    let provider = Arc::new(MockProvider::fixed(Classification::with_annotation(
        Label::HumbleBrag,
        "🤡 HUMBLE BRAG: gratitude-flavored boasting",
    )));
    let ctx = ScreenerContext::new(
        ScreenerConfig::default(),
        TriggerConfig::default(),
        provider,
        Arc::new(MemoryFeed::new()),
        Arc::new(ApiKeyStore::default()),
    );
    api::router(AppState { ctx })
}

async fn post_message(app: Router, payload: Json) -> Json {
    let req = Request::builder()
        .method("POST")
        .uri("/message")
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .expect("build POST /message");
    let resp = app.oneshot(req).await.expect("oneshot /message");
    assert!(
        resp.status().is_success(),
        "POST /message should be 2xx, got {}",
        resp.status()
    );
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    serde_json::from_slice(&bytes).expect("parse message json")
}

#[tokio::test]
async fn api_health_returns_200_and_ok_body() {
    let app = test_router();

    let req = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .expect("build GET /health");

    let resp = app.oneshot(req).await.expect("oneshot /health");
    assert_eq!(resp.status(), StatusCode::OK, "health should be 200");

    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    assert_eq!(String::from_utf8(bytes).expect("utf8").trim(), "ok");
}

#[tokio::test]
async fn api_ping_pongs() {
    let v = post_message(test_router(), json!({ "type": "ping" })).await;
    assert_eq!(v, json!({ "pong": true }));
}

#[tokio::test]
async fn api_classify_returns_label() {
    let v = post_message(
        test_router(),
        json!({ "type": "classify", "text": "So humbled to announce my third award this month." }),
    )
    .await;
    assert_eq!(v.get("label").and_then(Json::as_str), Some("humble-brag"));
    assert!(v.get("error").is_none());
}

#[tokio::test]
async fn api_generate_summary_returns_annotation() {
    let v = post_message(
        test_router(),
        json!({ "type": "generateSummary", "text": "So humbled to announce my third award this month." }),
    )
    .await;
    let summary = v.get("summary").and_then(Json::as_str).expect("summary");
    assert!(summary.contains("HUMBLE BRAG"));
}

#[tokio::test]
async fn api_test_reports_provider_health() {
    let v = post_message(test_router(), json!({ "type": "test" })).await;
    assert_eq!(v.get("success").and_then(Json::as_bool), Some(true));
    let msg = v.get("message").and_then(Json::as_str).expect("message");
    assert!(msg.contains("mock"));
    assert!(msg.contains("circuit closed"));
}

#[tokio::test]
async fn api_update_api_key_acks() {
    let v = post_message(
        test_router(),
        json!({ "type": "updateApiKey", "key": "sk-test-rotated" }),
    )
    .await;
    assert_eq!(v, json!({ "success": true }));
}

#[tokio::test]
async fn api_unknown_message_type_is_rejected() {
    let app = test_router();
    let req = Request::builder()
        .method("POST")
        .uri("/message")
        .header("content-type", "application/json")
        .body(Body::from(json!({ "type": "detonate" }).to_string()))
        .expect("build POST /message");
    let resp = app.oneshot(req).await.expect("oneshot /message");
    assert!(resp.status().is_client_error());
}

#[tokio::test]
async fn api_debug_cache_and_reset() {
    let app = test_router();

    let req = Request::builder()
        .method("GET")
        .uri("/debug/cache")
        .body(Body::empty())
        .expect("build GET /debug/cache");
    let resp = app
        .clone()
        .oneshot(req)
        .await
        .expect("oneshot /debug/cache");
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    let v: Json = serde_json::from_slice(&bytes).expect("cache json");
    assert_eq!(v.get("entries").and_then(Json::as_u64), Some(0));

    let req = Request::builder()
        .method("GET")
        .uri("/admin/reset")
        .body(Body::empty())
        .expect("build GET /admin/reset");
    let resp = app.oneshot(req).await.expect("oneshot /admin/reset");
    assert_eq!(resp.status(), StatusCode::OK);
}
