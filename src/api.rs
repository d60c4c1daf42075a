//! # Messaging Boundary
//! Request/response contract between the core and the options/popup
//! collaborators, served over HTTP. One tagged message envelope mirrors the
//! runtime message shapes the extension pages send; debug and admin routes
//! expose the in-memory state for inspection.

use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::classify::ClassifyError;
use crate::item::{ItemId, ItemState};
use crate::pipeline::ScreenerContext;

#[derive(Clone)]
pub struct AppState {
    pub ctx: Arc<ScreenerContext>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/message", post(message))
        .route("/debug/items", get(debug_items))
        .route("/debug/cache", get(debug_cache))
        .route("/admin/reset", get(admin_reset))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum Message {
    Classify { text: String },
    GenerateSummary { text: String },
    Ping,
    Test,
    UpdateApiKey { key: String },
    ReloadApiKey,
}

#[derive(serde::Serialize)]
#[serde(untagged)]
enum MessageResponse {
    Label {
        label: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    Summary {
        summary: String,
    },
    Pong {
        pong: bool,
    },
    Test {
        success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    Ack {
        success: bool,
    },
}

async fn message(State(state): State<AppState>, Json(msg): Json<Message>) -> Json<MessageResponse> {
    let ctx = &state.ctx;
    let resp = match msg {
        Message::Classify { text } => match ctx.client.classify(&text).await {
            // Fail closed on the wire too: errors come back as no-match plus
            // an error string, never as an HTTP failure.
            Ok(result) => MessageResponse::Label {
                label: result.label.as_str().to_string(),
                error: None,
            },
            Err(e) => MessageResponse::Label {
                label: "no-match".to_string(),
                error: Some(e.to_string()),
            },
        },
        Message::GenerateSummary { text } => {
            let summary = match ctx.client.classify(&text).await {
                Ok(result) => result
                    .annotation
                    .unwrap_or_else(|| format!("🎯 {}", result.label)),
                Err(e) => placeholder_summary(e).to_string(),
            };
            MessageResponse::Summary { summary }
        }
        Message::Ping => MessageResponse::Pong { pong: true },
        Message::Test => {
            if ctx.client.credential_rejected() {
                MessageResponse::Test {
                    success: false,
                    message: None,
                    error: Some("credential invalid".to_string()),
                }
            } else {
                MessageResponse::Test {
                    success: true,
                    message: Some(format!(
                        "provider '{}' ready; circuit {}",
                        ctx.client.provider_name(),
                        if ctx.client.breaker_open() {
                            "open"
                        } else {
                            "closed"
                        }
                    )),
                    error: None,
                }
            }
        }
        Message::UpdateApiKey { key } => {
            ctx.keys.set(key);
            ctx.client.clear_credential_rejected();
            MessageResponse::Ack { success: true }
        }
        Message::ReloadApiKey => {
            let found = ctx.keys.reload_from_env();
            if found {
                ctx.client.clear_credential_rejected();
            }
            MessageResponse::Ack { success: found }
        }
    };
    Json(resp)
}

/// User-visible stand-ins when no summary could be produced, in the same
/// voice the annotations use.
fn placeholder_summary(err: ClassifyError) -> &'static str {
    match err {
        ClassifyError::CircuitOpen => {
            "⏸️ SERVICE PAUSED: too many errors, please wait a few minutes"
        }
        ClassifyError::RateLimited => "🚫 RATE LIMITED: too many requests, try again later",
        ClassifyError::Timeout => "⏱️ TIMEOUT: analysis took too long",
        ClassifyError::MissingKey => "🔧 CONFIG ERROR: no API key configured",
        ClassifyError::Busy => "⏳ BUSY: analyzer at capacity, post skipped",
        _ => "🔧 ANALYSIS FAILED: unable to process this post",
    }
}

#[derive(serde::Serialize)]
struct ItemOut {
    id: ItemId,
    #[serde(flatten)]
    state: ItemState,
}

async fn debug_items(State(state): State<AppState>) -> Json<Vec<ItemOut>> {
    let out = state
        .ctx
        .item_states()
        .into_iter()
        .map(|(id, st)| ItemOut { id, state: st })
        .collect();
    Json(out)
}

#[derive(serde::Serialize)]
struct CacheInfo {
    entries: usize,
}

async fn debug_cache(State(state): State<AppState>) -> Json<CacheInfo> {
    Json(CacheInfo {
        entries: state.ctx.cache.len(),
    })
}

async fn admin_reset(State(state): State<AppState>) -> &'static str {
    state.ctx.reset();
    "reset"
}
