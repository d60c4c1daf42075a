//! Feed Screener — Binary Entrypoint
//! Boots the Axum HTTP server that carries the messaging boundary for the
//! options/popup collaborators. The DOM-side pipeline is a library concern;
//! this process serves classification over the wire and holds the shared
//! context (cache, breaker, credential).

use std::sync::Arc;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use feed_screener::api::{self, AppState};
use feed_screener::config::{ScreenerConfig, DEFAULT_CONFIG_PATH};
use feed_screener::host::MemoryFeed;
use feed_screener::pipeline::ScreenerContext;
use feed_screener::triggers::{TriggerConfig, DEFAULT_TRIGGERS_PATH};

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("feed_screener=info,warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let config = ScreenerConfig::load_or_default(DEFAULT_CONFIG_PATH);
    let triggers = TriggerConfig::load_or_default(DEFAULT_TRIGGERS_PATH);

    // Server-only runs have no real feed; the memory host stands in.
    let host = Arc::new(MemoryFeed::new());
    let ctx = ScreenerContext::from_config(config, triggers, host);

    let router = api::router(AppState { ctx });

    let addr = std::env::var("SCREENER_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "feed-screener listening");
    axum::serve(listener, router).await?;
    Ok(())
}
