//! Provider seam: the real remote classifier plus mock/disabled stand-ins.
//! Separated from the client wrapper so bounding, retry, and breaker logic
//! are exercised identically in production and tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::ClassifyError;
use super::{Classification, Label};
use crate::config::{ApiKeyStore, ScreenerConfig};

#[async_trait]
pub trait ClassifierProvider: Send + Sync {
    /// One remote call: text in, label + optional annotation out. The
    /// wrapper owns timeout, retries, bounding, and the breaker.
    async fn fetch(&self, text: &str) -> Result<Classification, ClassifyError>;
    /// Provider name for diagnostics/health checks.
    fn name(&self) -> &'static str;
}

// ------------------------------------------------------------
// OpenAI
// ------------------------------------------------------------

const SYSTEM_PROMPT: &str = "You are a social feed post classifier. Classify the post into exactly one of: \
promotional-hype, humble-brag, generic-motivational, no-match. \
Reply on a single line as `<label> | <summary>` where <summary> is a short, \
punchy description (max 80 chars) of what the post is really doing. \
For no-match, the summary may be empty.";

pub struct OpenAiProvider {
    http: reqwest::Client,
    keys: Arc<ApiKeyStore>,
    model: String,
}

impl OpenAiProvider {
    pub fn new(cfg: &ScreenerConfig, keys: Arc<ApiKeyStore>) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("feed-screener/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(cfg.request_timeout())
            .build()
            .expect("reqwest client");
        Self {
            http,
            keys,
            model: cfg.model.clone(),
        }
    }
}

/// Split the model's `<label> | <summary>` line. A missing separator is
/// treated as a bare label; an unknown label fails closed via `Label::parse`.
fn parse_reply(content: &str) -> Classification {
    let line = content.trim().trim_matches(|c| c == '"' || c == '\'');
    let (label_part, rest) = match line.split_once('|') {
        Some((l, r)) => (l, r.trim()),
        None => (line, ""),
    };
    let label = Label::parse(label_part);
    let annotation = if rest.is_empty() {
        None
    } else {
        Some(rest.chars().take(80).collect())
    };
    Classification { label, annotation }
}

#[async_trait]
impl ClassifierProvider for OpenAiProvider {
    async fn fetch(&self, text: &str) -> Result<Classification, ClassifyError> {
        let api_key = self.keys.current().ok_or(ClassifyError::MissingKey)?;

        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            temperature: f32,
            max_tokens: u32,
        }
        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            content: String,
        }

        let req = Req {
            model: &self.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                Msg {
                    role: "user",
                    content: text,
                },
            ],
            temperature: 0.2,
            max_tokens: 100,
        };

        let resp = self
            .http
            .post("https://api.openai.com/v1/chat/completions")
            .bearer_auth(&api_key)
            .json(&req)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ClassifyError::Timeout
                } else {
                    ClassifyError::ServerError
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(match status.as_u16() {
                401 | 403 => ClassifyError::Unauthorized,
                429 => ClassifyError::RateLimited,
                s if s >= 500 => ClassifyError::ServerError,
                _ => ClassifyError::MalformedResponse,
            });
        }

        let body: Resp = resp
            .json()
            .await
            .map_err(|_| ClassifyError::MalformedResponse)?;
        let content = body
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .ok_or(ClassifyError::MalformedResponse)?;
        let parsed = parse_reply(content);
        debug!(label = %parsed.label, "provider reply parsed");
        Ok(parsed)
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

// ------------------------------------------------------------
// Disabled / mock
// ------------------------------------------------------------

/// Always fails with `MissingKey`; the pipeline fails closed and leaves
/// posts alone. Used when classification is switched off in config.
pub struct DisabledProvider;

#[async_trait]
impl ClassifierProvider for DisabledProvider {
    async fn fetch(&self, _text: &str) -> Result<Classification, ClassifyError> {
        Err(ClassifyError::MissingKey)
    }
    fn name(&self) -> &'static str {
        "disabled"
    }
}

/// Scripted provider for tests and local runs: pops queued responses first,
/// then falls back to a fixed result. Optionally sleeps per call so tests
/// can hold requests in flight.
pub struct MockProvider {
    fixed: Classification,
    delay: Duration,
    script: Mutex<VecDeque<Result<Classification, ClassifyError>>>,
    calls: AtomicUsize,
}

impl MockProvider {
    pub fn fixed(result: Classification) -> Self {
        Self {
            fixed: result,
            delay: Duration::ZERO,
            script: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Queue responses consumed before the fixed fallback.
    pub fn script(self, responses: Vec<Result<Classification, ClassifyError>>) -> Self {
        *self.script.lock().expect("script mutex poisoned") = responses.into();
        self
    }

    /// How many fetches actually reached this provider.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClassifierProvider for MockProvider {
    async fn fetch(&self, _text: &str) -> Result<Classification, ClassifyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let scripted = self.script.lock().expect("script mutex poisoned").pop_front();
        match scripted {
            Some(r) => r,
            None => Ok(self.fixed.clone()),
        }
    }
    fn name(&self) -> &'static str {
        "mock"
    }
}
