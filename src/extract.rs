//! # Text Extractor
//! Best-effort plain text from one feed item. Host markup is third-party and
//! unstable, so extraction is layered: a prioritized list of content-region
//! selectors first, then a fallback over all descendant text with known
//! boilerplate stripped. Empty output is a skip signal, never an error.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::ScreenerConfig;
use crate::host::FeedHost;
use crate::item::ItemId;

/// Content-region selectors, most specific first. The first non-empty match
/// of sufficient length wins; order is the policy worth preserving here.
pub const DEFAULT_CONTENT_SELECTORS: &[&str] = &[
    ".update-components-text",
    ".feed-shared-inline-show-more-text",
    ".feed-shared-update-v2__description",
    ".break-words",
];

// Chrome patterns removed by the fallback path, applied in order.
static RE_TIMESTAMP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^\s*\d+\s*(?:h|hr|hrs|d|w|mo|yr)\b\s*(?:•|·)?\s*(?:edited)?\s*$")
        .expect("timestamp regex")
});
// Only the clustered action bar ("Like Comment Share ...") at the end of a
// line is chrome; a lone "like" or "share" in prose must survive.
static RE_ACTIONS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)(?:\b(?:like|comment|repost|share|send|follow)\b[\s·•|]*){2,}$")
        .expect("actions regex")
});
static RE_REACTIONS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b\d[\d,.]*\s*(?:reactions?|comments?|reposts?)\b").expect("reactions regex")
});
static RE_LEAD_NOISE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\s•·\-–—|:,.]+").expect("lead noise regex"));
static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex"));

/// Collapse whitespace runs and trim. Keeps emoji and punctuation as-is;
/// the classifier wants the post as written.
pub fn normalize(text: &str) -> String {
    RE_WS.replace_all(text, " ").trim().to_string()
}

/// Strip interface chrome from a full-subtree text blob.
fn strip_boilerplate(text: &str) -> String {
    let t = RE_TIMESTAMP.replace_all(text, " ");
    let t = RE_REACTIONS.replace_all(&t, " ");
    let t = RE_ACTIONS.replace_all(&t, " ");
    let t = normalize(&t);
    RE_LEAD_NOISE.replace(&t, "").to_string()
}

#[derive(Debug, Clone)]
pub struct TextExtractor {
    selectors: Vec<String>,
    min_len: usize,
}

impl TextExtractor {
    pub fn new(cfg: &ScreenerConfig) -> Self {
        Self {
            selectors: DEFAULT_CONTENT_SELECTORS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            min_len: cfg.min_text_len,
        }
    }

    pub fn with_selectors(mut self, selectors: &[&str]) -> Self {
        self.selectors = selectors.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Normalized text for one item, or an empty string when nothing usable
    /// was found. A structured selector must clear the minimum length to win;
    /// the fallback returns whatever survives boilerplate stripping and the
    /// caller applies the length policy.
    pub fn extract(&self, host: &dyn FeedHost, id: ItemId) -> String {
        for sel in &self.selectors {
            if let Some(raw) = host.region_text(id, sel) {
                let text = normalize(&raw);
                if text.chars().count() >= self.min_len {
                    return text;
                }
            }
        }
        match host.full_text(id) {
            Some(raw) => strip_boilerplate(&raw),
            None => String::new(),
        }
    }
}
