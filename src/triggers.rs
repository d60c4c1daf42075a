//! # Local Triggers
//! Zero-network fast path: keyword phrases, single-emoji triggers, and a
//! hashtag-density rule decide "remove" locally before the cache or the
//! remote classifier are consulted. Config comes from `config/triggers.toml`
//! with compiled defaults when the file is absent.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::path::Path;
use tracing::warn;

pub const DEFAULT_TRIGGERS_PATH: &str = "config/triggers.toml";

static RE_HASHTAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)#[a-z0-9_]+\b").expect("hashtag regex"));

#[derive(Debug, Clone, Deserialize)]
pub struct TriggerConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_keywords")]
    pub keywords: Vec<String>,
    #[serde(default = "default_emoji")]
    pub emoji: Vec<String>,
    /// Minimum hashtag count before density alone matches. One innocuous
    /// tag should not nuke a post.
    #[serde(default = "default_min_hashtags")]
    pub min_hashtags: usize,
}

fn default_enabled() -> bool {
    true
}
fn default_keywords() -> Vec<String> {
    [
        "changed the game",
        "changed the ai game",
        "that changed everything",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
fn default_emoji() -> Vec<String> {
    ["💸", "🛑", "🚀"].iter().map(|s| s.to_string()).collect()
}
fn default_min_hashtags() -> usize {
    3
}

impl Default for TriggerConfig {
    fn default() -> Self {
        toml::from_str("").expect("defaults deserialize")
    }
}

impl TriggerConfig {
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match std::fs::read_to_string(&path) {
            Ok(s) => match toml::from_str(&s) {
                Ok(cfg) => cfg,
                Err(e) => {
                    warn!(error = %e, "trigger config malformed, using defaults");
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }
}

/// What matched, for logging and for the mutator's treatment note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerHit {
    Keyword(String),
    Emoji(String),
    HashtagDensity(usize),
}

impl std::fmt::Display for TriggerHit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TriggerHit::Keyword(k) => write!(f, "keyword '{k}'"),
            TriggerHit::Emoji(e) => write!(f, "emoji {e}"),
            TriggerHit::HashtagDensity(n) => write!(f, "{n} hashtags"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TriggerSet {
    cfg: TriggerConfig,
}

impl TriggerSet {
    pub fn new(cfg: TriggerConfig) -> Self {
        Self { cfg }
    }

    /// First match wins, in config order: keywords (case-insensitive),
    /// emoji (exact), then hashtag density.
    pub fn check(&self, text: &str) -> Option<TriggerHit> {
        if !self.cfg.enabled {
            return None;
        }
        let lower = text.to_lowercase();
        for kw in &self.cfg.keywords {
            if !kw.is_empty() && lower.contains(&kw.to_lowercase()) {
                return Some(TriggerHit::Keyword(kw.clone()));
            }
        }
        for emoji in &self.cfg.emoji {
            if !emoji.is_empty() && text.contains(emoji.as_str()) {
                return Some(TriggerHit::Emoji(emoji.clone()));
            }
        }
        let tags = RE_HASHTAG.find_iter(text).count();
        if self.cfg.min_hashtags > 0 && tags >= self.cfg.min_hashtags {
            return Some(TriggerHit::HashtagDensity(tags));
        }
        None
    }
}

impl Default for TriggerSet {
    fn default() -> Self {
        Self::new(TriggerConfig::default())
    }
}
