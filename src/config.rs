//! # Configuration
//! Runtime knobs for the pipeline, loaded from `config/screener.json` with
//! every field defaulted, plus the in-memory credential store. The credential
//! itself is never persisted here; `api_key: "ENV"` resolves from the
//! environment at load time and can be re-resolved via `reload`.

use std::path::Path;
use std::sync::RwLock;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub const DEFAULT_CONFIG_PATH: &str = "config/screener.json";
pub const ENV_API_KEY: &str = "OPENAI_API_KEY";

fn default_min_text_len() -> usize {
    40
}
fn default_max_text_len() -> usize {
    200
}
fn default_visible_fraction() -> f32 {
    0.5
}
fn default_debounce_ms() -> u64 {
    300
}
fn default_max_in_flight() -> usize {
    3
}
fn default_max_attempts() -> u32 {
    3
}
fn default_retry_base_ms() -> u64 {
    1_000
}
fn default_request_timeout_ms() -> u64 {
    10_000
}
fn default_breaker_threshold() -> u32 {
    3
}
fn default_breaker_cooldown_secs() -> i64 {
    300
}
fn default_remove_animation_ms() -> u64 {
    1_000
}
fn default_provider() -> String {
    "disabled".to_string()
}
fn default_api_key() -> String {
    "ENV".to_string()
}
fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenerConfig {
    /// Extracted text shorter than this is skipped without classification.
    #[serde(default = "default_min_text_len")]
    pub min_text_len: usize,
    /// Text is truncated to this length before any remote call.
    #[serde(default = "default_max_text_len")]
    pub max_text_len: usize,
    /// Intersection fraction at which an item counts as visible.
    #[serde(default = "default_visible_fraction")]
    pub visible_fraction: f32,
    /// Insert bursts within this window are coalesced into one batch.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Classification requests in flight at once; excess is shed, not queued.
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_base_ms")]
    pub retry_base_ms: u64,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_breaker_threshold")]
    pub breaker_threshold: u32,
    #[serde(default = "default_breaker_cooldown_secs")]
    pub breaker_cooldown_secs: i64,
    /// Removal animation duration; the node is detached once it elapses.
    #[serde(default = "default_remove_animation_ms")]
    pub remove_animation_ms: u64,
    /// "openai" | "mock" | "disabled" (case-insensitive)
    #[serde(default = "default_provider")]
    pub provider: String,
    /// "ENV" means: read from OPENAI_API_KEY at load time.
    #[serde(default = "default_api_key")]
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
}

impl Default for ScreenerConfig {
    fn default() -> Self {
        serde_json::from_str("{}").expect("defaults deserialize")
    }
}

impl ScreenerConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let mut cfg: ScreenerConfig = serde_json::from_str(&data)?;
        cfg.provider = cfg.provider.to_lowercase();
        if !(0.0..=1.0).contains(&cfg.visible_fraction) {
            cfg.visible_fraction = default_visible_fraction();
        }
        Ok(cfg)
    }

    /// Load from `path`, falling back to defaults when the file is missing
    /// or malformed (a broken config must not take the whole screener down).
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load_from_file(&path) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!(error = %e, "screener config not loaded, using defaults");
                Self::default()
            }
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
    pub fn retry_base(&self) -> Duration {
        Duration::from_millis(self.retry_base_ms)
    }
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
    pub fn remove_animation(&self) -> Duration {
        Duration::from_millis(self.remove_animation_ms)
    }
}

/// Single in-memory copy of the externally-owned credential.
///
/// The options collaborator pushes updates (`updateApiKey`) or asks for a
/// re-read from the environment (`reloadApiKey`); nothing here writes the
/// key anywhere.
#[derive(Debug, Default)]
pub struct ApiKeyStore {
    key: RwLock<Option<String>>,
}

impl ApiKeyStore {
    /// Resolve the key per config: "ENV" reads the environment, anything
    /// else is taken literally (test configs), empty means absent.
    pub fn from_config(cfg: &ScreenerConfig) -> Self {
        let store = Self::default();
        if cfg.api_key.trim().eq_ignore_ascii_case("env") {
            store.reload_from_env();
        } else if !cfg.api_key.trim().is_empty() {
            store.set(cfg.api_key.trim().to_string());
        }
        store
    }

    pub fn set(&self, key: String) {
        let mut g = self.key.write().expect("api key rwlock poisoned");
        *g = Some(key);
        info!("api key updated");
    }

    /// Re-read from the environment. Returns true when a key was found.
    pub fn reload_from_env(&self) -> bool {
        match std::env::var(ENV_API_KEY) {
            Ok(v) if !v.trim().is_empty() => {
                let mut g = self.key.write().expect("api key rwlock poisoned");
                *g = Some(v);
                info!("api key reloaded from environment");
                true
            }
            _ => {
                warn!("no {} in environment on reload", ENV_API_KEY);
                false
            }
        }
    }

    pub fn current(&self) -> Option<String> {
        self.key.read().expect("api key rwlock poisoned").clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn defaults_are_sane() {
        let cfg = ScreenerConfig::default();
        assert_eq!(cfg.min_text_len, 40);
        assert_eq!(cfg.max_in_flight, 3);
        assert_eq!(cfg.breaker_threshold, 3);
        assert_eq!(cfg.provider, "disabled");
        assert_eq!(cfg.request_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let cfg = ScreenerConfig::load_or_default("does/not/exist.json");
        assert_eq!(cfg.max_text_len, 200);
    }

    #[test]
    #[serial]
    fn literal_key_and_update() {
        let cfg = ScreenerConfig {
            api_key: "sk-test-literal".into(),
            ..ScreenerConfig::default()
        };
        let store = ApiKeyStore::from_config(&cfg);
        assert_eq!(store.current().as_deref(), Some("sk-test-literal"));
        store.set("sk-test-updated".into());
        assert_eq!(store.current().as_deref(), Some("sk-test-updated"));
    }

    #[test]
    #[serial]
    fn env_key_reload() {
        std::env::remove_var(ENV_API_KEY);
        let store = ApiKeyStore::default();
        assert!(!store.reload_from_env());
        std::env::set_var(ENV_API_KEY, "sk-test-env");
        assert!(store.reload_from_env());
        assert_eq!(store.current().as_deref(), Some("sk-test-env"));
        std::env::remove_var(ENV_API_KEY);
    }
}
