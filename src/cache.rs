//! # Fingerprint Cache
//! Session-scoped map from a text fingerprint to the classification already
//! obtained for it, so duplicate content (reposts, re-rendered nodes) never
//! pays for a second remote call. Unbounded on purpose: cleared only by
//! explicit user action or process restart.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Mutex;

use crate::classify::Classification;

/// Fast non-cryptographic digest of normalized text. Collisions are accepted
/// risk for a cache key; no crypto hash needed here.
pub fn fingerprint(text: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    hasher.finish()
}

#[derive(Debug, Default)]
pub struct FingerprintCache {
    inner: Mutex<HashMap<u64, Classification>>,
}

impl FingerprintCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, text: &str) -> Option<Classification> {
        let g = self.inner.lock().expect("cache mutex poisoned");
        g.get(&fingerprint(text)).cloned()
    }

    /// Last writer wins: two concurrently-classifying duplicates may both
    /// store; results for identical text are expected to match anyway.
    pub fn put(&self, text: &str, result: Classification) {
        let mut g = self.inner.lock().expect("cache mutex poisoned");
        g.insert(fingerprint(text), result);
    }

    pub fn clear(&self) {
        let mut g = self.inner.lock().expect("cache mutex poisoned");
        g.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("cache mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
