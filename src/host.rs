//! # Host Capabilities
//! The pipeline never touches a real DOM. The host page (or a test harness)
//! supplies read/write capabilities for feed nodes plus a stream of
//! observation events; everything else is CSS-selector-shaped heuristics
//! that may need periodic updating when the host markup shifts.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::item::ItemId;

/// Observation events produced by the host's mutation/intersection facility.
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    /// Descendant nodes matching the "looks like a post" predicate were
    /// inserted into the watched container.
    NodesInserted { ids: Vec<ItemId> },
    /// A registered node's visible fraction changed.
    Intersection { id: ItemId, visible_fraction: f32 },
    /// The watched container itself was removed. Tracking stops silently.
    ContainerRemoved,
}

/// DOM read/write surface for one feed container.
///
/// `replace_content` must preserve a path back to the original text on the
/// host side (the annotation is rendered, the original stays expandable).
pub trait FeedHost: Send + Sync {
    /// Text of the first descendant region matching `selector`, if any.
    fn region_text(&self, id: ItemId, selector: &str) -> Option<String>;
    /// All descendant text of the item, interface chrome included.
    fn full_text(&self, id: ItemId) -> Option<String>;
    /// Detach the item from the document. Returns false if already gone.
    fn detach(&self, id: ItemId) -> bool;
    /// Substitute the item's rendered content with a short annotation.
    fn replace_content(&self, id: ItemId, annotation: &str) -> bool;
    /// Whether the node still exists in the document.
    fn is_attached(&self, id: ItemId) -> bool;
}

/// In-memory feed used by tests, and as the no-op host for server-only runs.
/// Posts are scripted: per-selector region texts plus a full-text blob.
#[derive(Debug, Default)]
pub struct MemoryFeed {
    inner: Mutex<HashMap<ItemId, MemoryPost>>,
}

#[derive(Debug, Clone, Default)]
struct MemoryPost {
    regions: HashMap<String, String>,
    full_text: String,
    attached: bool,
    replacement: Option<String>,
}

impl MemoryFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a post whose content regions and chrome-polluted full text are
    /// given explicitly.
    pub fn add_post(&self, id: ItemId, regions: &[(&str, &str)], full_text: &str) {
        let mut g = self.inner.lock().expect("memory feed mutex poisoned");
        g.insert(
            id,
            MemoryPost {
                regions: regions
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                full_text: full_text.to_string(),
                attached: true,
                replacement: None,
            },
        );
    }

    /// Convenience: a post whose only content is `text` (no structured
    /// regions, so extraction goes through the fallback path).
    pub fn add_plain_post(&self, id: ItemId, text: &str) {
        self.add_post(id, &[], text);
    }

    pub fn replacement(&self, id: ItemId) -> Option<String> {
        let g = self.inner.lock().expect("memory feed mutex poisoned");
        g.get(&id).and_then(|p| p.replacement.clone())
    }

    pub fn is_detached(&self, id: ItemId) -> bool {
        !self.is_attached(id)
    }
}

impl FeedHost for MemoryFeed {
    fn region_text(&self, id: ItemId, selector: &str) -> Option<String> {
        let g = self.inner.lock().expect("memory feed mutex poisoned");
        let post = g.get(&id)?;
        if !post.attached {
            return None;
        }
        post.regions.get(selector).cloned()
    }

    fn full_text(&self, id: ItemId) -> Option<String> {
        let g = self.inner.lock().expect("memory feed mutex poisoned");
        let post = g.get(&id)?;
        if !post.attached {
            return None;
        }
        Some(post.full_text.clone())
    }

    fn detach(&self, id: ItemId) -> bool {
        let mut g = self.inner.lock().expect("memory feed mutex poisoned");
        match g.get_mut(&id) {
            Some(post) if post.attached => {
                post.attached = false;
                true
            }
            _ => false,
        }
    }

    fn replace_content(&self, id: ItemId, annotation: &str) -> bool {
        let mut g = self.inner.lock().expect("memory feed mutex poisoned");
        match g.get_mut(&id) {
            Some(post) if post.attached => {
                // Original text stays in place behind the annotation.
                post.replacement = Some(annotation.to_string());
                true
            }
            _ => false,
        }
    }

    fn is_attached(&self, id: ItemId) -> bool {
        let g = self.inner.lock().expect("memory feed mutex poisoned");
        g.get(&id).map(|p| p.attached).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detach_is_single_shot() {
        let feed = MemoryFeed::new();
        feed.add_plain_post(ItemId(1), "hello");
        assert!(feed.detach(ItemId(1)));
        assert!(!feed.detach(ItemId(1)), "second detach must report false");
        assert!(feed.is_detached(ItemId(1)));
    }

    #[test]
    fn replace_keeps_original_text() {
        let feed = MemoryFeed::new();
        feed.add_plain_post(ItemId(2), "original words");
        assert!(feed.replace_content(ItemId(2), "short note"));
        assert_eq!(feed.replacement(ItemId(2)).as_deref(), Some("short note"));
        // Expandable path back to the original.
        assert_eq!(feed.full_text(ItemId(2)).as_deref(), Some("original words"));
    }

    #[test]
    fn detached_posts_read_as_absent() {
        let feed = MemoryFeed::new();
        feed.add_post(ItemId(3), &[("p", "body")], "body");
        feed.detach(ItemId(3));
        assert!(feed.region_text(ItemId(3), "p").is_none());
        assert!(feed.full_text(ItemId(3)).is_none());
        assert!(!feed.replace_content(ItemId(3), "late"));
    }
}
