//! # Feed Items
//! Identity, processing flags, and the per-item state machine the pipeline
//! walks. Items are opaque handles into the host feed; identity comes from
//! the host's insertion order, not from any stable server id.

use serde::Serialize;

/// Handle to one unit of feed content. Assigned by the host when the node
/// is first reported; never reused within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ItemId(pub u64);

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "item-{}", self.0)
    }
}

/// Monotonic processing flags. A flag, once set, is never cleared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ItemFlags {
    pub seen: bool,
    pub analyzing: bool,
    pub decided: bool,
    pub mutated: bool,
}

impl ItemFlags {
    pub fn mark_seen(&mut self) {
        self.seen = true;
    }
    pub fn mark_analyzing(&mut self) {
        self.analyzing = true;
    }
    pub fn mark_decided(&mut self) {
        self.decided = true;
    }
    pub fn mark_mutated(&mut self) {
        self.mutated = true;
    }
}

/// Why an item reached the `Skipped` terminal state without a DOM change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipReason {
    /// Extraction produced no usable text.
    EmptyText,
    /// Text exists but is below the minimum-length threshold.
    TooShort,
    /// Remote classification failed; we fail closed and leave the post alone.
    ClassifyFailed,
    /// Classified, but the label carries no treatment.
    NoMatch,
}

/// Pipeline states. `Mutated` and `Skipped` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case", tag = "state", content = "reason")]
pub enum ItemState {
    Unseen,
    Visible,
    Extracting,
    CacheHit,
    Classifying,
    Decided,
    Mutated,
    Skipped(SkipReason),
}

impl ItemState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ItemState::Mutated | ItemState::Skipped(_))
    }
}

/// One tracked unit of feed content with its processing state.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedItem {
    pub id: ItemId,
    pub state: ItemState,
    pub flags: ItemFlags,
    /// Normalized text, filled in once extraction has run.
    pub text: Option<String>,
}

impl FeedItem {
    pub fn new(id: ItemId) -> Self {
        Self {
            id,
            state: ItemState::Unseen,
            flags: ItemFlags::default(),
            text: None,
        }
    }

    /// Advance the state machine. Transitions out of a terminal state are
    /// ignored; the first terminal state wins.
    pub fn advance(&mut self, next: ItemState) {
        if self.state.is_terminal() {
            return;
        }
        self.state = next;
        match next {
            ItemState::Visible => self.flags.mark_seen(),
            ItemState::Classifying => self.flags.mark_analyzing(),
            ItemState::Decided => self.flags.mark_decided(),
            ItemState::Mutated => self.flags.mark_mutated(),
            _ => {}
        }
    }
}
