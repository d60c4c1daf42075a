// src/lib.rs
// Public library surface for integration tests (and embedding hosts).

pub mod api;
pub mod cache;
pub mod classify;
pub mod config;
pub mod extract;
pub mod host;
pub mod item;
pub mod mutate;
pub mod pipeline;
pub mod tracker;
pub mod triggers;

// ---- Re-exports for stable public API ----
pub use crate::cache::{fingerprint, FingerprintCache};
pub use crate::classify::{Classification, ClassifyClient, ClassifyError, Label};
pub use crate::config::{ApiKeyStore, ScreenerConfig};
pub use crate::host::{FeedHost, HostEvent, MemoryFeed};
pub use crate::item::{FeedItem, ItemId, ItemState, SkipReason};
pub use crate::mutate::{treatment_for, PostMutator, Treatment};
pub use crate::pipeline::{PipelineCoordinator, ScreenerContext};
pub use crate::tracker::{TrackerConfig, VisibilityTracker};
pub use crate::triggers::{TriggerConfig, TriggerSet};

// Convenient access to the router: `feed_screener::api::router` or
// `feed_screener::router`
pub use crate::api::router;
