//! # Visibility Tracker
//! Watches one feed container through the host's event stream: newly
//! inserted nodes are registered for intersection observation (cost deferred
//! until the item scrolls into view), insert bursts are coalesced through a
//! debounce window, and each item is emitted downstream exactly once.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::debug;

use crate::config::ScreenerConfig;
use crate::host::HostEvent;
use crate::item::ItemId;

#[derive(Debug, Clone)]
pub struct TrackerConfig {
    pub visible_fraction: f32,
    pub debounce: Duration,
}

impl From<&ScreenerConfig> for TrackerConfig {
    fn from(cfg: &ScreenerConfig) -> Self {
        Self {
            visible_fraction: cfg.visible_fraction,
            debounce: cfg.debounce(),
        }
    }
}

pub struct VisibilityTracker {
    cfg: TrackerConfig,
    tracking: AtomicBool,
}

impl VisibilityTracker {
    pub fn new(cfg: TrackerConfig) -> Self {
        Self {
            cfg,
            tracking: AtomicBool::new(false),
        }
    }

    /// Begin watching a container's event stream. Returns the stream of
    /// items that crossed the visibility threshold, or `None` if this
    /// tracker is already watching a container (inner containers must not
    /// be tracked twice).
    ///
    /// Tracking stops silently when the event stream closes or the
    /// container is removed; no error is raised.
    pub fn track(&self, events: mpsc::Receiver<HostEvent>) -> Option<mpsc::Receiver<ItemId>> {
        if self.tracking.swap(true, Ordering::SeqCst) {
            debug!("container already tracked, ignoring");
            return None;
        }
        let (tx, rx) = mpsc::channel(64);
        let cfg = self.cfg.clone();
        tokio::spawn(run(cfg, events, tx));
        Some(rx)
    }
}

async fn run(cfg: TrackerConfig, mut events: mpsc::Receiver<HostEvent>, tx: mpsc::Sender<ItemId>) {
    // Registered for intersection observation (inserted, not yet seen).
    let mut registered: HashSet<ItemId> = HashSet::new();
    // Carries the `seen` flag; later intersection events are ignored.
    let mut seen: HashSet<ItemId> = HashSet::new();
    // Insert burst being coalesced.
    let mut pending: Vec<ItemId> = Vec::new();
    // Best intersection fraction reported for an id still in `pending`.
    // A host may fire the only intersection an item ever gets right after
    // insertion, inside the debounce window; it is replayed at flush time.
    let mut early: HashMap<ItemId, f32> = HashMap::new();
    let mut deadline: Option<Instant> = None;

    loop {
        tokio::select! {
            ev = events.recv() => match ev {
                None | Some(HostEvent::ContainerRemoved) => {
                    debug!("container gone, tracking stops");
                    break;
                }
                Some(HostEvent::NodesInserted { ids }) => {
                    pending.extend(ids);
                    deadline = Some(Instant::now() + cfg.debounce);
                }
                Some(HostEvent::Intersection { id, visible_fraction }) => {
                    if registered.contains(&id) {
                        if visible_fraction >= cfg.visible_fraction
                            && seen.insert(id)
                            && tx.send(id).await.is_err()
                        {
                            break; // consumer gone
                        }
                    } else if pending.contains(&id) {
                        let best = early.entry(id).or_insert(visible_fraction);
                        *best = (*best).max(visible_fraction);
                    }
                }
            },
            _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)),
                if deadline.is_some() =>
            {
                debug!(batch = pending.len(), "insert burst registered");
                registered.extend(pending.drain(..));
                deadline = None;
                let mut gone = false;
                for (id, fraction) in early.drain() {
                    if fraction >= cfg.visible_fraction
                        && seen.insert(id)
                        && tx.send(id).await.is_err()
                    {
                        gone = true;
                        break;
                    }
                }
                if gone {
                    break; // consumer gone
                }
            }
        }
    }
}
