//! # Post Mutator
//! Applies the decided treatment to a matched item, exactly once. The
//! terminal flag is set before any visible change so a concurrent duplicate
//! trigger cannot double-apply.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::classify::{Classification, Label};
use crate::host::FeedHost;
use crate::item::FeedItem;

/// What to do with a matched post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Treatment {
    /// Brief directional animation, then detach from the document.
    Remove,
    /// Substitute the rendered content with a short annotation; the host
    /// keeps the original text expandable.
    Replace { annotation: String },
}

/// Map a classification onto a treatment. `None` means leave the post
/// alone (terminal `Skipped`, no DOM change).
pub fn treatment_for(result: &Classification) -> Option<Treatment> {
    match result.label {
        Label::PromotionalHype => Some(Treatment::Remove),
        Label::HumbleBrag | Label::GenericMotivational => Some(Treatment::Replace {
            annotation: result
                .annotation
                .clone()
                .unwrap_or_else(|| default_annotation(result.label).to_string()),
        }),
        Label::NoMatch => None,
    }
}

fn default_annotation(label: Label) -> &'static str {
    match label {
        Label::HumbleBrag => "🤡 HUMBLE BRAG: gratitude-flavored boasting",
        Label::GenericMotivational => "🎭 FAKE DEEP: motivation by the yard",
        _ => "🎯 screened",
    }
}

pub struct PostMutator {
    host: Arc<dyn FeedHost>,
    remove_delay: Duration,
}

impl PostMutator {
    pub fn new(host: Arc<dyn FeedHost>, remove_delay: Duration) -> Self {
        Self { host, remove_delay }
    }

    /// Apply `treatment` to `item`. Idempotent: a second call on an
    /// already-mutated item is a no-op and returns false.
    pub async fn apply(&self, item: &mut FeedItem, treatment: Treatment) -> bool {
        if item.flags.mutated {
            return false;
        }
        // Terminal flag first, visible change second.
        item.flags.mark_mutated();

        match treatment {
            Treatment::Remove => {
                // The host plays its removal animation for this long; the
                // node is detached once the animation ends.
                tokio::time::sleep(self.remove_delay).await;
                let gone = self.host.detach(item.id);
                debug!(id = %item.id, gone, "remove treatment applied");
                gone
            }
            Treatment::Replace { annotation } => {
                let done = self.host.replace_content(item.id, &annotation);
                debug!(id = %item.id, done, "replace treatment applied");
                done
            }
        }
    }
}
