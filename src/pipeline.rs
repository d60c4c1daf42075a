//! # Pipeline Coordinator
//! Wires tracker output into the per-item flow: visible → extract →
//! cache-lookup-or-classify → decide → mutate. All shared mutable state
//! (cache, breaker, credential, item registry) lives in one explicitly
//! constructed context passed in by the caller; there are no ambient
//! module-level singletons.
//!
//! Failure policy is fail closed: an item that cannot be analyzed is
//! `Skipped` and its post is left untouched. Nothing here propagates an
//! error to the caller; a broken classifier must never stall the feed scan.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use sha2::{Digest, Sha256};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cache::FingerprintCache;
use crate::classify::provider::{ClassifierProvider, DisabledProvider, MockProvider, OpenAiProvider};
use crate::classify::{Classification, ClassifyClient, Label};
use crate::config::{ApiKeyStore, ScreenerConfig};
use crate::extract::TextExtractor;
use crate::host::FeedHost;
use crate::item::{FeedItem, ItemId, ItemState, SkipReason};
use crate::mutate::{treatment_for, PostMutator, Treatment};
use crate::triggers::{TriggerConfig, TriggerSet};

/// Short anonymized id for log lines. Raw post text is never logged.
pub(crate) fn anon_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// Everything the pipeline shares across items. Built once at startup,
/// dependency-injected everywhere, reset only on explicit request.
pub struct ScreenerContext {
    pub config: ScreenerConfig,
    pub keys: Arc<ApiKeyStore>,
    pub cache: FingerprintCache,
    pub client: ClassifyClient,
    pub triggers: TriggerSet,
    pub host: Arc<dyn FeedHost>,
    extractor: TextExtractor,
    mutator: PostMutator,
    items: Mutex<HashMap<ItemId, FeedItem>>,
}

impl ScreenerContext {
    pub fn new(
        config: ScreenerConfig,
        triggers: TriggerConfig,
        provider: Arc<dyn ClassifierProvider>,
        host: Arc<dyn FeedHost>,
        keys: Arc<ApiKeyStore>,
    ) -> Arc<Self> {
        let extractor = TextExtractor::new(&config);
        let mutator = PostMutator::new(host.clone(), config.remove_animation());
        let client = ClassifyClient::new(provider, &config);
        Arc::new(Self {
            config,
            keys,
            cache: FingerprintCache::new(),
            client,
            triggers: TriggerSet::new(triggers),
            host,
            extractor,
            mutator,
            items: Mutex::new(HashMap::new()),
        })
    }

    /// Build providers per `config.provider` and assemble the context.
    pub fn from_config(
        config: ScreenerConfig,
        triggers: TriggerConfig,
        host: Arc<dyn FeedHost>,
    ) -> Arc<Self> {
        let keys = Arc::new(ApiKeyStore::from_config(&config));
        let provider: Arc<dyn ClassifierProvider> = match config.provider.as_str() {
            "openai" => Arc::new(OpenAiProvider::new(&config, keys.clone())),
            "mock" => Arc::new(MockProvider::fixed(Classification::of(Label::NoMatch))),
            _ => Arc::new(DisabledProvider),
        };
        Self::new(config, triggers, provider, host, keys)
    }

    /// Explicit user action: forget cached classifications and tracked
    /// item state. The breaker and credential are left as they are.
    pub fn reset(&self) {
        self.cache.clear();
        self.items
            .lock()
            .expect("item registry mutex poisoned")
            .clear();
        info!("screener context reset");
    }

    /// Snapshot of per-item states for the debug surface.
    pub fn item_states(&self) -> Vec<(ItemId, ItemState)> {
        let g = self.items.lock().expect("item registry mutex poisoned");
        let mut out: Vec<_> = g.values().map(|it| (it.id, it.state)).collect();
        out.sort_by_key(|(id, _)| *id);
        out
    }

    fn store(&self, item: &FeedItem) {
        let mut g = self.items.lock().expect("item registry mutex poisoned");
        g.insert(item.id, item.clone());
    }
}

pub struct PipelineCoordinator {
    ctx: Arc<ScreenerContext>,
}

impl PipelineCoordinator {
    pub fn new(ctx: Arc<ScreenerContext>) -> Self {
        Self { ctx }
    }

    /// Consume visible-item events until the channel closes. Items are
    /// processed as independent tasks; the classification client bounds how
    /// many of them can be in flight remotely.
    pub async fn run(&self, mut visible: mpsc::Receiver<ItemId>) {
        while let Some(id) = visible.recv().await {
            let ctx = self.ctx.clone();
            tokio::spawn(async move {
                process(ctx, id).await;
            });
        }
        debug!("visible-item stream closed, coordinator stops");
    }

    /// Run one item to its terminal state (test entry point).
    pub async fn process(&self, id: ItemId) -> ItemState {
        process(self.ctx.clone(), id).await
    }
}

async fn process(ctx: Arc<ScreenerContext>, id: ItemId) -> ItemState {
    // Claim the item under the registry lock: only the task that moves it
    // Unseen → Visible owns it. Duplicate dispatch returns the known state.
    let mut item = {
        let mut g = ctx.items.lock().expect("item registry mutex poisoned");
        let entry = g.entry(id).or_insert_with(|| FeedItem::new(id));
        if entry.state != ItemState::Unseen {
            return entry.state;
        }
        entry.advance(ItemState::Visible);
        entry.clone()
    };

    item.advance(ItemState::Extracting);
    ctx.store(&item);

    let text = ctx.extractor.extract(ctx.host.as_ref(), id);
    if text.is_empty() {
        return finish(&ctx, item, ItemState::Skipped(SkipReason::EmptyText));
    }
    if text.chars().count() < ctx.config.min_text_len {
        return finish(&ctx, item, ItemState::Skipped(SkipReason::TooShort));
    }
    let post = anon_hash(&text);
    item.text = Some(text.clone());

    // Local trigger fast path: no cache, no network.
    if let Some(hit) = ctx.triggers.check(&text) {
        info!(%id, %post, %hit, "local trigger matched");
        item.advance(ItemState::Decided);
        ctx.store(&item);
        return mutate(&ctx, item, Treatment::Remove).await;
    }

    let result = match ctx.cache.get(&text) {
        Some(cached) => {
            debug!(%id, %post, label = %cached.label, "fingerprint cache hit");
            item.advance(ItemState::CacheHit);
            ctx.store(&item);
            cached
        }
        None => {
            item.advance(ItemState::Classifying);
            ctx.store(&item);
            match ctx.client.classify(&text).await {
                Ok(fresh) => {
                    // Known race: two in-flight duplicates both store; the
                    // second overwrite is accepted, results should match.
                    ctx.cache.put(&text, fresh.clone());
                    fresh
                }
                Err(err) => {
                    debug!(%id, %post, %err, "classification failed, failing closed");
                    return finish(&ctx, item, ItemState::Skipped(SkipReason::ClassifyFailed));
                }
            }
        }
    };

    item.advance(ItemState::Decided);
    ctx.store(&item);
    info!(%id, %post, label = %result.label, "post classified");

    match treatment_for(&result) {
        None => finish(&ctx, item, ItemState::Skipped(SkipReason::NoMatch)),
        Some(treatment) => mutate(&ctx, item, treatment).await,
    }
}

async fn mutate(ctx: &ScreenerContext, mut item: FeedItem, treatment: Treatment) -> ItemState {
    let applied = ctx.mutator.apply(&mut item, treatment).await;
    if !applied {
        // The node vanished between extraction and the treatment (scrolled
        // out and recycled by the host). Nothing to change anymore.
        warn!(id = %item.id, "host reported no change, node already gone");
    }
    item.advance(ItemState::Mutated);
    ctx.store(&item);
    ItemState::Mutated
}

fn finish(ctx: &ScreenerContext, mut item: FeedItem, state: ItemState) -> ItemState {
    item.advance(state);
    ctx.store(&item);
    state
}
