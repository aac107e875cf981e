//! Fetch-and-update orchestration.
//!
//! `refresh_symbol` is the single path every trigger funnels through: WS
//! subscriptions, scheduler ticks and the manual refresh endpoint. It runs
//! bootstrap admission best-effort, fetches through the fallback pipeline,
//! merges into the cached snapshot, spools persistence and fans the update
//! out to subscribers. Persistence runs on a dedicated drain task fed by a
//! bounded channel so a slow database never stalls the feed.
//!
//! Callers pass symbols already uppercased.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::bootstrap::SymbolBootstrapper;
use crate::cache::PriceCache;
use crate::config::RefreshConfig;
use crate::db::{HistoryInsert, SymbolStore, SymbolUpsert};
use crate::hub::BroadcastHub;
use crate::models::{PriceSnapshot, QuoteSource};
use crate::pipeline::{FetchPipeline, merge_quote};
use crate::simulation::PriceSimulator;

/// Pending writes the spool will hold before dropping new ones.
const PERSIST_SPOOL_CAPACITY: usize = 256;

/// Event fanned out to room subscribers after every snapshot update.
#[derive(Debug, Clone)]
pub struct PriceUpdate {
    /// The merged snapshot.
    pub snapshot: PriceSnapshot,
    /// Category id from bootstrap metadata, when classified.
    pub category_id: Option<Uuid>,
    /// Category name from bootstrap metadata, when classified.
    pub category_name: Option<String>,
}

struct PersistJob {
    upsert: SymbolUpsert,
    history: HistoryInsert,
}

/// Orchestrates quote refreshes for the whole service.
pub struct UpdateEngine {
    refresh: RefreshConfig,
    cache: Arc<PriceCache>,
    hub: Arc<BroadcastHub<PriceUpdate>>,
    pipeline: Arc<FetchPipeline>,
    simulator: PriceSimulator,
    bootstrap: Option<Arc<SymbolBootstrapper>>,
    persist_tx: Option<mpsc::Sender<PersistJob>>,
}

impl UpdateEngine {
    /// Creates the engine and, when a store is given, starts its persistence
    /// drain task.
    #[must_use]
    pub fn new(
        refresh: RefreshConfig,
        cache: Arc<PriceCache>,
        hub: Arc<BroadcastHub<PriceUpdate>>,
        pipeline: Arc<FetchPipeline>,
        simulator: PriceSimulator,
        bootstrap: Option<Arc<SymbolBootstrapper>>,
        store: Option<Arc<dyn SymbolStore>>,
    ) -> Self {
        let persist_tx = store.map(|store| {
            let (tx, rx) = mpsc::channel(PERSIST_SPOOL_CAPACITY);
            tokio::spawn(drain_persistence(store, rx));
            tx
        });

        Self {
            refresh,
            cache,
            hub,
            pipeline,
            simulator,
            bootstrap,
            persist_tx,
        }
    }

    /// Refreshes one symbol: fetch, merge, cache, spool persistence and
    /// publish. With no provider data the cache is left untouched; a
    /// simulated quote fills in only when `allow_simulation` is set and the
    /// simulator is enabled. Returns the new snapshot, or `None` when there
    /// was nothing to update with.
    pub async fn refresh_symbol(
        &self,
        symbol: &str,
        allow_simulation: bool,
    ) -> Option<PriceSnapshot> {
        if let Some(bootstrap) = &self.bootstrap {
            // Admission never gates the feed.
            bootstrap.ensure_known(symbol).await;
        }

        let previous = self.cache.get(symbol);
        let (snapshot, quote_time) = match self.pipeline.fetch_quote(symbol).await {
            Some(sourced) => {
                let snapshot = merge_quote(
                    symbol,
                    previous.as_ref(),
                    &sourced.quote,
                    QuoteSource::External,
                    Some(sourced.provider),
                );
                (snapshot, sourced.quote.timestamp)
            }
            None if allow_simulation && self.simulator.is_enabled() => {
                debug!(symbol, "no provider data, simulating");
                let quote = self.simulator.step(previous.as_ref().map(|p| p.price));
                let snapshot = merge_quote(
                    symbol,
                    previous.as_ref(),
                    &quote,
                    QuoteSource::Simulation,
                    None,
                );
                (snapshot, None)
            }
            None => {
                debug!(symbol, "no provider data, cache left unchanged");
                return None;
            }
        };

        self.cache.set(snapshot.clone());
        self.spool_persistence(&snapshot, quote_time);
        self.publish(snapshot.clone());
        Some(snapshot)
    }

    /// Refreshes every currently subscribed symbol, sequentially.
    pub async fn refresh_subscribed(&self) {
        let symbols = self.cache.subscribed_symbols();
        if symbols.is_empty() {
            return;
        }
        debug!(count = symbols.len(), "refreshing subscribed symbols");
        for symbol in symbols {
            let _ = self.refresh_symbol(&symbol, true).await;
        }
    }

    /// Periodic refresh of all subscribed symbols until shutdown.
    pub async fn run_refresh_loop(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(Duration::from_secs(self.refresh.interval_secs));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(
            interval_secs = self.refresh.interval_secs,
            "refresh loop started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => self.refresh_subscribed().await,
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("refresh loop stopped");
                        return;
                    }
                }
            }
        }
    }

    /// Hourly-by-default sweep logging cache and hub sizes until shutdown.
    pub async fn run_maintenance_loop(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(Duration::from_secs(self.refresh.maintenance_interval_secs));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let cache = self.cache.stats();
                    let hub = self.hub.stats();
                    info!(
                        cache_size = cache.size,
                        subscriptions = cache.subscription_count,
                        clients = hub.clients,
                        "maintenance sweep"
                    );
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("maintenance loop stopped");
                        return;
                    }
                }
            }
        }
    }

    fn spool_persistence(
        &self,
        snapshot: &PriceSnapshot,
        quote_time: Option<chrono::DateTime<chrono::Utc>>,
    ) {
        let Some(tx) = &self.persist_tx else {
            return;
        };

        let job = PersistJob {
            upsert: snapshot_upsert(snapshot),
            history: HistoryInsert {
                symbol: snapshot.symbol.clone(),
                price: snapshot.price,
                volume: Some(snapshot.volume),
                source: snapshot.source.to_string(),
                provider: snapshot.provider.clone(),
                quote_time,
            },
        };
        if tx.try_send(job).is_err() {
            warn!(symbol = %snapshot.symbol, "persistence spool full, dropping write");
        }
    }

    /// Wraps a snapshot with the category metadata bootstrap holds for its
    /// symbol. Used for every published update and for snapshot-on-subscribe.
    #[must_use]
    pub fn enrich(&self, snapshot: PriceSnapshot) -> PriceUpdate {
        let meta = self
            .bootstrap
            .as_ref()
            .and_then(|bootstrap| bootstrap.meta(&snapshot.symbol))
            .unwrap_or_default();
        PriceUpdate {
            snapshot,
            category_id: meta.category_id,
            category_name: meta.category_name,
        }
    }

    fn publish(&self, snapshot: PriceSnapshot) {
        let symbol = snapshot.symbol.clone();
        let update = self.enrich(snapshot);
        let delivered = self.hub.publish(&symbol, &update);
        debug!(symbol, delivered, "price update published");
    }
}

fn snapshot_upsert(snapshot: &PriceSnapshot) -> SymbolUpsert {
    SymbolUpsert {
        symbol: snapshot.symbol.clone(),
        price: Some(snapshot.price),
        change: Some(snapshot.change),
        change_percent: Some(snapshot.change_percent),
        volume: Some(snapshot.volume),
        high: Some(snapshot.high),
        low: Some(snapshot.low),
        open: Some(snapshot.open),
        previous_close: Some(snapshot.previous_close),
        source: Some(snapshot.source.to_string()),
        provider: snapshot.provider.clone(),
        ..Default::default()
    }
}

async fn drain_persistence(store: Arc<dyn SymbolStore>, mut rx: mpsc::Receiver<PersistJob>) {
    while let Some(job) = rx.recv().await {
        if let Err(e) = store.upsert_symbol_snapshot(&job.upsert).await {
            warn!(symbol = %job.upsert.symbol, error = %e, "symbol upsert failed");
        }
        if let Err(e) = store.insert_history_row(&job.history).await {
            warn!(symbol = %job.history.symbol, error = %e, "history insert failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationConfig;
    use crate::db::MemoryStore;
    use crate::providers::{ProviderError, ProviderQuote, QuoteProvider};
    use async_trait::async_trait;
    use chrono::Utc;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedProvider {
        quote: Mutex<Option<ProviderQuote>>,
        calls: AtomicUsize,
    }

    impl ScriptedProvider {
        fn new(quote: Option<ProviderQuote>) -> Arc<Self> {
            Arc::new(Self {
                quote: Mutex::new(quote),
                calls: AtomicUsize::new(0),
            })
        }

        fn set_quote(&self, quote: Option<ProviderQuote>) {
            *self.quote.lock() = quote;
        }
    }

    #[async_trait]
    impl QuoteProvider for ScriptedProvider {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn fetch_quote(
            &self,
            _symbol: &str,
        ) -> Result<Option<ProviderQuote>, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.quote.lock().clone())
        }
    }

    struct Parts {
        engine: Arc<UpdateEngine>,
        cache: Arc<PriceCache>,
        hub: Arc<BroadcastHub<PriceUpdate>>,
    }

    fn build_engine(
        providers: Vec<Arc<dyn QuoteProvider>>,
        simulation_enabled: bool,
        store: Option<Arc<MemoryStore>>,
        with_bootstrap: bool,
    ) -> Parts {
        let cache = Arc::new(PriceCache::new());
        let hub = Arc::new(BroadcastHub::new());
        let pipeline = Arc::new(FetchPipeline::new(providers));
        let simulator = PriceSimulator::new(SimulationConfig {
            enabled: simulation_enabled,
            max_step_pct: 0.5,
            seed_min: 20.0,
            seed_max: 500.0,
        });

        let store_dyn: Option<Arc<dyn SymbolStore>> =
            store.clone().map(|s| s as Arc<dyn SymbolStore>);
        let bootstrap = if with_bootstrap {
            store_dyn.clone().map(|store| {
                Arc::new(SymbolBootstrapper::new(store, Arc::clone(&pipeline), None))
            })
        } else {
            None
        };

        let engine = Arc::new(UpdateEngine::new(
            RefreshConfig::default(),
            Arc::clone(&cache),
            Arc::clone(&hub),
            pipeline,
            simulator,
            bootstrap,
            store_dyn,
        ));
        Parts { engine, cache, hub }
    }

    async fn wait_for_history(store: &MemoryStore) {
        for _ in 0..50 {
            if !store.history.lock().is_empty() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("persistence drain never ran");
    }

    fn quote(price: f64, previous_close: f64) -> ProviderQuote {
        ProviderQuote {
            price: Some(price),
            previous_close: Some(previous_close),
            timestamp: Some(Utc::now()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_refresh_updates_cache_and_persists() {
        let store = Arc::new(MemoryStore::new());
        let provider = ScriptedProvider::new(Some(quote(150.25, 148.0)));
        let parts = build_engine(vec![provider], false, Some(store.clone()), false);

        let snapshot = parts
            .engine
            .refresh_symbol("AAPL", true)
            .await
            .expect("snapshot");
        assert_eq!(snapshot.price, 150.25);
        assert_eq!(snapshot.change, 2.25);
        assert_eq!(snapshot.source, QuoteSource::External);
        assert_eq!(snapshot.provider.as_deref(), Some("scripted"));
        assert_eq!(parts.cache.get("AAPL").expect("cached").price, 150.25);

        wait_for_history(&store).await;
        let history = store.history.lock();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].price, 150.25);
        assert_eq!(history[0].source, "EXTERNAL");
        assert!(history[0].quote_time.is_some());
        drop(history);

        let record = store
            .find_symbol("AAPL")
            .await
            .expect("query")
            .expect("row");
        assert_eq!(record.price, Some(150.25));
    }

    #[tokio::test]
    async fn test_refresh_simulates_when_no_providers() {
        let parts = build_engine(vec![], true, None, false);

        let snapshot = parts
            .engine
            .refresh_symbol("FAKE", true)
            .await
            .expect("snapshot");
        assert_eq!(snapshot.source, QuoteSource::Simulation);
        assert_eq!(snapshot.provider, None);
        assert!((20.0..=500.0).contains(&snapshot.price));
    }

    #[tokio::test]
    async fn test_simulated_walk_continues_from_cached_price() {
        let parts = build_engine(vec![], true, None, false);

        let first = parts
            .engine
            .refresh_symbol("FAKE", true)
            .await
            .expect("first");
        let second = parts
            .engine
            .refresh_symbol("FAKE", true)
            .await
            .expect("second");

        let bound = first.price * 0.005 + 0.02;
        assert!((second.price - first.price).abs() <= bound);
    }

    #[tokio::test]
    async fn test_all_fail_without_simulation_leaves_cache_unchanged() {
        let provider = ScriptedProvider::new(Some(quote(100.0, 99.0)));
        let parts = build_engine(vec![provider.clone()], false, None, false);

        parts
            .engine
            .refresh_symbol("AAPL", true)
            .await
            .expect("seed");

        provider.set_quote(None);
        assert!(parts.engine.refresh_symbol("AAPL", true).await.is_none());
        assert_eq!(parts.cache.get("AAPL").expect("cached").price, 100.0);
    }

    #[tokio::test]
    async fn test_all_fail_with_simulation_disallowed_by_caller() {
        let parts = build_engine(vec![], true, None, false);
        assert!(parts.engine.refresh_symbol("FAKE", false).await.is_none());
        assert!(parts.cache.get("FAKE").is_none());
    }

    #[tokio::test]
    async fn test_refresh_publishes_once_per_subscriber() {
        let provider = ScriptedProvider::new(Some(quote(100.0, 99.0)));
        let parts = build_engine(vec![provider], false, None, false);

        let (a, mut rx_a) = parts.hub.register();
        let (b, mut rx_b) = parts.hub.register();
        parts.hub.join(a, "AAPL");
        parts.hub.join(b, "AAPL");

        parts
            .engine
            .refresh_symbol("AAPL", true)
            .await
            .expect("snapshot");

        assert_eq!(rx_a.try_recv().expect("event").snapshot.price, 100.0);
        assert!(rx_a.try_recv().is_err());
        assert_eq!(rx_b.try_recv().expect("event").snapshot.price, 100.0);
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_update_carries_category_metadata() {
        let store = Arc::new(MemoryStore::new());
        let category = store
            .find_or_create_category("Technology")
            .await
            .expect("category");
        store
            .upsert_symbol_snapshot(&SymbolUpsert {
                symbol: "AAPL".to_string(),
                category_id: Some(category.id),
                ..Default::default()
            })
            .await
            .expect("seed");

        let provider = ScriptedProvider::new(Some(quote(100.0, 99.0)));
        let parts = build_engine(vec![provider], false, Some(store), true);

        let (client, mut rx) = parts.hub.register();
        parts.hub.join(client, "AAPL");

        parts
            .engine
            .refresh_symbol("AAPL", true)
            .await
            .expect("snapshot");

        let update = rx.try_recv().expect("event");
        assert_eq!(update.category_id, Some(category.id));
        assert_eq!(update.category_name.as_deref(), Some("Technology"));
    }

    #[tokio::test]
    async fn test_refresh_subscribed_covers_only_subscribed_symbols() {
        let provider = ScriptedProvider::new(Some(quote(100.0, 99.0)));
        let parts = build_engine(vec![provider.clone()], false, None, false);

        parts.cache.subscribe("AAPL");
        parts.engine.refresh_subscribed().await;

        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        assert!(parts.cache.get("AAPL").is_some());
        assert_eq!(parts.cache.len(), 1);
    }

    #[tokio::test]
    async fn test_store_outage_never_interrupts_feed() {
        let store = Arc::new(MemoryStore::new());
        store.set_failing(true);
        let provider = ScriptedProvider::new(Some(quote(100.0, 99.0)));
        let parts = build_engine(vec![provider], false, Some(store.clone()), false);

        let snapshot = parts.engine.refresh_symbol("AAPL", true).await;
        assert!(snapshot.is_some());
        assert!(parts.cache.get("AAPL").is_some());
    }

    #[tokio::test]
    async fn test_refresh_loop_stops_on_shutdown() {
        let parts = build_engine(vec![], false, None, false);
        let (tx, rx) = watch::channel(false);

        let handle = tokio::spawn(Arc::clone(&parts.engine).run_refresh_loop(rx));
        tx.send(true).expect("signal");

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("loop should stop")
            .expect("task should join");
    }
}
