//! In-memory price cache and subscription set.
//!
//! The cache is the single source of truth for the latest known snapshot of
//! every symbol the service has seen. The subscription set tracks which
//! symbols currently have at least one live subscriber and therefore must be
//! refreshed on the periodic tick. Both sides are sharded concurrent maps,
//! shared freely across tasks without an outer lock.

use dashmap::{DashMap, DashSet};

use crate::models::{CacheStats, PriceSnapshot};

/// Concurrent cache of the latest snapshot per symbol.
#[derive(Debug, Default)]
pub struct PriceCache {
    snapshots: DashMap<String, PriceSnapshot>,
    subscribed: DashSet<String>,
}

impl PriceCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the latest snapshot for `symbol`, if any.
    #[must_use]
    pub fn get(&self, symbol: &str) -> Option<PriceSnapshot> {
        self.snapshots.get(symbol).map(|entry| entry.clone())
    }

    /// Stores `snapshot` as the latest state of its symbol.
    pub fn set(&self, snapshot: PriceSnapshot) {
        self.snapshots.insert(snapshot.symbol.clone(), snapshot);
    }

    /// Marks `symbol` as actively subscribed. Returns `true` when the symbol
    /// was not subscribed before; repeated calls are no-ops.
    pub fn subscribe(&self, symbol: &str) -> bool {
        self.subscribed.insert(symbol.to_string())
    }

    /// Removes `symbol` from the subscription set. Returns `true` when it
    /// was present. Its cached snapshot is kept for later reuse.
    pub fn unsubscribe(&self, symbol: &str) -> bool {
        self.subscribed.remove(symbol).is_some()
    }

    /// Whether `symbol` currently has at least one subscriber.
    #[must_use]
    pub fn is_subscribed(&self, symbol: &str) -> bool {
        self.subscribed.contains(symbol)
    }

    /// All symbols with at least one subscriber, sorted for determinism.
    #[must_use]
    pub fn subscribed_symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> =
            self.subscribed.iter().map(|entry| entry.clone()).collect();
        symbols.sort();
        symbols
    }

    /// Every cached snapshot, sorted by symbol.
    #[must_use]
    pub fn all_snapshots(&self) -> Vec<PriceSnapshot> {
        let mut snapshots: Vec<PriceSnapshot> = self
            .snapshots
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        snapshots.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        snapshots
    }

    /// Number of cached snapshots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Whether the cache holds no snapshots.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Point-in-time cache statistics.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.snapshots.len(),
            subscription_count: self.subscribed.len(),
            symbols: self.subscribed_symbols(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::QuoteSource;
    use chrono::Utc;

    fn snapshot(symbol: &str, price: f64) -> PriceSnapshot {
        PriceSnapshot {
            symbol: symbol.to_string(),
            price,
            change: 0.0,
            change_percent: 0.0,
            volume: 0,
            bid: None,
            ask: None,
            bid_size: None,
            ask_size: None,
            high: price,
            low: price,
            open: price,
            previous_close: price,
            source: QuoteSource::External,
            provider: None,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_set_and_get_roundtrip() {
        let cache = PriceCache::new();
        assert!(cache.get("AAPL").is_none());

        cache.set(snapshot("AAPL", 150.0));
        let cached = cache.get("AAPL").expect("cached");
        assert_eq!(cached.price, 150.0);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_set_overwrites_previous_snapshot() {
        let cache = PriceCache::new();
        cache.set(snapshot("AAPL", 150.0));
        cache.set(snapshot("AAPL", 151.5));

        assert_eq!(cache.get("AAPL").expect("cached").price, 151.5);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_subscribe_is_idempotent() {
        let cache = PriceCache::new();
        assert!(cache.subscribe("AAPL"));
        assert!(!cache.subscribe("AAPL"));

        assert!(cache.is_subscribed("AAPL"));
        assert_eq!(cache.subscribed_symbols(), vec!["AAPL".to_string()]);
    }

    #[test]
    fn test_unsubscribe_keeps_cached_snapshot() {
        let cache = PriceCache::new();
        cache.set(snapshot("AAPL", 150.0));
        cache.subscribe("AAPL");

        assert!(cache.unsubscribe("AAPL"));
        assert!(!cache.unsubscribe("AAPL"));
        assert!(!cache.is_subscribed("AAPL"));
        assert!(cache.get("AAPL").is_some());
    }

    #[test]
    fn test_subscribed_symbols_sorted() {
        let cache = PriceCache::new();
        cache.subscribe("MSFT");
        cache.subscribe("AAPL");
        cache.subscribe("GOOG");

        assert_eq!(
            cache.subscribed_symbols(),
            vec!["AAPL".to_string(), "GOOG".to_string(), "MSFT".to_string()]
        );
    }

    #[test]
    fn test_stats_reports_both_sides() {
        let cache = PriceCache::new();
        cache.set(snapshot("AAPL", 150.0));
        cache.set(snapshot("MSFT", 300.0));
        cache.subscribe("AAPL");

        let stats = cache.stats();
        assert_eq!(stats.size, 2);
        assert_eq!(stats.subscription_count, 1);
        assert_eq!(stats.symbols, vec!["AAPL".to_string()]);
    }

    #[test]
    fn test_all_snapshots_sorted_by_symbol() {
        let cache = PriceCache::new();
        cache.set(snapshot("MSFT", 300.0));
        cache.set(snapshot("AAPL", 150.0));

        let all = cache.all_snapshots();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].symbol, "AAPL");
        assert_eq!(all[1].symbol, "MSFT");
    }
}
