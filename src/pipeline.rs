//! Fallback fetch pipeline: tries adapters in configured order and returns
//! the first valid quote.
//!
//! Per-adapter failures are logged and treated as "no data" so a single
//! misbehaving upstream never takes the feed down. Only when every adapter
//! comes back empty does the pipeline report no quote.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use crate::models::{PriceSnapshot, QuoteSource, round2};
use crate::providers::{ProviderQuote, QuoteProvider};

/// How many adapters the existence probe consults before giving up.
const EXISTENCE_PROBE_ADAPTERS: usize = 2;

/// A quote paired with the adapter that produced it.
#[derive(Debug, Clone)]
pub struct SourcedQuote {
    /// The normalized quote.
    pub quote: ProviderQuote,
    /// Name of the adapter that answered.
    pub provider: &'static str,
}

/// Ordered adapter chain producing the best available quote for a symbol.
pub struct FetchPipeline {
    providers: Vec<Arc<dyn QuoteProvider>>,
}

impl FetchPipeline {
    /// Creates a pipeline over adapters already sorted in preference order.
    #[must_use]
    pub fn new(providers: Vec<Arc<dyn QuoteProvider>>) -> Self {
        Self { providers }
    }

    /// Number of usable adapters.
    #[must_use]
    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }

    /// Adapter names in pipeline order.
    #[must_use]
    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Tries every adapter in order and returns the first quote passing the
    /// validity predicate. `None` when all adapters fail or have no data.
    pub async fn fetch_quote(&self, symbol: &str) -> Option<SourcedQuote> {
        for provider in &self.providers {
            match provider.fetch_quote(symbol).await {
                Ok(Some(quote)) if is_valid_quote(&quote) => {
                    debug!(provider = provider.name(), symbol, "quote fetched");
                    return Some(SourcedQuote {
                        quote,
                        provider: provider.name(),
                    });
                }
                Ok(Some(_)) => {
                    debug!(
                        provider = provider.name(),
                        symbol, "quote rejected by validity check"
                    );
                }
                Ok(None) => {
                    debug!(provider = provider.name(), symbol, "no data");
                }
                Err(e) => {
                    warn!(
                        provider = provider.name(),
                        symbol,
                        error = %e,
                        "provider fetch failed"
                    );
                }
            }
        }
        None
    }

    /// Lightweight existence check used by the symbol bootstrapper. Probes
    /// only the first adapters of the chain; any response carrying a present
    /// price counts as proof, the positivity requirement is relaxed.
    pub async fn validate_symbol_exists(&self, symbol: &str) -> bool {
        for provider in self.providers.iter().take(EXISTENCE_PROBE_ADAPTERS) {
            match provider.fetch_quote(symbol).await {
                Ok(Some(quote)) if quote.price.is_some() => {
                    debug!(provider = provider.name(), symbol, "symbol verified");
                    return true;
                }
                Ok(_) => {}
                Err(e) => {
                    debug!(
                        provider = provider.name(),
                        symbol,
                        error = %e,
                        "existence probe failed"
                    );
                }
            }
        }
        false
    }
}

/// Minimal validity predicate: a price that is present, finite and positive.
#[must_use]
pub fn is_valid_quote(quote: &ProviderQuote) -> bool {
    quote.price.is_some_and(|p| p.is_finite() && p > 0.0)
}

/// Merges a new quote into the previous cached snapshot.
///
/// Any field absent on the quote falls back to the previous snapshot's
/// value, then to the new price itself, so high/low/open are never left
/// undefined once a price exists. An unknown previous close defaults to the
/// incoming price, yielding a zero change for that event. High and low are
/// clamped against the new price so the snapshot stays self-consistent.
#[must_use]
pub fn merge_quote(
    symbol: &str,
    previous: Option<&PriceSnapshot>,
    quote: &ProviderQuote,
    source: QuoteSource,
    provider: Option<&str>,
) -> PriceSnapshot {
    let price = quote
        .price
        .or_else(|| previous.map(|p| p.price))
        .unwrap_or(0.0);

    let previous_close = quote
        .previous_close
        .or_else(|| previous.map(|p| p.previous_close))
        .unwrap_or(price);
    let change = quote.change.unwrap_or(price - previous_close);
    let change_percent = quote.change_percent.unwrap_or_else(|| {
        if previous_close.abs() > f64::EPSILON {
            (change / previous_close) * 100.0
        } else {
            0.0
        }
    });

    let high = quote
        .high
        .or_else(|| previous.map(|p| p.high))
        .unwrap_or(price)
        .max(price);
    let low = quote
        .low
        .or_else(|| previous.map(|p| p.low))
        .unwrap_or(price)
        .min(price);
    let open = quote
        .open
        .or_else(|| previous.map(|p| p.open))
        .unwrap_or(price);

    PriceSnapshot {
        symbol: symbol.to_string(),
        price: round2(price),
        change: round2(change),
        change_percent: round2(change_percent),
        volume: quote
            .volume
            .or_else(|| previous.map(|p| p.volume))
            .unwrap_or(0),
        bid: quote.bid.or_else(|| previous.and_then(|p| p.bid)).map(round2),
        ask: quote.ask.or_else(|| previous.and_then(|p| p.ask)).map(round2),
        bid_size: quote.bid_size.or_else(|| previous.and_then(|p| p.bid_size)),
        ask_size: quote.ask_size.or_else(|| previous.and_then(|p| p.ask_size)),
        high: round2(high),
        low: round2(low),
        open: round2(open),
        previous_close: round2(previous_close),
        source,
        provider: provider.map(ToString::to_string),
        timestamp: Utc::now(),
    }
}
