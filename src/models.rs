//! Shared data models: price snapshots, quote sources, and REST DTOs.

use crate::db::HistoryRow;
use crate::indicators::SupportBreak;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Origin of a price snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum QuoteSource {
    /// Produced by an external provider adapter.
    External,
    /// Synthesized by the random-walk simulator.
    Simulation,
}

impl std::fmt::Display for QuoteSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::External => write!(f, "EXTERNAL"),
            Self::Simulation => write!(f, "SIMULATION"),
        }
    }
}

impl std::str::FromStr for QuoteSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "EXTERNAL" => Ok(Self::External),
            "SIMULATION" => Ok(Self::Simulation),
            other => Err(format!("invalid quote source: {}", other)),
        }
    }
}

/// Latest known state for one symbol. Exactly one snapshot per symbol lives
/// in the cache at any time; every successful fetch or simulation replaces it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceSnapshot {
    /// Uppercase canonical symbol.
    pub symbol: String,
    /// Last price.
    pub price: f64,
    /// Absolute change versus previous close.
    pub change: f64,
    /// Percentage change versus previous close.
    pub change_percent: f64,
    /// Session volume (0 when no provider supplied it).
    pub volume: i64,
    /// Best bid price, if the provider publishes one.
    pub bid: Option<f64>,
    /// Best ask price, if the provider publishes one.
    pub ask: Option<f64>,
    /// Best bid size.
    pub bid_size: Option<i64>,
    /// Best ask size.
    pub ask_size: Option<i64>,
    /// Session high.
    pub high: f64,
    /// Session low.
    pub low: f64,
    /// Session open.
    pub open: f64,
    /// Previous session close.
    pub previous_close: f64,
    /// Where the snapshot came from.
    pub source: QuoteSource,
    /// Adapter that produced the quote (absent for simulated data).
    pub provider: Option<String>,
    /// Acquisition time.
    pub timestamp: DateTime<Utc>,
}

/// Rounds to two decimals for display. The only precision rule the feed
/// guarantees; storage keeps whatever the provider sent.
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// One entry of a gainers/losers list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketMover {
    /// Ticker symbol as reported by the provider.
    pub symbol: String,
    /// Company name.
    pub name: String,
    /// Last price.
    pub price: f64,
    /// Absolute change on the day.
    pub change: f64,
    /// Percentage change on the day.
    pub change_percent: f64,
}

/// Diagnostic view of the price cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    /// Number of cached snapshots.
    pub size: usize,
    /// Number of actively subscribed symbols.
    pub subscription_count: usize,
    /// Cached symbols, sorted.
    pub symbols: Vec<String>,
}

/// Diagnostic view of the broadcast hub.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HubStats {
    /// Connected WebSocket clients.
    pub clients: usize,
    /// Symbol rooms with at least one member.
    pub rooms: usize,
    /// Total room memberships across all clients.
    pub memberships: usize,
}

/// Response listing every cached snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotesResponse {
    /// Cached snapshots, sorted by symbol.
    pub quotes: Vec<PriceSnapshot>,
    /// Number of snapshots.
    pub count: usize,
}

/// Response carrying recent persisted history rows for one symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryResponse {
    /// Requested symbol.
    pub symbol: String,
    /// Rows, newest first.
    pub rows: Vec<HistoryRow>,
    /// Number of rows.
    pub count: usize,
}

/// Response carrying the losers-breaking-support screen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupportBreaksResponse {
    /// Qualifying losers.
    pub breaks: Vec<SupportBreak>,
    /// Number of entries.
    pub count: usize,
}

/// Query parameters for the price history endpoint.
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// Maximum number of rows to return (default 50, capped at 500).
    #[serde(default)]
    pub limit: Option<i64>,
}

/// Query parameters for the support/resistance endpoint.
#[derive(Debug, Deserialize)]
pub struct SupportResistanceQuery {
    /// Price to partition the levels around; defaults to the cached price,
    /// then to a fresh pipeline fetch.
    #[serde(default)]
    pub price: Option<f64>,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Service name.
    pub service: String,
    /// Service version.
    pub version: String,
}

/// Combined diagnostics returned by the stats endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    /// Price cache diagnostics.
    pub cache: CacheStats,
    /// Broadcast hub diagnostics.
    pub hub: HubStats,
    /// Time the stats were taken.
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round2() {
        assert_eq!(round2(1.234), 1.23);
        assert_eq!(round2(1.236), 1.24);
        assert_eq!(round2(2.25199), 2.25);
        assert_eq!(round2(-3.456), -3.46);
        assert_eq!(round2(150.0), 150.0);
    }

    #[test]
    fn test_quote_source_round_trip() {
        assert_eq!("EXTERNAL".parse::<QuoteSource>(), Ok(QuoteSource::External));
        assert_eq!(
            "simulation".parse::<QuoteSource>(),
            Ok(QuoteSource::Simulation)
        );
        assert!("SYNTHETIC".parse::<QuoteSource>().is_err());
        assert_eq!(QuoteSource::External.to_string(), "EXTERNAL");
    }

    #[test]
    fn test_snapshot_serializes_camel_case() {
        let snapshot = PriceSnapshot {
            symbol: "AAPL".to_string(),
            price: 150.25,
            change: 2.25,
            change_percent: 1.52,
            volume: 1_000,
            bid: None,
            ask: None,
            bid_size: None,
            ask_size: None,
            high: 151.0,
            low: 149.0,
            open: 149.5,
            previous_close: 148.0,
            source: QuoteSource::External,
            provider: Some("finnhub".to_string()),
            timestamp: Utc::now(),
        };

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["changePercent"], 1.52);
        assert_eq!(json["previousClose"], 148.0);
        assert_eq!(json["source"], "EXTERNAL");
        // Optional fields serialize as explicit nulls, not omissions.
        assert!(json.get("bid").is_some_and(serde_json::Value::is_null));
    }
}
