//! Request and response types for the marketfeed API.

use serde::{Deserialize, Serialize};

#[cfg(test)]
mod tests;

/// Origin of a price snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum QuoteSource {
    /// Produced by an external provider adapter.
    External,
    /// Synthesized by the server-side price simulator.
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

/// Trading signal derived from an RSI value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RsiSignal {
    /// RSI at or below 30.
    Oversold,
    /// RSI between the oversold and overbought thresholds.
    Neutral,
    /// RSI at or above 70.
    Overbought,
}

impl std::fmt::Display for RsiSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Oversold => write!(f, "oversold"),
            Self::Neutral => write!(f, "neutral"),
            Self::Overbought => write!(f, "overbought"),
        }
    }
}

// ============================================================================
// Health & Stats
// ============================================================================

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

/// Diagnostic view of the server-side price cache.
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

/// Diagnostic view of the server-side broadcast hub.
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

/// Combined diagnostics returned by the stats endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    /// Price cache diagnostics.
    pub cache: CacheStats,
    /// Broadcast hub diagnostics.
    pub hub: HubStats,
    /// RFC 3339 time the stats were taken.
    pub timestamp: String,
}

// ============================================================================
// Quotes
// ============================================================================

/// Latest known state for one symbol.
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
    /// RFC 3339 acquisition time.
    pub timestamp: String,
}

/// Response listing every cached snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotesResponse {
    /// Cached snapshots, sorted by symbol.
    pub quotes: Vec<PriceSnapshot>,
    /// Number of snapshots.
    pub count: usize,
}

// ============================================================================
// Price History
// ============================================================================

/// One persisted price history row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRow {
    /// Unique identifier.
    pub id: String,
    /// Ticker symbol.
    pub symbol: String,
    /// Price at the time of the event.
    pub price: f64,
    /// Traded volume, when known.
    pub volume: Option<i64>,
    /// Quote source ("EXTERNAL" or "SIMULATION").
    pub source: String,
    /// Provider that produced the quote.
    pub provider: Option<String>,
    /// RFC 3339 timestamp reported by the provider, when supplied.
    pub quote_time: Option<String>,
    /// RFC 3339 time the row was written.
    pub recorded_at: String,
}

/// Response carrying recent price history for one symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryResponse {
    /// Requested symbol.
    pub symbol: String,
    /// Rows, newest first.
    pub rows: Vec<HistoryRow>,
    /// Number of rows.
    pub count: usize,
}

// ============================================================================
// Indicators
// ============================================================================

/// RSI value with its classification and provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RsiReading {
    /// Ticker symbol.
    pub symbol: String,
    /// Look-back period in days.
    pub period: u32,
    /// Latest daily RSI value.
    pub value: f64,
    /// Derived signal.
    pub signal: RsiSignal,
    /// Source that produced the value.
    pub source: String,
}

/// One level with its distance from the reference price.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LevelInfo {
    /// Price level.
    pub level: f64,
    /// Percentage distance from the reference price.
    pub distance_pct: f64,
}

/// Support and resistance view for one symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportResistance {
    /// Ticker symbol.
    pub symbol: String,
    /// Reference price the levels were partitioned around.
    pub price: f64,
    /// Greatest level strictly below the price.
    pub support: Option<LevelInfo>,
    /// Smallest level strictly above the price.
    pub resistance: Option<LevelInfo>,
    /// All known levels, ascending.
    pub levels: Vec<f64>,
}

// ============================================================================
// Market Movers
// ============================================================================

/// One entry of a gainers/losers list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketMover {
    /// Ticker symbol.
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

/// Both mover boards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoversReport {
    /// Top gainers.
    pub gainers: Vec<MarketMover>,
    /// Top losers.
    pub losers: Vec<MarketMover>,
}

/// A loser trading at or through one of its support levels.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportBreak {
    /// Ticker symbol.
    pub symbol: String,
    /// Company name.
    pub name: String,
    /// Current price.
    pub price: f64,
    /// Percentage change on the day.
    pub change_percent: f64,
    /// The support level being tested or broken.
    pub support_level: f64,
    /// Percentage distance from the level, negative when below it.
    pub distance_pct: f64,
}

/// Response carrying the losers-breaking-support screen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupportBreaksResponse {
    /// Qualifying losers.
    pub breaks: Vec<SupportBreak>,
    /// Number of entries.
    pub count: usize,
}
