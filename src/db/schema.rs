//! Persisted row types and write payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Category row. Categories group symbols by business sector.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CategoryRecord {
    /// Unique identifier.
    pub id: Uuid,
    /// Category name (e.g., "Technology").
    pub name: String,
    /// Record creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Persisted symbol row carrying its latest snapshot and classification.
///
/// Price fields are nullable: the bootstrapper creates the row before any
/// quote has been fetched.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SymbolRecord {
    /// Unique identifier.
    pub id: Uuid,
    /// Ticker symbol, uppercase.
    pub symbol: String,
    /// Company name, when classified.
    pub company_name: Option<String>,
    /// Listing exchange, when known.
    pub exchange: Option<String>,
    /// Category the symbol belongs to, when classified.
    pub category_id: Option<Uuid>,
    /// Category name, resolved through a join on read.
    pub category_name: Option<String>,
    /// Latest price.
    pub price: Option<f64>,
    /// Absolute change vs previous close.
    pub change: Option<f64>,
    /// Percentage change vs previous close.
    pub change_percent: Option<f64>,
    /// Traded volume.
    pub volume: Option<i64>,
    /// Session high.
    pub high: Option<f64>,
    /// Session low.
    pub low: Option<f64>,
    /// Session open.
    pub open: Option<f64>,
    /// Previous session close.
    pub previous_close: Option<f64>,
    /// Quote source ("EXTERNAL" or "SIMULATION").
    pub source: Option<String>,
    /// Provider that produced the latest snapshot.
    pub provider: Option<String>,
    /// Last snapshot write.
    pub updated_at: DateTime<Utc>,
    /// Record creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Append-only price history row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRow {
    /// Unique identifier.
    pub id: Uuid,
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
    /// Timestamp reported by the provider, when supplied.
    pub quote_time: Option<DateTime<Utc>>,
    /// When the row was written.
    pub recorded_at: DateTime<Utc>,
}

/// Create-or-update payload for a symbol row.
///
/// Absent fields leave the persisted values untouched, so a metadata-only
/// upsert (bootstrap, classification) never clobbers prices and a snapshot
/// upsert never clobbers classification.
#[derive(Debug, Clone, Default)]
pub struct SymbolUpsert {
    /// Ticker symbol, uppercase.
    pub symbol: String,
    /// Company name.
    pub company_name: Option<String>,
    /// Listing exchange.
    pub exchange: Option<String>,
    /// Category id.
    pub category_id: Option<Uuid>,
    /// Latest price.
    pub price: Option<f64>,
    /// Absolute change.
    pub change: Option<f64>,
    /// Percentage change.
    pub change_percent: Option<f64>,
    /// Traded volume.
    pub volume: Option<i64>,
    /// Session high.
    pub high: Option<f64>,
    /// Session low.
    pub low: Option<f64>,
    /// Session open.
    pub open: Option<f64>,
    /// Previous session close.
    pub previous_close: Option<f64>,
    /// Quote source.
    pub source: Option<String>,
    /// Provider name.
    pub provider: Option<String>,
}

/// Payload for one history row.
#[derive(Debug, Clone)]
pub struct HistoryInsert {
    /// Ticker symbol, uppercase.
    pub symbol: String,
    /// Price at the time of the event.
    pub price: f64,
    /// Traded volume, when known.
    pub volume: Option<i64>,
    /// Quote source.
    pub source: String,
    /// Provider name.
    pub provider: Option<String>,
    /// Timestamp reported by the provider.
    pub quote_time: Option<DateTime<Utc>>,
}
