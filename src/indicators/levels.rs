//! Support/resistance partitioning around a reference price.

use serde::{Deserialize, Serialize};

use crate::models::round2;

/// One level with its distance from the reference price.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LevelInfo {
    /// Price level.
    pub level: f64,
    /// Percentage distance from the reference price, positive for levels
    /// below it and for how far resistance sits above.
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

/// Builds the partitioned view from raw scan levels. Levels are sorted and
/// deduplicated; a level equal to the price is neither support nor
/// resistance.
#[must_use]
pub fn partition_levels(symbol: &str, price: f64, mut levels: Vec<f64>) -> SupportResistance {
    levels.retain(|level| level.is_finite() && *level > 0.0);
    levels.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    levels.dedup();

    let below = levels.partition_point(|level| *level < price);
    let support = below.checked_sub(1).map(|i| LevelInfo {
        level: levels[i],
        distance_pct: round2((price - levels[i]) / price * 100.0),
    });

    let above = levels.partition_point(|level| *level <= price);
    let resistance = levels.get(above).map(|level| LevelInfo {
        level: *level,
        distance_pct: round2((level - price) / price * 100.0),
    });

    SupportResistance {
        symbol: symbol.to_string(),
        price,
        support,
        resistance,
        levels,
    }
}
