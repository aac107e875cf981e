//! RSI lookup with ordered source fallback and signal classification.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::providers::RsiSource;

/// Trading signal derived from an RSI value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RsiSignal {
    /// RSI at or below 30.
    Oversold,
    /// RSI strictly between the two thresholds.
    Neutral,
    /// RSI at or above 70.
    Overbought,
}

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

/// Classifies an RSI value. Both thresholds are inclusive.
#[must_use]
pub fn classify_rsi(value: f64) -> RsiSignal {
    if value <= 30.0 {
        RsiSignal::Oversold
    } else if value >= 70.0 {
        RsiSignal::Overbought
    } else {
        RsiSignal::Neutral
    }
}

/// Tries each source in order and returns the first RSI value, paired with
/// the source name. Failures and empty answers fall through.
pub(super) async fn fetch_ordered(
    sources: &[Arc<dyn RsiSource>],
    symbol: &str,
    period: u32,
) -> Option<(f64, &'static str)> {
    for source in sources {
        match source.fetch_rsi(symbol, period).await {
            Ok(Some(value)) => return Some((value, source.name())),
            Ok(None) => {
                debug!(source = source.name(), symbol, "no rsi data");
            }
            Err(e) => {
                debug!(source = source.name(), symbol, error = %e, "rsi fetch failed");
            }
        }
    }
    None
}
