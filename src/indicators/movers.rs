//! Market mover filtering and support-break detection.
//!
//! Upstream gainer/loser boards mix US common stock with foreign listings,
//! OTC entries and funds. The filter keeps plain 1-5 letter uppercase
//! tickers and drops anything whose name marks it as a fund-like product.

use serde::{Deserialize, Serialize};

use crate::models::{MarketMover, round2};

/// Name words that mark an entry as a fund-like product rather than common
/// stock.
const FUND_WORDS: &[&str] = &["etf", "fund", "funds", "trust", "adr", "index"];

/// Both mover boards after US-listing filtering.
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

/// Whether a mover entry looks like a US-listed common stock.
#[must_use]
pub fn is_us_listed(symbol: &str, name: &str) -> bool {
    let plain_ticker = (1..=5).contains(&symbol.len())
        && symbol.chars().all(|c| c.is_ascii_uppercase());
    if !plain_ticker {
        return false;
    }

    let lowered = name.to_lowercase();
    !lowered
        .split(|c: char| !c.is_ascii_alphanumeric())
        .any(|word| FUND_WORDS.contains(&word))
}

/// Keeps only US-listed common-stock entries.
#[must_use]
pub fn filter_us(movers: Vec<MarketMover>) -> Vec<MarketMover> {
    movers
        .into_iter()
        .filter(|mover| is_us_listed(&mover.symbol, &mover.name))
        .collect()
}

/// Returns the highest support level the price sits within `tolerance_pct`
/// of, or has fallen through. `None` when the price is comfortably above
/// every level.
#[must_use]
pub fn breaking_support(price: f64, levels: &[f64], tolerance_pct: f64) -> Option<f64> {
    let mut best: Option<f64> = None;
    for &level in levels {
        if level <= 0.0 || !level.is_finite() {
            continue;
        }
        if price <= level * (1.0 + tolerance_pct / 100.0) {
            best = Some(best.map_or(level, |b| b.max(level)));
        }
    }
    best
}

/// Builds the report entry for a loser confirmed against a support level.
#[must_use]
pub fn support_break(mover: &MarketMover, level: f64) -> SupportBreak {
    SupportBreak {
        symbol: mover.symbol.clone(),
        name: mover.name.clone(),
        price: mover.price,
        change_percent: mover.change_percent,
        support_level: level,
        distance_pct: round2((mover.price - level) / level * 100.0),
    }
}
