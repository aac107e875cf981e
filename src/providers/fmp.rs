//! Financial Modeling Prep adapter: quotes, profiles, and market movers.
//!
//! FMP answers with arrays even for single-symbol lookups; an empty array
//! means the symbol is unknown.

use async_trait::async_trait;
use chrono::DateTime;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use super::{CompanyProfile, ProviderError, ProviderQuote, QuoteProvider, get_json};
use crate::models::MarketMover;

const BASE_URL: &str = "https://financialmodelingprep.com/api/v3";

/// Financial Modeling Prep adapter.
#[derive(Debug, Clone)]
pub struct FmpProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct FmpQuote {
    #[serde(default)]
    price: Option<f64>,
    #[serde(default)]
    change: Option<f64>,
    #[serde(rename = "changesPercentage", default)]
    changes_percentage: Option<f64>,
    #[serde(rename = "dayHigh", default)]
    day_high: Option<f64>,
    #[serde(rename = "dayLow", default)]
    day_low: Option<f64>,
    #[serde(default)]
    open: Option<f64>,
    #[serde(rename = "previousClose", default)]
    previous_close: Option<f64>,
    #[serde(default)]
    volume: Option<i64>,
    #[serde(default)]
    timestamp: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct FmpProfile {
    #[serde(rename = "companyName", default)]
    company_name: Option<String>,
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    sector: Option<String>,
    #[serde(default)]
    industry: Option<String>,
    #[serde(rename = "exchangeShortName", default)]
    exchange_short_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FmpMover {
    symbol: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    price: Option<f64>,
    #[serde(default)]
    change: Option<f64>,
    #[serde(rename = "changesPercentage", default)]
    changes_percentage: Option<f64>,
}

impl FmpProvider {
    /// Creates the adapter with the configured request timeout.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built.
    pub fn new(api_key: &str, timeout: Duration) -> Result<Self, ProviderError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key: api_key.to_string(),
            base_url: BASE_URL.to_string(),
        })
    }

    /// Fetches the pre-aggregated top gainers list.
    ///
    /// # Errors
    /// Returns error if the request fails or the body cannot be decoded.
    pub async fn fetch_gainers(&self) -> Result<Vec<MarketMover>, ProviderError> {
        self.fetch_movers("gainers").await
    }

    /// Fetches the pre-aggregated top losers list.
    ///
    /// # Errors
    /// Returns error if the request fails or the body cannot be decoded.
    pub async fn fetch_losers(&self) -> Result<Vec<MarketMover>, ProviderError> {
        self.fetch_movers("losers").await
    }

    async fn fetch_movers(&self, board: &str) -> Result<Vec<MarketMover>, ProviderError> {
        let url = format!("{}/stock_market/{}", self.base_url, board);
        let raw: Vec<FmpMover> =
            get_json(&self.client, &url, &[("apikey", &self.api_key)]).await?;
        Ok(raw.into_iter().filter_map(map_mover).collect())
    }
}

fn map_quote(raw: FmpQuote) -> Option<ProviderQuote> {
    let price = raw.price?;
    Some(ProviderQuote {
        price: Some(price),
        change: raw.change,
        change_percent: raw.changes_percentage,
        volume: raw.volume,
        high: raw.day_high,
        low: raw.day_low,
        open: raw.open,
        previous_close: raw.previous_close,
        timestamp: raw.timestamp.and_then(|t| DateTime::from_timestamp(t, 0)),
        ..Default::default()
    })
}

fn map_profile(raw: FmpProfile) -> Option<CompanyProfile> {
    raw.company_name.as_ref()?;
    Some(CompanyProfile {
        name: raw.company_name,
        country: raw.country,
        sector: raw.sector,
        industry: raw.industry,
        exchange: raw.exchange_short_name,
    })
}

fn map_mover(raw: FmpMover) -> Option<MarketMover> {
    Some(MarketMover {
        name: raw.name.unwrap_or_else(|| raw.symbol.clone()),
        symbol: raw.symbol,
        price: raw.price?,
        change: raw.change.unwrap_or(0.0),
        change_percent: raw.changes_percentage?,
    })
}

#[async_trait]
impl QuoteProvider for FmpProvider {
    fn name(&self) -> &'static str {
        "fmp"
    }

    async fn fetch_quote(&self, symbol: &str) -> Result<Option<ProviderQuote>, ProviderError> {
        let url = format!("{}/quote/{}", self.base_url, symbol);
        let raw: Vec<FmpQuote> =
            get_json(&self.client, &url, &[("apikey", &self.api_key)]).await?;
        Ok(raw.into_iter().next().and_then(map_quote))
    }

    async fn fetch_company_profile(
        &self,
        symbol: &str,
    ) -> Result<Option<CompanyProfile>, ProviderError> {
        let url = format!("{}/profile/{}", self.base_url, symbol);
        let raw: Vec<FmpProfile> =
            get_json(&self.client, &url, &[("apikey", &self.api_key)]).await?;
        Ok(raw.into_iter().next().and_then(map_profile))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_map_quote() {
        let raw: FmpQuote = serde_json::from_value(json!({
            "symbol": "AAPL",
            "name": "Apple Inc.",
            "price": 145.85,
            "changesPercentage": -0.0076,
            "change": -0.011,
            "dayLow": 143.9,
            "dayHigh": 146.71,
            "exchange": "NASDAQ",
            "volume": 42478176,
            "open": 144.38,
            "previousClose": 145.86,
            "timestamp": 1636557601
        }))
        .unwrap();

        let quote = map_quote(raw).expect("valid quote");
        assert_eq!(quote.price, Some(145.85));
        assert_eq!(quote.high, Some(146.71));
        assert_eq!(quote.volume, Some(42_478_176));
        assert!(quote.timestamp.is_some());
    }

    #[test]
    fn test_map_quote_missing_price() {
        let raw: FmpQuote = serde_json::from_value(json!({"symbol": "ZZZZ"})).unwrap();
        assert!(map_quote(raw).is_none());
    }

    #[test]
    fn test_map_profile() {
        let raw: FmpProfile = serde_json::from_value(json!({
            "symbol": "AAPL",
            "companyName": "Apple Inc.",
            "sector": "Technology",
            "industry": "Consumer Electronics",
            "country": "US",
            "exchangeShortName": "NASDAQ"
        }))
        .unwrap();

        let profile = map_profile(raw).expect("valid profile");
        assert_eq!(profile.name.as_deref(), Some("Apple Inc."));
        assert_eq!(profile.sector.as_deref(), Some("Technology"));
        assert_eq!(profile.industry.as_deref(), Some("Consumer Electronics"));
    }

    #[test]
    fn test_map_mover_requires_price_and_percent() {
        let full: FmpMover = serde_json::from_value(json!({
            "symbol": "NVDA",
            "name": "NVIDIA Corporation",
            "change": 24.53,
            "price": 549.91,
            "changesPercentage": 4.67
        }))
        .unwrap();
        let mover = map_mover(full).expect("complete entry");
        assert_eq!(mover.symbol, "NVDA");
        assert_eq!(mover.change_percent, 4.67);

        let partial: FmpMover =
            serde_json::from_value(json!({"symbol": "XXXX", "price": 10.0})).unwrap();
        assert!(map_mover(partial).is_none());
    }
}
