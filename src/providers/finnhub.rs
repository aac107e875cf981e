//! Finnhub adapter: quotes, company profiles, and support/resistance scans.

use async_trait::async_trait;
use chrono::DateTime;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use super::{CompanyProfile, ProviderError, ProviderQuote, QuoteProvider, get_json};

const BASE_URL: &str = "https://finnhub.io/api/v1";

/// Finnhub.io adapter.
#[derive(Debug, Clone)]
pub struct FinnhubProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct FinnhubQuote {
    c: Option<f64>,
    d: Option<f64>,
    dp: Option<f64>,
    h: Option<f64>,
    l: Option<f64>,
    o: Option<f64>,
    pc: Option<f64>,
    t: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct FinnhubProfile {
    name: Option<String>,
    country: Option<String>,
    exchange: Option<String>,
    #[serde(rename = "finnhubIndustry")]
    finnhub_industry: Option<String>,
    ticker: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SupportResistanceScan {
    levels: Option<Vec<f64>>,
}

impl FinnhubProvider {
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

    /// Fetches raw support/resistance levels at daily resolution.
    ///
    /// # Errors
    /// Returns error if the request fails or the body cannot be decoded.
    pub async fn fetch_support_resistance(
        &self,
        symbol: &str,
    ) -> Result<Option<Vec<f64>>, ProviderError> {
        let url = format!("{}/scan/support-resistance", self.base_url);
        let scan: SupportResistanceScan = get_json(
            &self.client,
            &url,
            &[
                ("symbol", symbol),
                ("resolution", "D"),
                ("token", &self.api_key),
            ],
        )
        .await?;
        Ok(scan.levels.filter(|levels| !levels.is_empty()))
    }
}

fn map_quote(raw: FinnhubQuote) -> Option<ProviderQuote> {
    let price = raw.c?;
    // Finnhub reports unknown symbols as an all-zero quote with t = 0.
    if price == 0.0 && raw.t.unwrap_or(0) == 0 {
        return None;
    }
    Some(ProviderQuote {
        price: Some(price),
        change: raw.d,
        change_percent: raw.dp,
        high: raw.h,
        low: raw.l,
        open: raw.o,
        previous_close: raw.pc,
        timestamp: raw.t.and_then(|t| DateTime::from_timestamp(t, 0)),
        ..Default::default()
    })
}

fn map_profile(raw: FinnhubProfile) -> Option<CompanyProfile> {
    if raw.name.is_none() && raw.ticker.is_none() {
        return None;
    }
    Some(CompanyProfile {
        name: raw.name,
        country: raw.country,
        sector: None,
        industry: raw.finnhub_industry,
        exchange: raw.exchange,
    })
}

#[async_trait]
impl QuoteProvider for FinnhubProvider {
    fn name(&self) -> &'static str {
        "finnhub"
    }

    async fn fetch_quote(&self, symbol: &str) -> Result<Option<ProviderQuote>, ProviderError> {
        let url = format!("{}/quote", self.base_url);
        let raw: FinnhubQuote = get_json(
            &self.client,
            &url,
            &[("symbol", symbol), ("token", &self.api_key)],
        )
        .await?;
        Ok(map_quote(raw))
    }

    async fn fetch_company_profile(
        &self,
        symbol: &str,
    ) -> Result<Option<CompanyProfile>, ProviderError> {
        let url = format!("{}/stock/profile2", self.base_url);
        let raw: FinnhubProfile = get_json(
            &self.client,
            &url,
            &[("symbol", symbol), ("token", &self.api_key)],
        )
        .await?;
        Ok(map_profile(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_map_quote() {
        let raw: FinnhubQuote = serde_json::from_value(json!({
            "c": 261.74, "d": 1.5, "dp": 0.58,
            "h": 263.31, "l": 260.68, "o": 261.07,
            "pc": 260.24, "t": 1582641000
        }))
        .unwrap();

        let quote = map_quote(raw).expect("valid quote");
        assert_eq!(quote.price, Some(261.74));
        assert_eq!(quote.change, Some(1.5));
        assert_eq!(quote.change_percent, Some(0.58));
        assert_eq!(quote.previous_close, Some(260.24));
        assert!(quote.timestamp.is_some());
        assert_eq!(quote.volume, None);
    }

    #[test]
    fn test_map_quote_unknown_symbol() {
        let raw: FinnhubQuote = serde_json::from_value(json!({
            "c": 0, "d": null, "dp": null,
            "h": 0, "l": 0, "o": 0, "pc": 0, "t": 0
        }))
        .unwrap();
        assert!(map_quote(raw).is_none());
    }

    #[test]
    fn test_map_profile() {
        let raw: FinnhubProfile = serde_json::from_value(json!({
            "country": "US",
            "exchange": "NASDAQ NMS - GLOBAL MARKET",
            "finnhubIndustry": "Technology",
            "name": "Apple Inc",
            "ticker": "AAPL"
        }))
        .unwrap();

        let profile = map_profile(raw).expect("valid profile");
        assert_eq!(profile.name.as_deref(), Some("Apple Inc"));
        assert_eq!(profile.industry.as_deref(), Some("Technology"));
        assert_eq!(profile.sector, None);
    }

    #[test]
    fn test_map_profile_empty_body() {
        let raw: FinnhubProfile = serde_json::from_value(json!({})).unwrap();
        assert!(map_profile(raw).is_none());
    }
}
