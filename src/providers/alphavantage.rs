//! Alpha Vantage adapter: quotes and RSI.
//!
//! Alpha Vantage wraps quotes in a `Global Quote` object with numbered keys
//! and reports quota exhaustion as a 200 body carrying only a `Note`. An
//! unknown symbol comes back as an empty `Global Quote` object.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

use super::{ProviderError, ProviderQuote, QuoteProvider, RsiSource, get_json, parse_numeric};

const BASE_URL: &str = "https://www.alphavantage.co";

/// Alpha Vantage adapter.
#[derive(Debug, Clone)]
pub struct AlphaVantageProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct AvEnvelope {
    #[serde(rename = "Global Quote", default)]
    global_quote: Option<AvQuote>,
    #[serde(rename = "Note", default)]
    note: Option<String>,
    #[serde(rename = "Information", default)]
    information: Option<String>,
    #[serde(rename = "Error Message", default)]
    error_message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AvQuote {
    #[serde(rename = "05. price", default)]
    price: Option<String>,
    #[serde(rename = "02. open", default)]
    open: Option<String>,
    #[serde(rename = "03. high", default)]
    high: Option<String>,
    #[serde(rename = "04. low", default)]
    low: Option<String>,
    #[serde(rename = "06. volume", default)]
    volume: Option<String>,
    #[serde(rename = "08. previous close", default)]
    previous_close: Option<String>,
    #[serde(rename = "09. change", default)]
    change: Option<String>,
    #[serde(rename = "10. change percent", default)]
    change_percent: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AvRsiEnvelope {
    #[serde(rename = "Technical Analysis: RSI", default)]
    analysis: Option<BTreeMap<String, AvRsiPoint>>,
}

#[derive(Debug, Deserialize)]
struct AvRsiPoint {
    #[serde(rename = "RSI", default)]
    rsi: Option<String>,
}

impl AlphaVantageProvider {
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
}

fn map_quote(raw: AvEnvelope) -> Result<Option<ProviderQuote>, ProviderError> {
    if let Some(message) = raw.error_message {
        if message.contains("apikey") {
            return Err(ProviderError::Auth(message));
        }
        return Ok(None);
    }
    // Quota exhaustion arrives as a bare Note/Information body.
    if raw.note.is_some() || raw.information.is_some() {
        return Ok(None);
    }

    let quote = raw.global_quote.unwrap_or_default();
    let Some(price) = quote.price.as_deref().and_then(parse_numeric) else {
        return Ok(None);
    };

    Ok(Some(ProviderQuote {
        price: Some(price),
        change: quote.change.as_deref().and_then(parse_numeric),
        change_percent: quote.change_percent.as_deref().and_then(parse_numeric),
        volume: quote
            .volume
            .as_deref()
            .and_then(parse_numeric)
            .map(|v| v as i64),
        high: quote.high.as_deref().and_then(parse_numeric),
        low: quote.low.as_deref().and_then(parse_numeric),
        open: quote.open.as_deref().and_then(parse_numeric),
        previous_close: quote.previous_close.as_deref().and_then(parse_numeric),
        ..Default::default()
    }))
}

fn map_rsi(raw: AvRsiEnvelope) -> Option<f64> {
    // Dates are ISO formatted, so the lexicographically last key is the
    // most recent reading.
    let analysis = raw.analysis?;
    let (_, point) = analysis.last_key_value()?;
    point.rsi.as_deref().and_then(parse_numeric)
}

#[async_trait]
impl QuoteProvider for AlphaVantageProvider {
    fn name(&self) -> &'static str {
        "alphavantage"
    }

    async fn fetch_quote(&self, symbol: &str) -> Result<Option<ProviderQuote>, ProviderError> {
        let url = format!("{}/query", self.base_url);
        let raw: AvEnvelope = get_json(
            &self.client,
            &url,
            &[
                ("function", "GLOBAL_QUOTE"),
                ("symbol", symbol),
                ("apikey", &self.api_key),
            ],
        )
        .await?;
        map_quote(raw)
    }
}

#[async_trait]
impl RsiSource for AlphaVantageProvider {
    fn name(&self) -> &'static str {
        "alphavantage"
    }

    async fn fetch_rsi(&self, symbol: &str, period: u32) -> Result<Option<f64>, ProviderError> {
        let url = format!("{}/query", self.base_url);
        let period = period.to_string();
        let raw: AvRsiEnvelope = get_json(
            &self.client,
            &url,
            &[
                ("function", "RSI"),
                ("symbol", symbol),
                ("interval", "daily"),
                ("time_period", &period),
                ("series_type", "close"),
                ("apikey", &self.api_key),
            ],
        )
        .await?;
        Ok(map_rsi(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_map_quote() {
        let raw: AvEnvelope = serde_json::from_value(json!({
            "Global Quote": {
                "01. symbol": "IBM",
                "02. open": "182.5000",
                "03. high": "184.0000",
                "04. low": "182.3100",
                "05. price": "183.6300",
                "06. volume": "3614992",
                "07. latest trading day": "2024-01-05",
                "08. previous close": "182.6800",
                "09. change": "0.9500",
                "10. change percent": "0.5200%"
            }
        }))
        .unwrap();

        let quote = map_quote(raw).unwrap().expect("valid quote");
        assert_eq!(quote.price, Some(183.63));
        assert_eq!(quote.change_percent, Some(0.52));
        assert_eq!(quote.volume, Some(3_614_992));
    }

    #[test]
    fn test_map_quote_empty_global_quote() {
        let raw: AvEnvelope = serde_json::from_value(json!({"Global Quote": {}})).unwrap();
        assert_eq!(map_quote(raw).unwrap(), None);
    }

    #[test]
    fn test_map_quote_rate_limit_note() {
        let raw: AvEnvelope = serde_json::from_value(json!({
            "Note": "Thank you for using Alpha Vantage! Our standard API rate limit is 25 requests per day."
        }))
        .unwrap();
        assert_eq!(map_quote(raw).unwrap(), None);
    }

    #[test]
    fn test_map_quote_bad_key() {
        let raw: AvEnvelope = serde_json::from_value(json!({
            "Error Message": "the parameter apikey is invalid or missing"
        }))
        .unwrap();
        assert!(matches!(map_quote(raw), Err(ProviderError::Auth(_))));
    }

    #[test]
    fn test_map_rsi_takes_latest_reading() {
        let raw: AvRsiEnvelope = serde_json::from_value(json!({
            "Technical Analysis: RSI": {
                "2024-01-04": {"RSI": "52.1000"},
                "2024-01-05": {"RSI": "55.4321"},
                "2024-01-03": {"RSI": "49.0000"}
            }
        }))
        .unwrap();
        assert_eq!(map_rsi(raw), Some(55.4321));
    }
}
