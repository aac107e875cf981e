//! Twelve Data adapter: quotes and RSI.
//!
//! Twelve Data reports numbers as strings and signals errors inside a 200
//! body (`{"code": 400, "status": "error", ...}`), so both quirks are handled
//! here rather than leaking into the pipeline.

use async_trait::async_trait;
use chrono::DateTime;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use super::{ProviderError, ProviderQuote, QuoteProvider, RsiSource, get_json, parse_numeric};

const BASE_URL: &str = "https://api.twelvedata.com";

/// Twelve Data adapter.
#[derive(Debug, Clone)]
pub struct TwelveDataProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct TdQuote {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    close: Option<String>,
    #[serde(default)]
    open: Option<String>,
    #[serde(default)]
    high: Option<String>,
    #[serde(default)]
    low: Option<String>,
    #[serde(default)]
    previous_close: Option<String>,
    #[serde(default)]
    change: Option<String>,
    #[serde(default)]
    percent_change: Option<String>,
    #[serde(default)]
    volume: Option<String>,
    #[serde(default)]
    timestamp: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct TdRsi {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    values: Option<Vec<TdRsiPoint>>,
}

#[derive(Debug, Deserialize)]
struct TdRsiPoint {
    #[serde(default)]
    rsi: Option<String>,
}

impl TwelveDataProvider {
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

fn in_body_error(code: Option<i64>, status: Option<&str>) -> bool {
    status == Some("error") || code.is_some()
}

fn map_quote(raw: TdQuote) -> Result<Option<ProviderQuote>, ProviderError> {
    if in_body_error(raw.code, raw.status.as_deref()) {
        if raw.code == Some(401) {
            return Err(ProviderError::Auth(
                raw.message.unwrap_or_else(|| "api key rejected".to_string()),
            ));
        }
        return Ok(None);
    }

    let Some(price) = raw.close.as_deref().and_then(parse_numeric) else {
        return Ok(None);
    };

    Ok(Some(ProviderQuote {
        price: Some(price),
        change: raw.change.as_deref().and_then(parse_numeric),
        change_percent: raw.percent_change.as_deref().and_then(parse_numeric),
        volume: raw
            .volume
            .as_deref()
            .and_then(parse_numeric)
            .map(|v| v as i64),
        high: raw.high.as_deref().and_then(parse_numeric),
        low: raw.low.as_deref().and_then(parse_numeric),
        open: raw.open.as_deref().and_then(parse_numeric),
        previous_close: raw.previous_close.as_deref().and_then(parse_numeric),
        timestamp: raw.timestamp.and_then(|t| DateTime::from_timestamp(t, 0)),
        ..Default::default()
    }))
}

fn map_rsi(raw: TdRsi) -> Option<f64> {
    if in_body_error(raw.code, raw.status.as_deref()) {
        return None;
    }
    raw.values?
        .first()?
        .rsi
        .as_deref()
        .and_then(parse_numeric)
}

#[async_trait]
impl QuoteProvider for TwelveDataProvider {
    fn name(&self) -> &'static str {
        "twelvedata"
    }

    async fn fetch_quote(&self, symbol: &str) -> Result<Option<ProviderQuote>, ProviderError> {
        let url = format!("{}/quote", self.base_url);
        let raw: TdQuote = get_json(
            &self.client,
            &url,
            &[("symbol", symbol), ("apikey", &self.api_key)],
        )
        .await?;
        map_quote(raw)
    }
}

#[async_trait]
impl RsiSource for TwelveDataProvider {
    fn name(&self) -> &'static str {
        "twelvedata"
    }

    async fn fetch_rsi(&self, symbol: &str, period: u32) -> Result<Option<f64>, ProviderError> {
        let url = format!("{}/rsi", self.base_url);
        let period = period.to_string();
        let raw: TdRsi = get_json(
            &self.client,
            &url,
            &[
                ("symbol", symbol),
                ("interval", "1day"),
                ("time_period", &period),
                ("outputsize", "1"),
                ("apikey", &self.api_key),
            ],
        )
        .await?;
        Ok(map_rsi(raw))
    }
}
