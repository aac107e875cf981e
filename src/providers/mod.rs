//! Quote provider adapters.
//!
//! One adapter per upstream market-data API, all conforming to the
//! [`QuoteProvider`] contract: a symbol in, a normalized quote out. "No data"
//! is `Ok(None)`, never an error; errors are reserved for transport and
//! decoding failures so the fetch pipeline can fall through to the next
//! adapter. Numeric fields a provider does not publish stay absent and are
//! filled during the merge step.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

use crate::config::ProvidersConfig;

pub mod alphavantage;
pub mod finnhub;
pub mod fmp;
pub mod twelvedata;

pub use alphavantage::AlphaVantageProvider;
pub use finnhub::FinnhubProvider;
pub use fmp::FmpProvider;
pub use twelvedata::TwelveDataProvider;

/// Error raised by a provider adapter.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Transport-level failure (connect, timeout, TLS).
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Upstream answered with a non-success status.
    #[error("unexpected status: {0}")]
    Status(reqwest::StatusCode),

    /// Body arrived but could not be decoded into the expected shape.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// The API key was rejected.
    #[error("authentication rejected: {0}")]
    Auth(String),
}

/// Normalized quote as returned by an adapter. Every field is optional;
/// validity is judged by the pipeline, completion happens at merge time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderQuote {
    /// Last price.
    pub price: Option<f64>,
    /// Absolute change versus previous close.
    pub change: Option<f64>,
    /// Percentage change versus previous close.
    pub change_percent: Option<f64>,
    /// Session volume.
    pub volume: Option<i64>,
    /// Best bid price.
    pub bid: Option<f64>,
    /// Best ask price.
    pub ask: Option<f64>,
    /// Best bid size.
    pub bid_size: Option<i64>,
    /// Best ask size.
    pub ask_size: Option<i64>,
    /// Session high.
    pub high: Option<f64>,
    /// Session low.
    pub low: Option<f64>,
    /// Session open.
    pub open: Option<f64>,
    /// Previous session close.
    pub previous_close: Option<f64>,
    /// Quote time as reported by the provider.
    pub timestamp: Option<DateTime<Utc>>,
}

/// Company profile metadata used by the symbol classifier.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompanyProfile {
    /// Company name.
    pub name: Option<String>,
    /// Country of listing.
    pub country: Option<String>,
    /// Sector string as reported by the provider.
    pub sector: Option<String>,
    /// Industry string as reported by the provider.
    pub industry: Option<String>,
    /// Exchange short name.
    pub exchange: Option<String>,
}

/// Contract every quote source implements.
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    /// Stable adapter name, also used in configuration ordering lists.
    fn name(&self) -> &'static str;

    /// Fetches the latest quote for a symbol. `Ok(None)` means the provider
    /// answered but has no data for this symbol.
    async fn fetch_quote(&self, symbol: &str) -> Result<Option<ProviderQuote>, ProviderError>;

    /// Fetches company profile metadata. Adapters without a profile endpoint
    /// keep the default.
    async fn fetch_company_profile(
        &self,
        _symbol: &str,
    ) -> Result<Option<CompanyProfile>, ProviderError> {
        Ok(None)
    }
}

/// Contract for RSI-capable sources, consumed by the indicators engine.
#[async_trait]
pub trait RsiSource: Send + Sync {
    /// Stable adapter name.
    fn name(&self) -> &'static str;

    /// Fetches the latest daily RSI value for a symbol.
    async fn fetch_rsi(&self, symbol: &str, period: u32) -> Result<Option<f64>, ProviderError>;
}

/// Builds the quote adapters in pipeline order, skipping any provider that
/// is disabled or missing credentials.
///
/// # Errors
/// Returns error if an HTTP client cannot be constructed.
pub fn build_providers(
    config: &ProvidersConfig,
) -> Result<Vec<Arc<dyn QuoteProvider>>, ProviderError> {
    let timeout = Duration::from_secs(config.request_timeout_secs);
    let mut providers: Vec<Arc<dyn QuoteProvider>> = Vec::new();

    for name in config.pipeline_order() {
        let Some(provider_config) = config.get(&name) else {
            continue;
        };
        if !provider_config.is_usable() {
            continue;
        }
        let adapter: Arc<dyn QuoteProvider> = match name.as_str() {
            "finnhub" => Arc::new(FinnhubProvider::new(&provider_config.api_key, timeout)?),
            "twelvedata" => Arc::new(TwelveDataProvider::new(&provider_config.api_key, timeout)?),
            "alphavantage" => {
                Arc::new(AlphaVantageProvider::new(&provider_config.api_key, timeout)?)
            }
            "fmp" => Arc::new(FmpProvider::new(&provider_config.api_key, timeout)?),
            _ => continue,
        };
        providers.push(adapter);
    }

    Ok(providers)
}

/// Builds the RSI sources in the given preference order. Only adapters with
/// a technical-indicator endpoint qualify; unusable or non-RSI-capable names
/// are skipped.
///
/// # Errors
/// Returns error if an HTTP client cannot be constructed.
pub fn build_rsi_sources(
    config: &ProvidersConfig,
    order: &[String],
) -> Result<Vec<Arc<dyn RsiSource>>, ProviderError> {
    let timeout = Duration::from_secs(config.request_timeout_secs);
    let mut sources: Vec<Arc<dyn RsiSource>> = Vec::new();

    for name in order {
        let Some(provider_config) = config.get(name) else {
            continue;
        };
        if !provider_config.is_usable() {
            continue;
        }
        let source: Arc<dyn RsiSource> = match name.as_str() {
            "twelvedata" => Arc::new(TwelveDataProvider::new(&provider_config.api_key, timeout)?),
            "alphavantage" => {
                Arc::new(AlphaVantageProvider::new(&provider_config.api_key, timeout)?)
            }
            _ => continue,
        };
        sources.push(source);
    }

    Ok(sources)
}

/// Issues a GET request and decodes the JSON body.
pub(crate) async fn get_json<T: DeserializeOwned>(
    client: &Client,
    url: &str,
    query: &[(&str, &str)],
) -> Result<T, ProviderError> {
    let response = client.get(url).query(query).send().await?;
    let status = response.status();
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Err(ProviderError::Auth(format!("status {}", status.as_u16())));
    }
    if !status.is_success() {
        return Err(ProviderError::Status(status));
    }
    response
        .json::<T>()
        .await
        .map_err(|e| ProviderError::Decode(e.to_string()))
}

/// Parses a textual number, tolerating thousands separators and a trailing
/// percent sign.
pub(crate) fn parse_numeric(value: &str) -> Option<f64> {
    let cleaned = value.trim().trim_end_matches('%').replace(',', "");
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok()
}
