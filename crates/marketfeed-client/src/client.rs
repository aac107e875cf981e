//! HTTP client for the marketfeed API.

use crate::error::Error;
use crate::types::*;
use reqwest::Client;
use std::time::Duration;


/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the API (e.g., "http://localhost:8080").
    pub base_url: String,
    /// Request timeout.
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// HTTP client for the Marketfeed API.
#[derive(Debug, Clone)]
pub struct MarketfeedClient {
    client: Client,
    base_url: String,
}

impl MarketfeedClient {
    /// Creates a new client with the given configuration.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self, Error> {
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Creates a new client with default configuration.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built.
    pub fn with_base_url(base_url: &str) -> Result<Self, Error> {
        Self::new(ClientConfig {
            base_url: base_url.to_string(),
            ..Default::default()
        })
    }

    // ========================================================================
    // Health & Stats
    // ========================================================================

    /// Performs a health check.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn health_check(&self) -> Result<HealthResponse, Error> {
        let url = format!("{}/health", self.base_url);
        let resp = self.client.get(&url).send().await?;
        self.handle_response(resp).await
    }

    /// Gets cache and hub statistics.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn get_stats(&self) -> Result<StatsResponse, Error> {
        let url = format!("{}/api/v1/stats", self.base_url);
        let resp = self.client.get(&url).send().await?;
        self.handle_response(resp).await
    }

    // ========================================================================
    // Quotes
    // ========================================================================

    /// Lists all cached quotes.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn list_quotes(&self) -> Result<QuotesResponse, Error> {
        let url = format!("{}/api/v1/quotes", self.base_url);
        let resp = self.client.get(&url).send().await?;
        self.handle_response(resp).await
    }

    /// Gets the cached snapshot for a symbol.
    ///
    /// # Errors
    /// Returns [`Error::NotFound`] if the symbol is not cached, or another
    /// error if the request fails.
    pub async fn get_quote(&self, symbol: &str) -> Result<PriceSnapshot, Error> {
        let url = format!("{}/api/v1/quotes/{}", self.base_url, symbol);
        let resp = self.client.get(&url).send().await?;
        self.handle_response(resp).await
    }

    /// Forces a provider refresh for a symbol and returns the new snapshot.
    ///
    /// # Errors
    /// Returns [`Error::NotFound`] if no provider can quote the symbol, or
    /// another error if the request fails.
    pub async fn refresh_quote(&self, symbol: &str) -> Result<PriceSnapshot, Error> {
        let url = format!("{}/api/v1/quotes/{}/refresh", self.base_url, symbol);
        let resp = self.client.post(&url).send().await?;
        self.handle_response(resp).await
    }

    /// Gets recent persisted price history for a symbol, newest first.
    ///
    /// # Arguments
    /// * `limit` - Maximum number of rows (server default 50, capped at 500).
    ///
    /// # Errors
    /// Returns error if the request fails or the server has no database
    /// configured.
    pub async fn get_history(
        &self,
        symbol: &str,
        limit: Option<i64>,
    ) -> Result<HistoryResponse, Error> {
        let url = format!("{}/api/v1/quotes/{}/history", self.base_url, symbol);
        let mut request = self.client.get(&url);
        if let Some(limit) = limit {
            request = request.query(&[("limit", limit)]);
        }
        let resp = request.send().await?;
        self.handle_response(resp).await
    }

    // ========================================================================
    // Indicators
    // ========================================================================

    /// Gets the latest RSI reading for a symbol.
    ///
    /// # Errors
    /// Returns error if the request fails or no RSI-capable provider is
    /// configured.
    pub async fn get_rsi(&self, symbol: &str) -> Result<RsiReading, Error> {
        let url = format!("{}/api/v1/indicators/{}/rsi", self.base_url, symbol);
        let resp = self.client.get(&url).send().await?;
        self.handle_response(resp).await
    }

    /// Gets support and resistance levels for a symbol.
    ///
    /// # Arguments
    /// * `price` - Optional reference price; defaults to the server-side
    ///   cached price.
    ///
    /// # Errors
    /// Returns error if the request fails or no levels-capable provider is
    /// configured.
    pub async fn get_support_resistance(
        &self,
        symbol: &str,
        price: Option<f64>,
    ) -> Result<SupportResistance, Error> {
        let url = format!(
            "{}/api/v1/indicators/{}/support-resistance",
            self.base_url, symbol
        );
        let mut request = self.client.get(&url);
        if let Some(price) = price {
            request = request.query(&[("price", price)]);
        }
        let resp = request.send().await?;
        self.handle_response(resp).await
    }

    // ========================================================================
    // Market Movers
    // ========================================================================

    /// Gets the day's top gainers and losers.
    ///
    /// # Errors
    /// Returns error if the request fails or no movers provider is
    /// configured.
    pub async fn get_market_movers(&self) -> Result<MoversReport, Error> {
        let url = format!("{}/api/v1/market/movers", self.base_url);
        let resp = self.client.get(&url).send().await?;
        self.handle_response(resp).await
    }

    /// Gets the losers currently testing or breaking a support level.
    ///
    /// # Errors
    /// Returns error if the request fails or the screen's providers are not
    /// configured.
    pub async fn get_support_breaks(&self) -> Result<SupportBreaksResponse, Error> {
        let url = format!("{}/api/v1/market/support-breaks", self.base_url);
        let resp = self.client.get(&url).send().await?;
        self.handle_response(resp).await
    }

    /// Returns the WebSocket URL for this client.
    #[must_use]
    pub fn ws_url(&self) -> String {
        let ws_base = self
            .base_url
            .replace("http://", "ws://")
            .replace("https://", "wss://");
        format!("{}/ws", ws_base)
    }

    // ========================================================================
    // Internal Helpers
    // ========================================================================

    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, Error> {
        let status = resp.status();

        if status.is_success() {
            return Ok(resp.json().await?);
        }

        // Non-2xx bodies are normally the server's {error, code} payload,
        // but a proxy in between may answer with plain text or HTML.
        let body = resp.text().await.unwrap_or_default();
        let (message, code) = match serde_json::from_str::<ErrorBody>(&body) {
            Ok(parsed) => (parsed.error, Some(parsed.code)),
            Err(_) => (body, None),
        };

        if status.as_u16() == 404 {
            Err(Error::NotFound(message))
        } else {
            Err(Error::Api {
                status: status.as_u16(),
                code,
                message,
            })
        }
    }
}

/// Error payload shape the server attaches to every non-2xx response.
#[derive(Debug, serde::Deserialize)]
struct ErrorBody {
    error: String,
    code: String,
}
