//! Integration tests for the Marketfeed API.
//!
//! These tests require the API server to be running with its default
//! configuration (simulation enabled). Configure the server URL via the
//! `API_BASE_URL` environment variable (default: `http://localhost:8080`).

use marketfeed_client::{ClientConfig, MarketfeedClient};
use std::time::Duration;

/// Gets the API base URL from environment or uses default.
#[must_use]
pub fn get_api_url() -> String {
    std::env::var("API_BASE_URL").unwrap_or_else(|_| "http://localhost:8080".to_string())
}

/// Gets the WebSocket URL matching [`get_api_url`].
#[must_use]
pub fn get_ws_url() -> String {
    let base = get_api_url()
        .replace("http://", "ws://")
        .replace("https://", "wss://");
    format!("{}/ws", base)
}

/// Creates a test client configured for the API.
///
/// # Errors
/// Returns error if client creation fails.
pub fn create_test_client() -> Result<MarketfeedClient, marketfeed_client::Error> {
    MarketfeedClient::new(ClientConfig {
        base_url: get_api_url(),
        timeout: Duration::from_secs(10),
    })
}

/// Generates a unique test symbol to avoid conflicts between tests.
#[must_use]
pub fn unique_symbol(prefix: &str) -> String {
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::{SystemTime, UNIX_EPOCH};

    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64;
    let counter = COUNTER.fetch_add(1, Ordering::Relaxed);

    format!("{}{}{}", prefix, ts % 100_000, counter)
}
