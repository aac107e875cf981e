//! HTTP client library for the Marketfeed API.
//!
//! This crate provides a typed HTTP client for the Marketfeed backend with
//! support for every REST endpoint plus a WebSocket client for the live
//! price feed.
//!
//! # Example
//!
//! ```no_run
//! use marketfeed_client::{ClientConfig, MarketfeedClient};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), marketfeed_client::Error> {
//!     let client = MarketfeedClient::new(ClientConfig {
//!         base_url: "http://localhost:8080".into(),
//!         timeout: Duration::from_secs(30),
//!     })?;
//!
//!     // Check health
//!     let health = client.health_check().await?;
//!     println!("Status: {}", health.status);
//!
//!     // Force a quote refresh, then read it back
//!     let snapshot = client.refresh_quote("AAPL").await?;
//!     println!("{} @ {}", snapshot.symbol, snapshot.price);
//!
//!     Ok(())
//! }
//! ```

mod client;
mod error;
mod types;
mod websocket;

pub use client::{ClientConfig, MarketfeedClient};
pub use error::Error;
pub use types::*;
pub use websocket::{ClientCommand, WsClient, WsMessage};
