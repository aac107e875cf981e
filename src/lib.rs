//! # Marketfeed Backend - Real-Time Market Data Server
//!
//! A real-time market data engine that aggregates stock quotes from several
//! upstream providers, keeps the latest snapshot per symbol in an in-memory
//! cache and fans updates out to WebSocket subscribers. Built with
//! [Axum](https://crates.io/crates/axum) for async HTTP and WebSocket
//! handling, with optional PostgreSQL persistence via
//! [sqlx](https://crates.io/crates/sqlx).
//!
//! ## Key Features
//!
//! - **Multi-Provider Quotes**: Failover pipeline over Finnhub, Twelve Data,
//!   Alpha Vantage and FMP adapters, tried in configured order until one
//!   returns a usable quote.
//!
//! - **Simulated Fallback**: A random-walk simulator keeps the feed alive for
//!   any symbol no provider can quote, so the platform works without API keys.
//!
//! - **WebSocket Feed**: Symbol-scoped subscriptions with snapshot-on-subscribe,
//!   periodic heartbeats and JSON command/event framing.
//!
//! - **Subscription-Driven Refresh**: Only symbols with at least one subscriber
//!   are refreshed against upstream providers, keeping API quota usage bounded.
//!
//! - **Technical Indicators**: RSI readings, support/resistance levels and a
//!   support-break screener over the day's market movers.
//!
//! - **Optional Persistence**: Symbol catalog, category assignments and price
//!   history in PostgreSQL; the server runs cache-only when no database is
//!   configured.
//!
//! - **CORS Support**: Cross-origin resource sharing enabled for frontend
//!   integration.
//!
//! - **Structured Logging**: Request tracing with `tower-http` for debugging
//!   and monitoring.
//!
//! ## Architecture
//!
//! Quotes flow from the provider adapters through the failover pipeline into
//! the refresh engine, which feeds the cache, the broadcast hub and the
//! optional database:
//!
//! ```text
//! Finnhub / Twelve Data / Alpha Vantage / FMP
//!                     │
//!                     ▼
//!             FetchPipeline (failover)
//!                     │
//!                     ▼
//!    PriceSimulator ► UpdateEngine ──► PostgreSQL (optional)
//!                     │
//!           ┌─────────┴─────────┐
//!           ▼                   ▼
//!       PriceCache         BroadcastHub
//!           │                   │
//!           ▼                   ▼
//!       REST API        WebSocket clients
//! ```
//!
//! ## Module Structure
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`api`] | REST handlers, router configuration and the WebSocket feed |
//! | [`bootstrap`] | Symbol catalog bootstrap and category metadata |
//! | [`cache`] | Latest-snapshot price cache and subscription tracking |
//! | [`classify`] | Heuristic symbol classification into categories |
//! | [`config`] | TOML configuration with environment overrides |
//! | [`db`] | PostgreSQL pool, schema types and the symbol store |
//! | [`engine`] | Refresh loops, simulation fallback and persistence spooling |
//! | [`error`] | API error types with `IntoResponse` implementation |
//! | [`hub`] | Room-based broadcast hub for WebSocket fan-out |
//! | [`indicators`] | RSI, support/resistance levels and the support-break screener |
//! | [`models`] | Request/response DTOs and the price snapshot type |
//! | [`pipeline`] | Provider failover pipeline |
//! | [`providers`] | Upstream quote provider adapters |
//! | [`simulation`] | Random-walk price simulator |
//! | [`state`] | Application state management |
//!
//! ## API Endpoints
//!
//! ### Health & Statistics
//!
//! | Method | Endpoint | Description |
//! |--------|----------|-------------|
//! | GET | `/health` | Health check |
//! | GET | `/api/v1/stats` | Cache and hub statistics |
//!
//! ### Quotes
//!
//! | Method | Endpoint | Description |
//! |--------|----------|-------------|
//! | GET | `/api/v1/quotes` | List all cached quotes |
//! | GET | `/api/v1/quotes/{symbol}` | Get the cached snapshot |
//! | POST | `/api/v1/quotes/{symbol}/refresh` | Force a provider refresh |
//! | GET | `/api/v1/quotes/{symbol}/history` | Recent persisted price history |
//!
//! ### Indicators & Market
//!
//! | Method | Endpoint | Description |
//! |--------|----------|-------------|
//! | GET | `/api/v1/indicators/{symbol}/rsi` | Latest RSI reading |
//! | GET | `/api/v1/indicators/{symbol}/support-resistance` | Support and resistance levels |
//! | GET | `/api/v1/market/movers` | Day's top gainers and losers |
//! | GET | `/api/v1/market/support-breaks` | Movers trading below support |
//!
//! ### WebSocket
//!
//! Connect to `/ws` and exchange JSON messages:
//!
//! | Command | Payload | Effect |
//! |---------|---------|--------|
//! | `subscribe` | `{"action": "subscribe", "symbols": ["AAPL"]}` | Join symbol rooms, receive live updates |
//! | `unsubscribe` | `{"action": "unsubscribe", "symbols": ["AAPL"]}` | Leave symbol rooms |
//! | `getSnapshot` | `{"action": "getSnapshot", "symbol": "AAPL"}` | One-off cached snapshot |
//!
//! The server pushes `connected`, `subscribed`, `unsubscribed`, `priceUpdate`,
//! `snapshot`, `heartbeat` and `error` events.
//!
//! ## Example Usage
//!
//! ### Starting the Server
//!
//! ```bash
//! # Development mode (simulation only, no API keys needed)
//! cargo run
//!
//! # With real providers and persistence
//! FINNHUB_API_KEY=xxx DATABASE_URL=postgres://localhost/marketfeed cargo run
//!
//! # Release build
//! cargo build --release
//! ./target/release/marketfeed-backend
//! ```
//!
//! ### API Requests
//!
//! ```bash
//! # Force a refresh so the cache has something to serve
//! curl -X POST http://localhost:8080/api/v1/quotes/AAPL/refresh
//!
//! # Read the cached snapshot
//! curl http://localhost:8080/api/v1/quotes/AAPL
//!
//! # Recent price history (requires a configured database)
//! curl "http://localhost:8080/api/v1/quotes/AAPL/history?limit=10"
//!
//! # Latest RSI reading
//! curl http://localhost:8080/api/v1/indicators/AAPL/rsi
//!
//! # Day's gainers and losers
//! curl http://localhost:8080/api/v1/market/movers
//!
//! # Global statistics
//! curl http://localhost:8080/api/v1/stats
//! ```
//!
//! ### Live Feed
//!
//! ```bash
//! wscat -c ws://localhost:8080/ws
//! > {"action": "subscribe", "symbols": ["AAPL", "MSFT"]}
//! ```
//!
//! ## Dependencies
//!
//! - **axum** (0.8): Async web framework with WebSocket support
//! - **tower-http** (0.6): HTTP middleware (CORS, request tracing)
//! - **tokio** (1.49): Async runtime
//! - **sqlx** (0.8): PostgreSQL driver and migrations
//! - **reqwest** (0.13): HTTP client for the provider adapters
//! - **serde** (1.0): Serialization/deserialization
//! - **tracing** (0.1): Structured logging

pub mod api;
pub mod bootstrap;
pub mod cache;
pub mod classify;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod hub;
pub mod indicators;
pub mod models;
pub mod pipeline;
pub mod providers;
pub mod simulation;
pub mod state;
