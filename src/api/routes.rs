//! Route configuration.

use crate::api::{handlers, websocket};
use crate::state::AppState;
use axum::Router;
use axum::routing::{get, post};
use std::sync::Arc;

/// Creates the API router.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // WebSocket
        .route("/ws", get(websocket::ws_handler))
        // Statistics
        .route("/api/v1/stats", get(handlers::get_stats))
        // Quotes
        .route("/api/v1/quotes", get(handlers::list_quotes))
        .route("/api/v1/quotes/{symbol}", get(handlers::get_quote))
        .route(
            "/api/v1/quotes/{symbol}/refresh",
            post(handlers::refresh_quote),
        )
        .route(
            "/api/v1/quotes/{symbol}/history",
            get(handlers::get_quote_history),
        )
        // Indicators
        .route("/api/v1/indicators/{symbol}/rsi", get(handlers::get_rsi))
        .route(
            "/api/v1/indicators/{symbol}/support-resistance",
            get(handlers::get_support_resistance),
        )
        // Market movers
        .route("/api/v1/market/movers", get(handlers::get_market_movers))
        .route(
            "/api/v1/market/support-breaks",
            get(handlers::get_support_breaks),
        )
        .with_state(state)
}
