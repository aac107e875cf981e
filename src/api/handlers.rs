//! REST API handlers.
//!
//! The REST surface is the explicit-error counterpart of the fail-quiet
//! WebSocket feed: cache misses and missing provider capabilities come back
//! as status codes instead of silent absence.

use crate::error::ApiError;
use crate::indicators::{MoversReport, RsiReading, SupportResistance};
use crate::models::{
    HealthResponse, HistoryQuery, HistoryResponse, PriceSnapshot, QuotesResponse, StatsResponse,
    SupportBreaksResponse, SupportResistanceQuery,
};
use crate::state::AppState;
use axum::Json;
use axum::extract::{Path, Query, State};
use chrono::Utc;
use std::sync::Arc;


// ============================================================================
// Helpers
// ============================================================================

/// Uppercases a path symbol, rejecting blank input.
fn canonical_symbol(raw: &str) -> Result<String, ApiError> {
    let symbol = raw.trim().to_uppercase();
    if symbol.is_empty() {
        return Err(ApiError::InvalidRequest(
            "symbol must not be empty".to_string(),
        ));
    }
    Ok(symbol)
}

/// Current price for indicator math: the cached snapshot's price, else one
/// pipeline fetch. The fetch result is not written back to the cache; only
/// the update engine mutates it.
async fn resolve_price(state: &AppState, symbol: &str) -> Result<f64, ApiError> {
    if let Some(snapshot) = state.cache.get(symbol) {
        return Ok(snapshot.price);
    }
    state
        .pipeline
        .fetch_quote(symbol)
        .await
        .and_then(|sourced| sourced.quote.price)
        .ok_or_else(|| ApiError::SymbolNotFound(symbol.to_string()))
}

// ============================================================================
// Health Check
// ============================================================================

/// Health check endpoint.
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============================================================================
// Statistics
// ============================================================================

/// Get cache and hub statistics.
pub async fn get_stats(State(state): State<Arc<AppState>>) -> Json<StatsResponse> {
    Json(StatsResponse {
        cache: state.cache.stats(),
        hub: state.hub.stats(),
        timestamp: Utc::now(),
    })
}

// ============================================================================
// Quotes
// ============================================================================

/// List all cached snapshots.
pub async fn list_quotes(State(state): State<Arc<AppState>>) -> Json<QuotesResponse> {
    let quotes = state.cache.all_snapshots();
    Json(QuotesResponse {
        count: quotes.len(),
        quotes,
    })
}

/// Get the cached snapshot for a symbol.
pub async fn get_quote(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
) -> Result<Json<PriceSnapshot>, ApiError> {
    let symbol = canonical_symbol(&symbol)?;
    state
        .cache
        .get(&symbol)
        .map(Json)
        .ok_or(ApiError::SymbolNotFound(symbol))
}

/// Trigger a fetch-and-update cycle for a symbol.
///
/// Runs the same path as a scheduled refresh, simulation fallback included,
/// and returns the resulting snapshot.
pub async fn refresh_quote(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
) -> Result<Json<PriceSnapshot>, ApiError> {
    let symbol = canonical_symbol(&symbol)?;
    state
        .engine
        .refresh_symbol(&symbol, true)
        .await
        .map(Json)
        .ok_or(ApiError::SymbolNotFound(symbol))
}

// ============================================================================
// Price History
// ============================================================================

/// Get recent persisted history rows for a symbol, newest first.
pub async fn get_quote_history(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let symbol = canonical_symbol(&symbol)?;
    let Some(store) = &state.store else {
        return Err(ApiError::ServiceUnavailable(
            "price history requires a configured database".to_string(),
        ));
    };

    let limit = query.limit.unwrap_or(50).clamp(1, 500);
    let rows = store
        .recent_history(&symbol, limit)
        .await
        .map_err(|e| ApiError::Database(e.to_string()))?;

    Ok(Json(HistoryResponse {
        count: rows.len(),
        symbol,
        rows,
    }))
}

// ============================================================================
// Indicators
// ============================================================================

/// Get the latest RSI reading for a symbol.
pub async fn get_rsi(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
) -> Result<Json<RsiReading>, ApiError> {
    let symbol = canonical_symbol(&symbol)?;
    if !state.indicators.has_rsi_sources() {
        return Err(ApiError::ServiceUnavailable(
            "no RSI-capable provider configured".to_string(),
        ));
    }

    state
        .indicators
        .rsi(&symbol)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("no RSI data for {}", symbol)))
}

/// Get support/resistance levels and the nearest level on each side.
pub async fn get_support_resistance(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
    Query(query): Query<SupportResistanceQuery>,
) -> Result<Json<SupportResistance>, ApiError> {
    let symbol = canonical_symbol(&symbol)?;
    if let Some(price) = query.price
        && !(price.is_finite() && price > 0.0)
    {
        return Err(ApiError::InvalidRequest(
            "price must be a positive number".to_string(),
        ));
    }
    if !state.indicators.has_levels_source() {
        return Err(ApiError::ServiceUnavailable(
            "no support/resistance provider configured".to_string(),
        ));
    }

    let price = match query.price {
        Some(price) => price,
        None => resolve_price(&state, &symbol).await?,
    };

    state
        .indicators
        .support_resistance(&symbol, price)
        .await
        .map_err(|e| ApiError::ServiceUnavailable(e.to_string()))?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("no support/resistance levels for {}", symbol)))
}

// ============================================================================
// Market Movers
// ============================================================================

/// Get the US-listed gainers and losers boards.
pub async fn get_market_movers(
    State(state): State<Arc<AppState>>,
) -> Result<Json<MoversReport>, ApiError> {
    if !state.indicators.has_movers_source() {
        return Err(ApiError::ServiceUnavailable(
            "no market movers provider configured".to_string(),
        ));
    }

    let report = state
        .indicators
        .market_movers()
        .await
        .map_err(|e| ApiError::ServiceUnavailable(e.to_string()))?;
    Ok(Json(report))
}

/// Get the losers-breaking-support screen.
pub async fn get_support_breaks(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SupportBreaksResponse>, ApiError> {
    if !state.indicators.has_support_break_sources() {
        return Err(ApiError::ServiceUnavailable(
            "support-break screening requires movers and levels providers".to_string(),
        ));
    }

    let breaks = state
        .indicators
        .support_breaks()
        .await
        .map_err(|e| ApiError::ServiceUnavailable(e.to_string()))?;
    Ok(Json(SupportBreaksResponse {
        count: breaks.len(),
        breaks,
    }))
}
