//! Unit tests for types module.

use super::*;

// ============================================================================
// QuoteSource Tests
// ============================================================================

#[test]
fn test_quote_source_display() {
    assert_eq!(format!("{}", QuoteSource::External), "EXTERNAL");
    assert_eq!(format!("{}", QuoteSource::Simulation), "SIMULATION");
}

#[test]
fn test_quote_source_serialization() {
    assert_eq!(
        serde_json::to_string(&QuoteSource::External).unwrap(),
        "\"EXTERNAL\""
    );
    assert_eq!(
        serde_json::to_string(&QuoteSource::Simulation).unwrap(),
        "\"SIMULATION\""
    );
}

#[test]
fn test_quote_source_deserialization() {
    let external: QuoteSource = serde_json::from_str("\"EXTERNAL\"").unwrap();
    let simulation: QuoteSource = serde_json::from_str("\"SIMULATION\"").unwrap();

    assert_eq!(external, QuoteSource::External);
    assert_eq!(simulation, QuoteSource::Simulation);
}

// ============================================================================
// RsiSignal Tests
// ============================================================================

#[test]
fn test_rsi_signal_display() {
    assert_eq!(format!("{}", RsiSignal::Oversold), "oversold");
    assert_eq!(format!("{}", RsiSignal::Neutral), "neutral");
    assert_eq!(format!("{}", RsiSignal::Overbought), "overbought");
}

#[test]
fn test_rsi_signal_deserialization() {
    let oversold: RsiSignal = serde_json::from_str("\"oversold\"").unwrap();
    let overbought: RsiSignal = serde_json::from_str("\"overbought\"").unwrap();

    assert_eq!(oversold, RsiSignal::Oversold);
    assert_eq!(overbought, RsiSignal::Overbought);
}

// ============================================================================
// HealthResponse Tests
// ============================================================================

#[test]
fn test_health_response_deserialization() {
    let json = r#"{"status":"healthy","service":"marketfeed-backend","version":"0.1.0"}"#;
    let response: HealthResponse = serde_json::from_str(json).unwrap();

    assert_eq!(response.status, "healthy");
    assert_eq!(response.service, "marketfeed-backend");
    assert_eq!(response.version, "0.1.0");
}

// ============================================================================
// PriceSnapshot Tests
// ============================================================================

#[test]
fn test_price_snapshot_deserializes_camel_case_wire_format() {
    let json = r#"{
        "symbol": "AAPL",
        "price": 150.25,
        "change": 1.5,
        "changePercent": 1.01,
        "volume": 1000000,
        "bid": 150.2,
        "ask": 150.3,
        "bidSize": 100,
        "askSize": 200,
        "high": 151.0,
        "low": 149.0,
        "open": 149.5,
        "previousClose": 148.75,
        "source": "EXTERNAL",
        "provider": "finnhub",
        "timestamp": "2026-03-01T14:30:00Z"
    }"#;

    let snapshot: PriceSnapshot = serde_json::from_str(json).unwrap();
    assert_eq!(snapshot.symbol, "AAPL");
    assert_eq!(snapshot.change_percent, 1.01);
    assert_eq!(snapshot.previous_close, 148.75);
    assert_eq!(snapshot.source, QuoteSource::External);
    assert_eq!(snapshot.provider.as_deref(), Some("finnhub"));
}

#[test]
fn test_price_snapshot_serializes_camel_case() {
    let snapshot = PriceSnapshot {
        symbol: "MSFT".to_string(),
        price: 300.0,
        change: -2.0,
        change_percent: -0.66,
        volume: 0,
        bid: None,
        ask: None,
        bid_size: None,
        ask_size: None,
        high: 302.0,
        low: 298.0,
        open: 301.0,
        previous_close: 302.0,
        source: QuoteSource::Simulation,
        provider: None,
        timestamp: "2026-03-01T14:30:00Z".to_string(),
    };

    let json = serde_json::to_string(&snapshot).unwrap();
    assert!(json.contains("\"changePercent\":-0.66"));
    assert!(json.contains("\"previousClose\":302.0"));
    assert!(json.contains("\"source\":\"SIMULATION\""));
}

#[test]
fn test_quotes_response_deserialization() {
    let json = r#"{"quotes":[],"count":0}"#;
    let response: QuotesResponse = serde_json::from_str(json).unwrap();

    assert!(response.quotes.is_empty());
    assert_eq!(response.count, 0);
}

// ============================================================================
// History Tests
// ============================================================================

#[test]
fn test_history_response_deserialization() {
    let json = r#"{
        "symbol": "AAPL",
        "rows": [{
            "id": "7c9e6679-7425-40de-944b-e07fc1f90ae7",
            "symbol": "AAPL",
            "price": 150.25,
            "volume": 1000,
            "source": "EXTERNAL",
            "provider": "finnhub",
            "quoteTime": null,
            "recordedAt": "2026-03-01T14:30:00Z"
        }],
        "count": 1
    }"#;

    let response: HistoryResponse = serde_json::from_str(json).unwrap();
    assert_eq!(response.symbol, "AAPL");
    assert_eq!(response.count, 1);
    assert_eq!(response.rows[0].price, 150.25);
    assert!(response.rows[0].quote_time.is_none());
}

// ============================================================================
// Stats Tests
// ============================================================================

#[test]
fn test_stats_response_deserialization() {
    let json = r#"{
        "cache": {"size": 2, "subscriptionCount": 1, "symbols": ["AAPL", "MSFT"]},
        "hub": {"clients": 3, "rooms": 1, "memberships": 3},
        "timestamp": "2026-03-01T14:30:00Z"
    }"#;

    let response: StatsResponse = serde_json::from_str(json).unwrap();
    assert_eq!(response.cache.size, 2);
    assert_eq!(response.cache.subscription_count, 1);
    assert_eq!(response.hub.clients, 3);
    assert_eq!(response.hub.memberships, 3);
}

// ============================================================================
// Indicator Tests
// ============================================================================

#[test]
fn test_rsi_reading_deserialization() {
    let json = r#"{"symbol":"AAPL","period":14,"value":28.4,"signal":"oversold","source":"finnhub"}"#;
    let reading: RsiReading = serde_json::from_str(json).unwrap();

    assert_eq!(reading.symbol, "AAPL");
    assert_eq!(reading.period, 14);
    assert_eq!(reading.signal, RsiSignal::Oversold);
}

#[test]
fn test_support_resistance_deserialization() {
    let json = r#"{
        "symbol": "AAPL",
        "price": 150.0,
        "support": {"level": 148.0, "distancePct": 1.33},
        "resistance": null,
        "levels": [142.0, 148.0]
    }"#;

    let sr: SupportResistance = serde_json::from_str(json).unwrap();
    assert_eq!(sr.price, 150.0);
    assert_eq!(
        sr.support,
        Some(LevelInfo {
            level: 148.0,
            distance_pct: 1.33
        })
    );
    assert!(sr.resistance.is_none());
    assert_eq!(sr.levels, vec![142.0, 148.0]);
}

// ============================================================================
// Market Mover Tests
// ============================================================================

#[test]
fn test_movers_report_deserialization() {
    let json = r#"{
        "gainers": [{"symbol":"NVDA","name":"NVIDIA Corp","price":900.0,"change":45.0,"changePercent":5.26}],
        "losers": []
    }"#;

    let report: MoversReport = serde_json::from_str(json).unwrap();
    assert_eq!(report.gainers.len(), 1);
    assert_eq!(report.gainers[0].symbol, "NVDA");
    assert!(report.losers.is_empty());
}

#[test]
fn test_support_breaks_response_deserialization() {
    let json = r#"{
        "breaks": [{
            "symbol": "XYZ",
            "name": "XYZ Corp",
            "price": 9.8,
            "changePercent": -6.2,
            "supportLevel": 10.0,
            "distancePct": -2.0
        }],
        "count": 1
    }"#;

    let response: SupportBreaksResponse = serde_json::from_str(json).unwrap();
    assert_eq!(response.count, 1);
    assert_eq!(response.breaks[0].support_level, 10.0);
    assert!(response.breaks[0].distance_pct < 0.0);
}
