//! Technical indicators served over REST: RSI, support/resistance levels,
//! market movers and the losers-breaking-support screen.
//!
//! Each indicator composes one or two concrete providers: RSI falls back
//! across the configured source order, levels come from the Finnhub scanner
//! and mover boards from FMP. Missing providers degrade the surface (the
//! handlers answer 503), never the feed.

pub mod levels;
pub mod movers;
pub mod rsi;

use std::sync::Arc;

use tracing::debug;

use crate::config::IndicatorsConfig;
use crate::models::round2;
use crate::providers::{FinnhubProvider, FmpProvider, ProviderError, RsiSource};

pub use levels::{LevelInfo, SupportResistance};
pub use movers::{MoversReport, SupportBreak};
pub use rsi::{RsiReading, RsiSignal, classify_rsi};

/// Indicator composition over the configured providers.
pub struct IndicatorsEngine {
    rsi_sources: Vec<Arc<dyn RsiSource>>,
    finnhub: Option<Arc<FinnhubProvider>>,
    fmp: Option<Arc<FmpProvider>>,
    config: IndicatorsConfig,
}

impl IndicatorsEngine {
    /// Creates the engine from whatever sources configuration yielded.
    #[must_use]
    pub fn new(
        rsi_sources: Vec<Arc<dyn RsiSource>>,
        finnhub: Option<Arc<FinnhubProvider>>,
        fmp: Option<Arc<FmpProvider>>,
        config: IndicatorsConfig,
    ) -> Self {
        Self {
            rsi_sources,
            finnhub,
            fmp,
            config,
        }
    }

    /// Whether any RSI source is configured.
    #[must_use]
    pub fn has_rsi_sources(&self) -> bool {
        !self.rsi_sources.is_empty()
    }

    /// Whether the level scanner is configured.
    #[must_use]
    pub fn has_levels_source(&self) -> bool {
        self.finnhub.is_some()
    }

    /// Whether the mover boards are configured.
    #[must_use]
    pub fn has_movers_source(&self) -> bool {
        self.fmp.is_some()
    }

    /// Whether the support-break screen has both of its sources.
    #[must_use]
    pub fn has_support_break_sources(&self) -> bool {
        self.fmp.is_some() && self.finnhub.is_some()
    }

    /// Latest daily RSI for `symbol`, classified. `None` when every source
    /// is exhausted.
    pub async fn rsi(&self, symbol: &str) -> Option<RsiReading> {
        let period = self.config.rsi_period;
        let (raw, source) = rsi::fetch_ordered(&self.rsi_sources, symbol, period).await?;
        let value = round2(raw);
        Some(RsiReading {
            symbol: symbol.to_string(),
            period,
            value,
            signal: classify_rsi(value),
            source: source.to_string(),
        })
    }

    /// Support/resistance view around `price`. `Ok(None)` when the scanner
    /// is unconfigured or knows no levels for the symbol.
    pub async fn support_resistance(
        &self,
        symbol: &str,
        price: f64,
    ) -> Result<Option<SupportResistance>, ProviderError> {
        let Some(finnhub) = &self.finnhub else {
            return Ok(None);
        };
        match finnhub.fetch_support_resistance(symbol).await? {
            Some(scan) => Ok(Some(levels::partition_levels(symbol, price, scan))),
            None => Ok(None),
        }
    }

    /// Gainer and loser boards filtered to US-listed common stock.
    pub async fn market_movers(&self) -> Result<MoversReport, ProviderError> {
        let Some(fmp) = &self.fmp else {
            return Ok(MoversReport {
                gainers: Vec::new(),
                losers: Vec::new(),
            });
        };
        let gainers = movers::filter_us(fmp.fetch_gainers().await?);
        let losers = movers::filter_us(fmp.fetch_losers().await?);
        Ok(MoversReport { gainers, losers })
    }

    /// Losers beyond the configured drop threshold that are testing or have
    /// fallen through a known support level. Per-symbol scan failures are
    /// skipped so one bad symbol never empties the report.
    pub async fn support_breaks(&self) -> Result<Vec<SupportBreak>, ProviderError> {
        let (Some(fmp), Some(finnhub)) = (&self.fmp, &self.finnhub) else {
            return Ok(Vec::new());
        };

        let losers = movers::filter_us(fmp.fetch_losers().await?);
        let mut breaks = Vec::new();
        for loser in losers {
            if loser.change_percent > -self.config.movers_min_drop_pct {
                continue;
            }
            match finnhub.fetch_support_resistance(&loser.symbol).await {
                Ok(Some(scan)) => {
                    if let Some(level) =
                        movers::breaking_support(loser.price, &scan, self.config.sr_tolerance_pct)
                    {
                        breaks.push(movers::support_break(&loser, level));
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    debug!(symbol = %loser.symbol, error = %e, "support scan failed");
                }
            }
        }
        Ok(breaks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct FixedRsi(f64);

    #[async_trait]
    impl RsiSource for FixedRsi {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn fetch_rsi(
            &self,
            _symbol: &str,
            _period: u32,
        ) -> Result<Option<f64>, ProviderError> {
            Ok(Some(self.0))
        }
    }

    fn engine_with_rsi(value: f64) -> IndicatorsEngine {
        IndicatorsEngine::new(
            vec![Arc::new(FixedRsi(value))],
            None,
            None,
            IndicatorsConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_rsi_reading_is_rounded_and_classified() {
        let reading = engine_with_rsi(28.4567).rsi("AAPL").await.expect("reading");
        assert_eq!(reading.value, 28.46);
        assert_eq!(reading.signal, RsiSignal::Oversold);
        assert_eq!(reading.period, 14);
        assert_eq!(reading.source, "fixed");
    }

    #[tokio::test]
    async fn test_rsi_without_sources_is_none() {
        let engine = IndicatorsEngine::new(vec![], None, None, IndicatorsConfig::default());
        assert!(!engine.has_rsi_sources());
        assert!(engine.rsi("AAPL").await.is_none());
    }

    #[tokio::test]
    async fn test_unconfigured_surfaces_degrade_to_empty() {
        let engine = IndicatorsEngine::new(vec![], None, None, IndicatorsConfig::default());
        assert!(!engine.has_levels_source());
        assert!(!engine.has_movers_source());
        assert!(!engine.has_support_break_sources());

        assert!(engine
            .support_resistance("AAPL", 100.0)
            .await
            .expect("ok")
            .is_none());
        let report = engine.market_movers().await.expect("ok");
        assert!(report.gainers.is_empty());
        assert!(engine.support_breaks().await.expect("ok").is_empty());
    }
}
