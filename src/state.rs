//! Application state management.

use crate::bootstrap::SymbolBootstrapper;
use crate::cache::PriceCache;
use crate::classify::SymbolClassifier;
use crate::config::Config;
use crate::db::SymbolStore;
use crate::engine::{PriceUpdate, UpdateEngine};
use crate::hub::BroadcastHub;
use crate::indicators::IndicatorsEngine;
use crate::pipeline::FetchPipeline;
use crate::providers::{self, FinnhubProvider, FmpProvider, ProviderError};
use crate::simulation::PriceSimulator;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<Config>,
    /// Latest-snapshot cache.
    pub cache: Arc<PriceCache>,
    /// WebSocket fan-out hub.
    pub hub: Arc<BroadcastHub<PriceUpdate>>,
    /// Ordered provider pipeline.
    pub pipeline: Arc<FetchPipeline>,
    /// Fetch-and-update orchestrator.
    pub engine: Arc<UpdateEngine>,
    /// Technical indicators composition.
    pub indicators: Arc<IndicatorsEngine>,
    /// Persistence mirror; absent in cache-only mode.
    pub store: Option<Arc<dyn SymbolStore>>,
}

impl AppState {
    /// Builds the full component graph from configuration.
    ///
    /// With no store the service runs cache-only: bootstrap, classification
    /// and the persistence mirror are all skipped. With no usable provider
    /// the pipeline is empty and the simulator (if enabled) carries the feed.
    ///
    /// # Errors
    /// Returns error if a provider HTTP client cannot be constructed.
    pub fn from_config(
        config: Config,
        store: Option<Arc<dyn SymbolStore>>,
    ) -> Result<Self, ProviderError> {
        let cache = Arc::new(PriceCache::new());
        let hub = Arc::new(BroadcastHub::new());

        let adapters = providers::build_providers(&config.providers)?;
        let pipeline = Arc::new(FetchPipeline::new(adapters));
        info!(
            providers = ?pipeline.provider_names(),
            simulation = config.simulation.enabled,
            "quote pipeline ready"
        );

        let simulator = PriceSimulator::new(config.simulation.clone());

        let bootstrap = match &store {
            Some(store) => {
                let classifier = if config.classification.enabled {
                    Some(Arc::new(SymbolClassifier::new(
                        providers::build_providers(&config.providers)?,
                        Arc::clone(store),
                        &config.classification,
                    )))
                } else {
                    None
                };
                Some(Arc::new(SymbolBootstrapper::new(
                    Arc::clone(store),
                    Arc::clone(&pipeline),
                    classifier,
                )))
            }
            None => None,
        };

        let engine = Arc::new(UpdateEngine::new(
            config.refresh.clone(),
            Arc::clone(&cache),
            Arc::clone(&hub),
            Arc::clone(&pipeline),
            simulator,
            bootstrap,
            store.clone(),
        ));

        let indicators = Arc::new(build_indicators(&config)?);

        Ok(Self {
            config: Arc::new(config),
            cache,
            hub,
            pipeline,
            engine,
            indicators,
            store,
        })
    }
}

/// Assembles the indicators engine from whatever providers are usable. Each
/// capability degrades independently when its provider is not configured.
fn build_indicators(config: &Config) -> Result<IndicatorsEngine, ProviderError> {
    let timeout = Duration::from_secs(config.providers.request_timeout_secs);
    let rsi_sources =
        providers::build_rsi_sources(&config.providers, &config.indicators.rsi_order)?;

    let finnhub = if config.providers.finnhub.is_usable() {
        Some(Arc::new(FinnhubProvider::new(
            &config.providers.finnhub.api_key,
            timeout,
        )?))
    } else {
        None
    };
    let fmp = if config.providers.fmp.is_usable() {
        Some(Arc::new(FmpProvider::new(
            &config.providers.fmp.api_key,
            timeout,
        )?))
    } else {
        None
    };

    Ok(IndicatorsEngine::new(
        rsi_sources,
        finnhub,
        fmp,
        config.indicators.clone(),
    ))
}
