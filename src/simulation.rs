//! Simulated quote generation for symbols no provider can price.
//!
//! The simulator is stateless: each call derives the next price from the
//! previous cached one (or seeds a fresh price when there is none), so the
//! engine stays the only owner of per-symbol state.

use rand::Rng;

use crate::config::SimulationConfig;
use crate::providers::ProviderQuote;

/// Lowest price the walk is allowed to reach.
const MIN_PRICE: f64 = 0.01;

/// Bounded random-walk price generator.
#[derive(Debug, Clone)]
pub struct PriceSimulator {
    config: SimulationConfig,
}

impl PriceSimulator {
    /// Creates a simulator with the given tuning.
    #[must_use]
    pub fn new(config: SimulationConfig) -> Self {
        Self { config }
    }

    /// Whether simulated quotes may be produced at all.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Produces the next simulated quote.
    ///
    /// With a positive previous price the new price moves by a random
    /// percentage within the configured step bound and never drops below
    /// one cent. Without one, a fresh price is seeded inside the configured
    /// range. The previous close is always filled so the merge step can
    /// compute a change.
    pub fn step(&self, previous: Option<f64>) -> ProviderQuote {
        let mut rng = rand::rng();

        match previous.filter(|p| *p > 0.0) {
            Some(prev) => {
                let step_pct =
                    rng.random_range(-self.config.max_step_pct..=self.config.max_step_pct);
                let price = (prev * (1.0 + step_pct / 100.0)).max(MIN_PRICE);
                ProviderQuote {
                    price: Some(price),
                    previous_close: Some(prev),
                    ..Default::default()
                }
            }
            None => {
                let price = rng.random_range(self.config.seed_min..=self.config.seed_max);
                ProviderQuote {
                    price: Some(price),
                    previous_close: Some(price),
                    ..Default::default()
                }
            }
        }
    }
}
