//! Configuration module for loading and parsing TOML configuration files.
//!
//! Secrets (provider API keys, database URL) can be injected through
//! environment variables on top of the file contents. A provider without an
//! API key is treated as disabled; with no enabled providers the engine runs
//! in simulation-only mode (if enabled) or serves an empty cache.

use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Provider names accepted in ordering lists.
pub const KNOWN_PROVIDERS: [&str; 4] = ["finnhub", "twelvedata", "alphavantage", "fmp"];

/// Configuration error types.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse TOML configuration.
    #[error("failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    /// Invalid configuration value.
    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Quote provider configuration.
    #[serde(default)]
    pub providers: ProvidersConfig,
    /// Price simulation configuration.
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Symbol classification configuration.
    #[serde(default)]
    pub classification: ClassificationConfig,
    /// Refresh scheduler configuration.
    #[serde(default)]
    pub refresh: RefreshConfig,
    /// Technical indicators configuration.
    #[serde(default)]
    pub indicators: IndicatorsConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port number to listen on.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Database configuration. An empty URL runs the engine cache-only: the
/// persistence mirror, bootstrap rows, and classification are all skipped.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL. Overridden by `DATABASE_URL`.
    #[serde(default)]
    pub url: String,
}

/// Credentials and enablement for one provider.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    /// Whether the adapter may be used at all.
    pub enabled: bool,
    /// API key; an empty key disables the adapter regardless of `enabled`.
    #[serde(default)]
    pub api_key: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: String::new(),
        }
    }
}

impl ProviderConfig {
    /// True when the adapter is enabled and has credentials.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        self.enabled && !self.api_key.is_empty()
    }
}

/// Quote provider configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ProvidersConfig {
    /// Adapter tried first by the fetch pipeline.
    pub primary: String,
    /// Adapters tried after the primary, in order.
    pub fallback_order: Vec<String>,
    /// Timeout applied to every adapter HTTP request, in seconds.
    pub request_timeout_secs: u64,
    /// Finnhub credentials. Key override: `FINNHUB_API_KEY`.
    #[serde(default)]
    pub finnhub: ProviderConfig,
    /// Twelve Data credentials. Key override: `TWELVEDATA_API_KEY`.
    #[serde(default)]
    pub twelvedata: ProviderConfig,
    /// Alpha Vantage credentials. Key override: `ALPHAVANTAGE_API_KEY`.
    #[serde(default)]
    pub alphavantage: ProviderConfig,
    /// Financial Modeling Prep credentials. Key override: `FMP_API_KEY`.
    #[serde(default)]
    pub fmp: ProviderConfig,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            primary: "finnhub".to_string(),
            fallback_order: vec![
                "twelvedata".to_string(),
                "fmp".to_string(),
                "alphavantage".to_string(),
            ],
            request_timeout_secs: 10,
            finnhub: ProviderConfig::default(),
            twelvedata: ProviderConfig::default(),
            alphavantage: ProviderConfig::default(),
            fmp: ProviderConfig::default(),
        }
    }
}

impl ProvidersConfig {
    /// Full pipeline ordering: primary first, then the fallback order with
    /// the primary de-duplicated.
    #[must_use]
    pub fn pipeline_order(&self) -> Vec<String> {
        let mut order = vec![self.primary.clone()];
        for name in &self.fallback_order {
            if *name != self.primary {
                order.push(name.clone());
            }
        }
        order
    }

    /// Looks up one provider's credentials by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ProviderConfig> {
        match name {
            "finnhub" => Some(&self.finnhub),
            "twelvedata" => Some(&self.twelvedata),
            "alphavantage" => Some(&self.alphavantage),
            "fmp" => Some(&self.fmp),
            _ => None,
        }
    }
}

/// Price simulation configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SimulationConfig {
    /// Whether the random-walk fallback is enabled.
    pub enabled: bool,
    /// Maximum single-step move as a percentage of the last price.
    pub max_step_pct: f64,
    /// Lower bound for the seed price of a never-seen symbol.
    pub seed_min: f64,
    /// Upper bound for the seed price of a never-seen symbol.
    pub seed_max: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_step_pct: 0.5,
            seed_min: 20.0,
            seed_max: 500.0,
        }
    }
}

/// Symbol classification configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ClassificationConfig {
    /// Whether profile-based classification runs after bootstrap.
    pub enabled: bool,
    /// How long a fetched company profile stays cached, in hours.
    pub profile_cache_hours: u64,
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            profile_cache_hours: 6,
        }
    }
}

/// Refresh scheduler configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshConfig {
    /// Interval between refresh sweeps over subscribed symbols, in seconds.
    pub interval_secs: u64,
    /// Interval between cache maintenance inspections, in seconds.
    pub maintenance_interval_secs: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_secs: 15,
            maintenance_interval_secs: 3600,
        }
    }
}

/// Technical indicators configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct IndicatorsConfig {
    /// RSI providers in preference order.
    pub rsi_order: Vec<String>,
    /// RSI look-back period.
    pub rsi_period: u32,
    /// How close to a support level (percent of price) counts as testing it.
    pub sr_tolerance_pct: f64,
    /// Minimum percentage drop for a loser to be analyzed for support breaks.
    pub movers_min_drop_pct: f64,
}

impl Default for IndicatorsConfig {
    fn default() -> Self {
        Self {
            rsi_order: vec!["twelvedata".to_string(), "alphavantage".to_string()],
            rsi_period: 14,
            sr_tolerance_pct: 2.0,
            movers_min_drop_pct: 3.0,
        }
    }
}

impl Config {
    /// Loads configuration from a TOML file.
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file.
    ///
    /// # Errors
    /// Returns error if file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads the file named by `MARKETFEED_CONFIG` (default `config.toml`),
    /// falling back to defaults when the file does not exist, then applies
    /// environment overrides.
    ///
    /// # Errors
    /// Returns error if an existing file cannot be read or parsed.
    pub fn load_or_default() -> Result<Self, ConfigError> {
        let path =
            std::env::var("MARKETFEED_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
        let mut config = if Path::new(&path).exists() {
            Self::load(&path)?
        } else {
            Self::default()
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Arguments
    /// * `content` - TOML content as string.
    ///
    /// # Errors
    /// Returns error if content cannot be parsed.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Overlays secrets from the environment onto the file contents.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("DATABASE_URL") {
            self.database.url = url;
        }
        if let Ok(key) = std::env::var("FINNHUB_API_KEY") {
            self.providers.finnhub.api_key = key;
        }
        if let Ok(key) = std::env::var("TWELVEDATA_API_KEY") {
            self.providers.twelvedata.api_key = key;
        }
        if let Ok(key) = std::env::var("ALPHAVANTAGE_API_KEY") {
            self.providers.alphavantage.api_key = key;
        }
        if let Ok(key) = std::env::var("FMP_API_KEY") {
            self.providers.fmp.api_key = key;
        }
    }

    /// Validates the configuration values.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.providers.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "providers.request_timeout_secs must be positive".to_string(),
            ));
        }
        if !KNOWN_PROVIDERS.contains(&self.providers.primary.as_str()) {
            return Err(ConfigError::InvalidValue(format!(
                "unknown primary provider: {}",
                self.providers.primary
            )));
        }
        for name in &self.providers.fallback_order {
            if !KNOWN_PROVIDERS.contains(&name.as_str()) {
                return Err(ConfigError::InvalidValue(format!(
                    "unknown fallback provider: {}",
                    name
                )));
            }
        }
        for name in &self.indicators.rsi_order {
            if !KNOWN_PROVIDERS.contains(&name.as_str()) {
                return Err(ConfigError::InvalidValue(format!(
                    "unknown rsi provider: {}",
                    name
                )));
            }
        }

        if self.simulation.max_step_pct <= 0.0 || self.simulation.max_step_pct > 20.0 {
            return Err(ConfigError::InvalidValue(
                "simulation.max_step_pct must be between 0 and 20".to_string(),
            ));
        }
        if self.simulation.seed_min <= 0.0 || self.simulation.seed_max <= self.simulation.seed_min {
            return Err(ConfigError::InvalidValue(
                "simulation seed range must satisfy 0 < seed_min < seed_max".to_string(),
            ));
        }

        if self.classification.profile_cache_hours == 0 {
            return Err(ConfigError::InvalidValue(
                "classification.profile_cache_hours must be positive".to_string(),
            ));
        }

        if self.refresh.interval_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "refresh.interval_secs must be positive".to_string(),
            ));
        }
        if self.refresh.maintenance_interval_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "refresh.maintenance_interval_secs must be positive".to_string(),
            ));
        }

        if self.indicators.rsi_period < 2 {
            return Err(ConfigError::InvalidValue(
                "indicators.rsi_period must be at least 2".to_string(),
            ));
        }
        if self.indicators.sr_tolerance_pct < 0.0 {
            return Err(ConfigError::InvalidValue(
                "indicators.sr_tolerance_pct cannot be negative".to_string(),
            ));
        }
        if self.indicators.movers_min_drop_pct < 0.0 {
            return Err(ConfigError::InvalidValue(
                "indicators.movers_min_drop_pct cannot be negative".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[server]
host = "127.0.0.1"
port = 3000

[database]
url = "postgres://localhost/marketfeed"

[providers]
primary = "twelvedata"
fallback_order = ["finnhub", "fmp"]
request_timeout_secs = 5

[providers.finnhub]
enabled = true
api_key = "fh-key"

[providers.twelvedata]
enabled = true
api_key = "td-key"

[simulation]
enabled = false
max_step_pct = 1.0
seed_min = 10.0
seed_max = 200.0

[classification]
enabled = true
profile_cache_hours = 12

[refresh]
interval_secs = 5
maintenance_interval_secs = 1800

[indicators]
rsi_order = ["alphavantage", "twelvedata"]
rsi_period = 21
sr_tolerance_pct = 1.5
movers_min_drop_pct = 5.0
"#;

        let config = Config::parse(toml_content).expect("should parse");
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.database.url, "postgres://localhost/marketfeed");
        assert_eq!(config.providers.primary, "twelvedata");
        assert_eq!(config.providers.request_timeout_secs, 5);
        assert!(config.providers.finnhub.is_usable());
        assert!(!config.providers.fmp.is_usable());
        assert!(!config.simulation.enabled);
        assert_eq!(config.classification.profile_cache_hours, 12);
        assert_eq!(config.refresh.interval_secs, 5);
        assert_eq!(config.indicators.rsi_period, 21);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = Config::parse("[server]\nhost = \"10.0.0.1\"\nport = 9000\n")
            .expect("should parse");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.providers.primary, "finnhub");
        assert_eq!(config.refresh.interval_secs, 15);
        assert!(config.simulation.enabled);
        assert!(config.database.url.is_empty());
    }

    #[test]
    fn test_pipeline_order_deduplicates_primary() {
        let providers = ProvidersConfig {
            primary: "twelvedata".to_string(),
            fallback_order: vec![
                "twelvedata".to_string(),
                "finnhub".to_string(),
                "fmp".to_string(),
            ],
            ..Default::default()
        };
        assert_eq!(
            providers.pipeline_order(),
            vec!["twelvedata", "finnhub", "fmp"]
        );
    }

    #[test]
    fn test_validation_unknown_provider() {
        let result = Config::parse("[providers]\nprimary = \"bloomberg\"\nfallback_order = []\nrequest_timeout_secs = 10\n");
        assert!(matches!(result, Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn test_validation_zero_interval() {
        let result = Config::parse("[refresh]\ninterval_secs = 0\nmaintenance_interval_secs = 3600\n");
        assert!(matches!(result, Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn test_validation_inverted_seed_range() {
        let result = Config::parse(
            "[simulation]\nenabled = true\nmax_step_pct = 0.5\nseed_min = 100.0\nseed_max = 50.0\n",
        );
        assert!(matches!(result, Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn test_provider_without_key_is_unusable() {
        let provider = ProviderConfig {
            enabled: true,
            api_key: String::new(),
        };
        assert!(!provider.is_usable());

        let disabled = ProviderConfig {
            enabled: false,
            api_key: "key".to_string(),
        };
        assert!(!disabled.is_usable());
    }
}
