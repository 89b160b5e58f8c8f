//! Run configuration: strategy parameters plus data-source settings.
//!
//! Loaded from a single TOML file with `[strategy]` and `[data]` tables.
//! Every key is optional; omitted keys take their defaults. The parsed
//! configuration is validated before use and never mutated afterwards.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use factorlab_core::data::BreakerPolicy;
use factorlab_core::{ConfigError, StrategyConfig};

/// Complete configuration for one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub strategy: StrategyConfig,
    pub data: DataConfig,
}

/// Where benchmark and universe data come from, and how much of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Reference index for the regime gate.
    pub benchmark: String,
    /// Years of daily benchmark history to request.
    pub benchmark_years: u32,
    /// Years of daily universe history to request.
    pub price_years: u32,
    /// Memo cache lifetime for provider requests.
    pub cache_ttl_secs: u64,
    /// Consecutive failed live requests before the provider is paused.
    pub breaker_failures: u32,
    pub breaker_cooldown_secs: u64,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            benchmark: "SPY".into(),
            benchmark_years: 10,
            price_years: 2,
            cache_ttl_secs: 600,
            breaker_failures: 3,
            breaker_cooldown_secs: 30 * 60,
        }
    }
}

impl DataConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn breaker_policy(&self) -> BreakerPolicy {
        BreakerPolicy {
            max_failures: self.breaker_failures,
            cooldown: Duration::from_secs(self.breaker_cooldown_secs),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.benchmark.trim().is_empty() {
            return Err(ConfigError::OutOfRange {
                field: "data.benchmark",
                reason: "benchmark symbol must be non-empty".into(),
            });
        }
        if self.benchmark_years == 0 {
            return Err(ConfigError::Zero {
                field: "data.benchmark_years",
            });
        }
        if self.price_years == 0 {
            return Err(ConfigError::Zero {
                field: "data.price_years",
            });
        }
        if self.breaker_failures == 0 {
            return Err(ConfigError::Zero {
                field: "data.breaker_failures",
            });
        }
        Ok(())
    }
}

impl RunConfig {
    /// Parse and validate a run configuration from TOML.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: RunConfig =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.strategy.validate()?;
        self.data.validate()
    }

    /// Fingerprint of everything that can change the ranking.
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.strategy.fingerprint().as_bytes());
        hasher.update(self.data.benchmark.as_bytes());
        hasher.update(&self.data.benchmark_years.to_le_bytes());
        hasher.update(&self.data.price_years.to_le_bytes());
        hasher.finalize().to_hex().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use factorlab_core::ScoringVariant;

    #[test]
    fn empty_file_gives_defaults() {
        let config = RunConfig::from_toml("").unwrap();
        assert_eq!(config, RunConfig::default());
        assert_eq!(config.data.benchmark, "SPY");
        assert_eq!(config.strategy.n_stocks, 15);
        assert_eq!(config.data.cache_ttl(), Duration::from_secs(600));
        assert_eq!(config.data.breaker_policy(), BreakerPolicy::default());
    }

    #[test]
    fn full_file_parses() {
        let toml = r#"
[strategy]
variant = "pure_momentum"
n_stocks = 10
momentum_lookback = 100
universe = ["AAPL", "MSFT"]

[strategy.weights]
roe = 0.25
fcf_yield = 0.25
rev_growth = 0.1
eps_growth = 0.1
momentum = 0.3

[strategy.thresholds]
min_roe = 0.15

[data]
benchmark = "QQQ"
benchmark_years = 8
cache_ttl_secs = 60
"#;
        let config = RunConfig::from_toml(toml).unwrap();
        assert_eq!(config.strategy.variant, ScoringVariant::PureMomentum);
        assert_eq!(config.strategy.n_stocks, 10);
        assert_eq!(config.strategy.universe, vec!["AAPL", "MSFT"]);
        assert_eq!(config.strategy.thresholds.min_roe, 0.15);
        assert_eq!(config.strategy.volatility_lookback, 63);
        assert_eq!(config.data.benchmark, "QQQ");
        assert_eq!(config.data.benchmark_years, 8);
        assert_eq!(config.data.price_years, 2);
        assert_eq!(config.data.cache_ttl_secs, 60);
    }

    #[test]
    fn strategy_errors_surface() {
        let toml = "[strategy.weights]\nroe = 0.9\n";
        assert!(matches!(
            RunConfig::from_toml(toml),
            Err(ConfigError::WeightsSum { .. })
        ));
    }

    #[test]
    fn zero_price_years_rejected() {
        let toml = "[data]\nprice_years = 0\n";
        assert_eq!(
            RunConfig::from_toml(toml),
            Err(ConfigError::Zero {
                field: "data.price_years"
            })
        );
    }

    #[test]
    fn breaker_settings_parse_and_validate() {
        let toml = "[data]\nbreaker_failures = 5\nbreaker_cooldown_secs = 90\n";
        let config = RunConfig::from_toml(toml).unwrap();
        let policy = config.data.breaker_policy();
        assert_eq!(policy.max_failures, 5);
        assert_eq!(policy.cooldown, Duration::from_secs(90));

        assert_eq!(
            RunConfig::from_toml("[data]\nbreaker_failures = 0\n"),
            Err(ConfigError::Zero {
                field: "data.breaker_failures"
            })
        );
    }

    #[test]
    fn blank_benchmark_rejected() {
        let toml = "[data]\nbenchmark = \" \"\n";
        assert!(matches!(
            RunConfig::from_toml(toml),
            Err(ConfigError::OutOfRange { .. })
        ));
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        assert!(matches!(
            RunConfig::from_toml("[strategy\n"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn fingerprint_ignores_cache_ttl_but_not_benchmark() {
        let base = RunConfig::default();
        let mut ttl = base.clone();
        ttl.data.cache_ttl_secs = 5;
        let mut bench = base.clone();
        bench.data.benchmark = "QQQ".into();
        assert_eq!(base.fingerprint(), ttl.fingerprint());
        assert_ne!(base.fingerprint(), bench.fingerprint());
    }
}
