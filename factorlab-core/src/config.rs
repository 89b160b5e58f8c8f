//! Strategy configuration — immutable, TOML-loadable, validated after parse.
//!
//! Every field has a default, so an empty `[strategy]` table yields the
//! standard 15-name blended ranking over the default universe.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

use crate::data::Universe;
use crate::domain::Factor;

/// Tolerance on the weight sum.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("invalid TOML: {0}")]
    Parse(String),

    #[error("factor weights must sum to 1.0, got {sum}")]
    WeightsSum { sum: f64 },

    #[error("weight for {factor} must be a finite non-negative number, got {value}")]
    InvalidWeight { factor: &'static str, value: f64 },

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("{field} out of range: {reason}")]
    OutOfRange { field: &'static str, reason: String },

    #[error("universe is empty")]
    EmptyUniverse,

    #[error("unknown scoring variant '{0}' (expected blended or pure_momentum)")]
    UnknownVariant(String),
}

/// Which scoring strategy ranks the universe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringVariant {
    /// Quality + growth + momentum percentile blend.
    #[default]
    Blended,
    /// Momentum divided by volatility.
    PureMomentum,
}

impl ScoringVariant {
    /// Factor columns reported for this variant, after `Ticker` and `Score`.
    pub fn factor_columns(&self) -> &'static [Factor] {
        match self {
            ScoringVariant::Blended => &[
                Factor::Momentum,
                Factor::Roe,
                Factor::FcfYield,
                Factor::RevGrowth,
                Factor::EpsGrowth,
            ],
            ScoringVariant::PureMomentum => &[Factor::Momentum, Factor::Volatility],
        }
    }

    /// Whether the variant consumes fundamental records.
    pub fn needs_fundamentals(&self) -> bool {
        matches!(self, ScoringVariant::Blended)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScoringVariant::Blended => "blended",
            ScoringVariant::PureMomentum => "pure_momentum",
        }
    }
}

impl fmt::Display for ScoringVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScoringVariant {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "blended" => Ok(ScoringVariant::Blended),
            "pure_momentum" | "momentum" => Ok(ScoringVariant::PureMomentum),
            other => Err(ConfigError::UnknownVariant(other.to_string())),
        }
    }
}

/// Blended-score factor weights.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FactorWeights {
    pub roe: f64,
    pub fcf_yield: f64,
    pub rev_growth: f64,
    pub eps_growth: f64,
    pub momentum: f64,
}

impl Default for FactorWeights {
    fn default() -> Self {
        Self {
            roe: 0.20,
            fcf_yield: 0.20,
            rev_growth: 0.10,
            eps_growth: 0.10,
            momentum: 0.40,
        }
    }
}

impl FactorWeights {
    /// `(factor, weight)` pairs in a fixed order.
    pub fn components(&self) -> [(Factor, f64); 5] {
        [
            (Factor::Roe, self.roe),
            (Factor::FcfYield, self.fcf_yield),
            (Factor::RevGrowth, self.rev_growth),
            (Factor::EpsGrowth, self.eps_growth),
            (Factor::Momentum, self.momentum),
        ]
    }

    pub fn sum(&self) -> f64 {
        self.components().iter().map(|(_, w)| w).sum()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (factor, value) in self.components() {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidWeight {
                    factor: factor.column_name(),
                    value,
                });
            }
        }
        let sum = self.sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ConfigError::WeightsSum { sum });
        }
        Ok(())
    }
}

/// Qualitative filter thresholds. Comparisons are strict (`>`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityThresholds {
    pub min_roe: f64,
    pub min_fcf_yield: f64,
    pub min_momentum: f64,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            min_roe: 0.10,
            min_fcf_yield: 0.0,
            min_momentum: 0.0,
        }
    }
}

/// Complete strategy configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    pub universe: Vec<String>,
    pub n_stocks: usize,
    /// Momentum lookback in trading days.
    pub momentum_lookback: usize,
    /// Volatility window in daily returns.
    pub volatility_lookback: usize,
    /// Weekly EMA span of the regime gate.
    pub ema_span: usize,
    /// Minimum weekly observations of the benchmark.
    pub min_weeks: usize,
    pub variant: ScoringVariant,
    pub weights: FactorWeights,
    pub thresholds: QualityThresholds,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            universe: Universe::default_us().all_tickers(),
            n_stocks: 15,
            momentum_lookback: 126,
            volatility_lookback: 63,
            ema_span: 200,
            min_weeks: 210,
            variant: ScoringVariant::Blended,
            weights: FactorWeights::default(),
            thresholds: QualityThresholds::default(),
        }
    }
}

impl StrategyConfig {
    /// Parse a `StrategyConfig` from a TOML table and validate it.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
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
        if self.universe.is_empty() {
            return Err(ConfigError::EmptyUniverse);
        }
        if self.universe.iter().any(|s| s.trim().is_empty()) {
            return Err(ConfigError::OutOfRange {
                field: "universe",
                reason: "ticker symbols must be non-empty".into(),
            });
        }
        for (field, value) in [
            ("n_stocks", self.n_stocks),
            ("momentum_lookback", self.momentum_lookback),
            ("ema_span", self.ema_span),
        ] {
            if value == 0 {
                return Err(ConfigError::Zero { field });
            }
        }
        if self.volatility_lookback < 2 {
            return Err(ConfigError::OutOfRange {
                field: "volatility_lookback",
                reason: format!("needs at least 2 returns, got {}", self.volatility_lookback),
            });
        }
        for (field, value) in [
            ("thresholds.min_roe", self.thresholds.min_roe),
            ("thresholds.min_fcf_yield", self.thresholds.min_fcf_yield),
            ("thresholds.min_momentum", self.thresholds.min_momentum),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::OutOfRange {
                    field,
                    reason: format!("must be finite, got {value}"),
                });
            }
        }
        self.weights.validate()
    }

    /// BLAKE3 hex digest of the canonical JSON form.
    ///
    /// Identical configurations always hash identically; any parameter change
    /// changes the digest.
    pub fn fingerprint(&self) -> String {
        let json = serde_json::to_vec(self).unwrap_or_default();
        blake3::hash(&json).to_hex().to_string()
    }

    pub fn with_variant(mut self, variant: ScoringVariant) -> Self {
        self.variant = variant;
        self
    }

    pub fn with_n_stocks(mut self, n_stocks: usize) -> Self {
        self.n_stocks = n_stocks;
        self
    }

    pub fn with_universe<I, S>(mut self, tickers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.universe = tickers.into_iter().map(Into::into).collect();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_standard_ranking() {
        let c = StrategyConfig::default();
        assert_eq!(c.n_stocks, 15);
        assert_eq!(c.momentum_lookback, 126);
        assert_eq!(c.ema_span, 200);
        assert_eq!(c.min_weeks, 210);
        assert_eq!(c.universe.len(), 72);
        assert_eq!(c.variant, ScoringVariant::Blended);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn empty_toml_yields_defaults() {
        assert_eq!(StrategyConfig::from_toml("").unwrap(), StrategyConfig::default());
    }

    #[test]
    fn partial_toml_overrides_fields() {
        let c = StrategyConfig::from_toml(
            r#"
            variant = "pure_momentum"
            n_stocks = 5
            universe = ["AAPL", "MSFT"]

            [thresholds]
            min_roe = 0.15
            "#,
        )
        .unwrap();
        assert_eq!(c.variant, ScoringVariant::PureMomentum);
        assert_eq!(c.n_stocks, 5);
        assert_eq!(c.universe, vec!["AAPL", "MSFT"]);
        assert_eq!(c.thresholds.min_roe, 0.15);
        assert_eq!(c.thresholds.min_momentum, 0.0);
        assert_eq!(c.weights, FactorWeights::default());
    }

    #[test]
    fn weights_must_sum_to_one() {
        let err = StrategyConfig::from_toml("[weights]\nmomentum = 0.5\n").unwrap_err();
        assert!(matches!(err, ConfigError::WeightsSum { .. }));
    }

    #[test]
    fn negative_weight_rejected() {
        let mut c = StrategyConfig::default();
        c.weights.roe = -0.2;
        c.weights.momentum = 0.8;
        assert!(matches!(
            c.validate(),
            Err(ConfigError::InvalidWeight { factor: "ROE", .. })
        ));
    }

    #[test]
    fn zero_parameters_rejected() {
        let c = StrategyConfig::default().with_n_stocks(0);
        assert_eq!(c.validate(), Err(ConfigError::Zero { field: "n_stocks" }));

        let mut c = StrategyConfig::default();
        c.volatility_lookback = 1;
        assert!(matches!(c.validate(), Err(ConfigError::OutOfRange { .. })));
    }

    #[test]
    fn empty_universe_rejected() {
        let c = StrategyConfig::default().with_universe(Vec::<String>::new());
        assert_eq!(c.validate(), Err(ConfigError::EmptyUniverse));
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        assert!(matches!(
            StrategyConfig::from_toml("n_stocks = \"many\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn fingerprint_deterministic_and_sensitive() {
        let a = StrategyConfig::default();
        let b = StrategyConfig::default();
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);

        let c = StrategyConfig::default().with_n_stocks(10);
        assert_ne!(a.fingerprint(), c.fingerprint());
    }

    #[test]
    fn variant_parsing() {
        assert_eq!("blended".parse::<ScoringVariant>().unwrap(), ScoringVariant::Blended);
        assert_eq!(
            "pure-momentum".parse::<ScoringVariant>().unwrap(),
            ScoringVariant::PureMomentum
        );
        assert!("value".parse::<ScoringVariant>().is_err());
        assert_eq!(ScoringVariant::PureMomentum.to_string(), "pure_momentum");
    }

    #[test]
    fn factor_columns_per_variant() {
        assert_eq!(ScoringVariant::Blended.factor_columns().len(), 5);
        assert_eq!(
            ScoringVariant::PureMomentum.factor_columns(),
            &[Factor::Momentum, Factor::Volatility]
        );
    }
}
