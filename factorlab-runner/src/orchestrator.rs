//! Pipeline orchestration — regime gate, universe fetch, scoring.
//!
//! One synchronous run per call:
//! 1. Fetch the benchmark and evaluate the regime. Failures here abort the run.
//! 2. Risk-off: return the decision with an empty ranking. The universe is
//!    never fetched.
//! 3. Risk-on: fetch universe prices, then fundamentals for the priced
//!    tickers (blended variant only), score, and select.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use factorlab_core::data::{DataError, LookbackPeriod, UniverseDataProvider};
use factorlab_core::domain::{RankedResult, Symbol};
use factorlab_core::{
    ConfigError, Exclusion, FactorError, MarketRegimeFilter, Regime, RegimeDecision,
    ScoringEngine, ScoringVariant,
};

use crate::config::RunConfig;

/// Current schema version for persisted reports.
pub const SCHEMA_VERSION: u32 = 1;

/// Errors that abort a run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("benchmark data unavailable: {0}")]
    Benchmark(#[from] DataError),
    #[error("regime evaluation failed: {0}")]
    Regime(#[from] FactorError),
}

impl RunError {
    /// True when the run stopped at the regime gate, before any universe work.
    pub fn is_regime_failure(&self) -> bool {
        matches!(self, RunError::Benchmark(_) | RunError::Regime(_))
    }

    /// True when the benchmark is too short for the configured EMA.
    pub fn is_insufficient_history(&self) -> bool {
        matches!(
            self,
            RunError::Regime(FactorError::InsufficientHistory { .. })
        )
    }
}

/// Everything a presenter or exporter needs from one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineReport {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    /// Calendar date of the run, not of the data.
    pub as_of: NaiveDate,
    pub variant: ScoringVariant,
    pub benchmark: String,
    pub decision: RegimeDecision,
    pub ranked: RankedResult,
    pub excluded: Vec<Exclusion>,
    #[serde(default)]
    pub filtered: Vec<Symbol>,
    pub universe_size: usize,
    /// Tickers with complete price data; zero when risk-off.
    pub priced_count: usize,
    pub config_fingerprint: String,
    #[serde(default)]
    pub source: String,
    /// Conditions that left the ranking degraded without aborting the run.
    #[serde(default)]
    pub warnings: Vec<String>,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl PipelineReport {
    pub fn regime(&self) -> Regime {
        self.decision.regime()
    }

    /// False when the regime gate closed and nothing was selected.
    pub fn has_exposure(&self) -> bool {
        self.decision.is_risk_on
    }
}

/// A configured run against one data provider.
pub struct Pipeline<'a> {
    config: &'a RunConfig,
    provider: &'a dyn UniverseDataProvider,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a RunConfig, provider: &'a dyn UniverseDataProvider) -> Self {
        Self { config, provider }
    }

    pub fn run(&self, as_of: NaiveDate) -> Result<PipelineReport, RunError> {
        self.config.validate()?;
        let strategy = &self.config.strategy;
        let data = &self.config.data;

        let benchmark_window = LookbackPeriod::Years(data.benchmark_years).window(as_of);
        let benchmark = self
            .provider
            .get_benchmark(&data.benchmark, benchmark_window)?;
        let decision =
            MarketRegimeFilter::new(strategy.min_weeks, strategy.ema_span).evaluate(&benchmark)?;

        let engine = ScoringEngine::from_config(strategy);
        let mut report = PipelineReport {
            schema_version: SCHEMA_VERSION,
            as_of,
            variant: engine.variant(),
            benchmark: data.benchmark.clone(),
            decision,
            ranked: RankedResult::empty(engine.variant()),
            excluded: Vec::new(),
            filtered: Vec::new(),
            universe_size: strategy.universe.len(),
            priced_count: 0,
            config_fingerprint: self.config.fingerprint(),
            source: self.provider.name().to_string(),
            warnings: Vec::new(),
        };

        if !report.decision.is_risk_on {
            info!(
                benchmark = %data.benchmark,
                as_of = %as_of,
                "risk off; universe not fetched"
            );
            return Ok(report);
        }

        let price_window = LookbackPeriod::Years(data.price_years).window(as_of);
        let prices = self.provider.get_prices(&strategy.universe, price_window);
        let fundamentals = if engine.needs_fundamentals() {
            let priced: Vec<Symbol> = prices.keys().cloned().collect();
            self.provider.get_fundamentals(&priced)
        } else {
            BTreeMap::new()
        };

        if engine.needs_fundamentals() && !prices.is_empty() && fundamentals.is_empty() {
            let message = format!(
                "fundamentals unavailable for all {} priced tickers; nothing could be scored",
                prices.len()
            );
            warn!(source = %report.source, "{message}");
            report.warnings.push(message);
        }

        let outcome = engine.score(&prices, &fundamentals);
        report.priced_count = prices.len();
        report.ranked = outcome.ranked;
        report.excluded = outcome.excluded;
        report.filtered = outcome.filtered;

        info!(
            as_of = %as_of,
            source = %report.source,
            universe = report.universe_size,
            priced = report.priced_count,
            selected = report.ranked.len(),
            "pipeline complete"
        );
        Ok(report)
    }
}
