//! Market regime gate — weekly benchmark close versus its weekly EMA.
//!
//! Risk-on when the latest weekly close is at or above the latest EMA value.
//! A risk-off decision means zero exposure: callers must not fetch or score
//! the universe.

pub mod weekly;

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::domain::PriceSeries;
use crate::error::FactorError;
use crate::indicators::{last_valid, Ema, Indicator};

pub use weekly::{resample_weekly, week_ending_friday, WeeklyClose};

/// Default EMA span in weeks.
pub const DEFAULT_EMA_SPAN: usize = 200;

/// Default minimum number of weekly observations.
pub const DEFAULT_MIN_WEEKS: usize = 210;

/// Binary market regime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Regime {
    RiskOn,
    RiskOff,
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Regime::RiskOn => f.write_str("RISK ON"),
            Regime::RiskOff => f.write_str("RISK OFF"),
        }
    }
}

/// Outcome of the regime gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeDecision {
    /// Week of the most recent weekly close.
    pub week_ending: NaiveDate,
    /// Most recent non-missing weekly close.
    pub last_value: f64,
    /// Most recent non-missing EMA value.
    pub last_ema: f64,
    pub is_risk_on: bool,
}

impl RegimeDecision {
    /// Decision from a close/EMA pair. Equality counts as risk-on.
    pub fn from_levels(week_ending: NaiveDate, last_value: f64, last_ema: f64) -> Self {
        Self {
            week_ending,
            last_value,
            last_ema,
            is_risk_on: last_value >= last_ema,
        }
    }

    pub fn regime(&self) -> Regime {
        if self.is_risk_on {
            Regime::RiskOn
        } else {
            Regime::RiskOff
        }
    }
}

/// Trend filter over a benchmark's weekly closes.
#[derive(Debug, Clone)]
pub struct MarketRegimeFilter {
    min_weeks: usize,
    ema: Ema,
}

impl MarketRegimeFilter {
    pub fn new(min_weeks: usize, ema_span: usize) -> Self {
        Self {
            min_weeks,
            ema: Ema::new(ema_span),
        }
    }

    pub fn default_params() -> Self {
        Self::new(DEFAULT_MIN_WEEKS, DEFAULT_EMA_SPAN)
    }

    pub fn min_weeks(&self) -> usize {
        self.min_weeks
    }

    pub fn ema_span(&self) -> usize {
        self.ema.span()
    }

    /// Evaluate the regime from daily benchmark closes.
    ///
    /// Fails with `InsufficientHistory` when the weekly series is shorter than
    /// `min_weeks`, and with `MissingData` when no weekly close or EMA value is
    /// available.
    pub fn evaluate(&self, benchmark_daily: &PriceSeries) -> Result<RegimeDecision, FactorError> {
        let symbol = benchmark_daily.symbol();
        let weekly = resample_weekly(benchmark_daily);

        if weekly.len() < self.min_weeks {
            return Err(FactorError::InsufficientHistory {
                symbol: symbol.to_string(),
                required: self.min_weeks,
                available: weekly.len(),
            });
        }

        let closes: Vec<f64> = weekly
            .iter()
            .map(|w| w.close.unwrap_or(f64::NAN))
            .collect();
        let trend = self.ema.compute(&closes);

        let last_week = weekly
            .iter()
            .rev()
            .find(|w| w.close.is_some())
            .ok_or_else(|| FactorError::missing(symbol, "no weekly closes"))?;
        let last_value = last_week
            .close
            .ok_or_else(|| FactorError::missing(symbol, "no weekly closes"))?;
        let last_ema = last_valid(&trend)
            .ok_or_else(|| FactorError::missing(symbol, "no EMA values"))?;

        debug!(
            symbol,
            weeks = weekly.len(),
            span = self.ema.span(),
            "weekly benchmark resampled"
        );

        let decision = RegimeDecision::from_levels(last_week.week_ending, last_value, last_ema);
        info!(
            symbol,
            last_value,
            last_ema,
            regime = %decision.regime(),
            "market regime evaluated"
        );
        Ok(decision)
    }
}

/// Evaluate the regime gate with explicit parameters.
pub fn evaluate(
    benchmark_daily: &PriceSeries,
    min_weeks: usize,
    ema_span: usize,
) -> Result<RegimeDecision, FactorError> {
    MarketRegimeFilter::new(min_weeks, ema_span).evaluate(benchmark_daily)
}
