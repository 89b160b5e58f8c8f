//! Blended quality/growth/momentum score.
//!
//! Filter: ROE > min_roe, FCF yield > min_fcf_yield, momentum > min_momentum,
//! with revenue and earnings growth both present. Score: weighted sum of the
//! cross-sectional percentile ranks of each factor over the surviving rows.

use crate::config::{FactorWeights, QualityThresholds, ScoringVariant, StrategyConfig};
use crate::domain::{FactorRow, FundamentalRecord, PriceSeries};
use crate::error::FactorError;
use crate::indicators::percentile_rank;

use super::{momentum_factor, ScoringStrategy};

#[derive(Debug, Clone)]
pub struct BlendedStrategy {
    momentum_lookback: usize,
    weights: FactorWeights,
    thresholds: QualityThresholds,
}

impl BlendedStrategy {
    pub fn new(
        momentum_lookback: usize,
        weights: FactorWeights,
        thresholds: QualityThresholds,
    ) -> Self {
        Self {
            momentum_lookback,
            weights,
            thresholds,
        }
    }

    pub fn from_config(config: &StrategyConfig) -> Self {
        Self::new(config.momentum_lookback, config.weights, config.thresholds)
    }
}

fn above(value: Option<f64>, threshold: f64) -> bool {
    value.is_some_and(|v| v > threshold)
}

impl ScoringStrategy for BlendedStrategy {
    fn variant(&self) -> ScoringVariant {
        ScoringVariant::Blended
    }

    fn factors(
        &self,
        series: &PriceSeries,
        fundamentals: Option<&FundamentalRecord>,
    ) -> Result<FactorRow, FactorError> {
        let symbol = series.symbol();
        let momentum = momentum_factor(series, self.momentum_lookback)?;
        let record =
            fundamentals.ok_or_else(|| FactorError::missing(symbol, "no fundamental record"))?;

        Ok(FactorRow {
            symbol: symbol.to_string(),
            momentum,
            volatility: None,
            fcf_yield: record.fcf_yield(),
            roe: record.roe(),
            rev_growth: record.revenue_growth(),
            eps_growth: record.earnings_growth(),
        })
    }

    fn passes(&self, row: &FactorRow) -> bool {
        above(row.roe, self.thresholds.min_roe)
            && above(row.fcf_yield, self.thresholds.min_fcf_yield)
            && row.momentum > self.thresholds.min_momentum
            && row.rev_growth.is_some()
            && row.eps_growth.is_some()
    }

    fn scores(&self, rows: &[FactorRow]) -> Vec<Result<f64, FactorError>> {
        let mut totals = vec![0.0; rows.len()];

        for (factor, weight) in self.weights.components() {
            let values: Vec<f64> = rows
                .iter()
                .map(|r| r.value(factor).unwrap_or(f64::NAN))
                .collect();
            for (total, pct) in totals.iter_mut().zip(percentile_rank(&values)) {
                *total += weight * pct;
            }
        }

        rows.iter()
            .zip(totals)
            .map(|(row, score)| {
                if score.is_finite() {
                    Ok(score)
                } else {
                    Err(FactorError::missing(&row.symbol, "factor missing at scoring"))
                }
            })
            .collect()
    }
}
