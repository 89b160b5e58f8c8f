//! Risk-adjusted momentum: momentum / volatility.

use crate::config::{ScoringVariant, StrategyConfig};
use crate::domain::{FactorRow, FundamentalRecord, PriceSeries};
use crate::error::FactorError;

use super::{momentum_factor, volatility_factor, ScoringStrategy};

#[derive(Debug, Clone)]
pub struct MomentumStrategy {
    momentum_lookback: usize,
    volatility_lookback: usize,
    min_momentum: f64,
}

impl MomentumStrategy {
    pub fn new(momentum_lookback: usize, volatility_lookback: usize, min_momentum: f64) -> Self {
        Self {
            momentum_lookback,
            volatility_lookback,
            min_momentum,
        }
    }

    pub fn from_config(config: &StrategyConfig) -> Self {
        Self::new(
            config.momentum_lookback,
            config.volatility_lookback,
            config.thresholds.min_momentum,
        )
    }
}

impl ScoringStrategy for MomentumStrategy {
    fn variant(&self) -> ScoringVariant {
        ScoringVariant::PureMomentum
    }

    fn factors(
        &self,
        series: &PriceSeries,
        _fundamentals: Option<&FundamentalRecord>,
    ) -> Result<FactorRow, FactorError> {
        let momentum = momentum_factor(series, self.momentum_lookback)?;
        let volatility = volatility_factor(series, self.volatility_lookback)?;
        let mut row = FactorRow::with_momentum(series.symbol(), momentum);
        row.volatility = volatility;
        Ok(row)
    }

    fn passes(&self, row: &FactorRow) -> bool {
        row.momentum > self.min_momentum
    }

    fn scores(&self, rows: &[FactorRow]) -> Vec<Result<f64, FactorError>> {
        rows.iter()
            .map(|row| {
                let vol = match row.volatility {
                    Some(v) if v.is_finite() && v != 0.0 => v,
                    Some(v) => {
                        return Err(FactorError::undefined(
                            &row.symbol,
                            format!("volatility is {v}"),
                        ))
                    }
                    None => {
                        return Err(FactorError::undefined(&row.symbol, "volatility unavailable"))
                    }
                };
                let score = row.momentum / vol;
                if score.is_finite() {
                    Ok(score)
                } else {
                    Err(FactorError::undefined(&row.symbol, "non-finite momentum/volatility"))
                }
            })
            .collect()
    }
}
