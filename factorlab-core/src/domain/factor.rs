//! Per-ticker factor values.

use serde::{Deserialize, Serialize};

/// Computed attributes for one ticker that survived data-availability checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorRow {
    pub symbol: String,
    pub momentum: f64,
    pub volatility: Option<f64>,
    pub fcf_yield: Option<f64>,
    pub roe: Option<f64>,
    pub rev_growth: Option<f64>,
    pub eps_growth: Option<f64>,
}

impl FactorRow {
    /// A row carrying only momentum; every other factor is absent.
    pub fn with_momentum(symbol: impl Into<String>, momentum: f64) -> Self {
        Self {
            symbol: symbol.into(),
            momentum,
            volatility: None,
            fcf_yield: None,
            roe: None,
            rev_growth: None,
            eps_growth: None,
        }
    }

    pub fn value(&self, factor: Factor) -> Option<f64> {
        match factor {
            Factor::Roe => self.roe,
            Factor::FcfYield => self.fcf_yield,
            Factor::RevGrowth => self.rev_growth,
            Factor::EpsGrowth => self.eps_growth,
            Factor::Momentum => Some(self.momentum),
            Factor::Volatility => self.volatility,
        }
    }
}

/// Named factor column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Factor {
    Roe,
    FcfYield,
    RevGrowth,
    EpsGrowth,
    Momentum,
    Volatility,
}

impl Factor {
    /// Column header used in tables and CSV exports.
    pub fn column_name(self) -> &'static str {
        match self {
            Factor::Roe => "ROE",
            Factor::FcfYield => "FCF_Yield",
            Factor::RevGrowth => "Rev_Growth",
            Factor::EpsGrowth => "EPS_Growth",
            Factor::Momentum => "Momentum",
            Factor::Volatility => "Volatility",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_reads_matching_field() {
        let mut row = FactorRow::with_momentum("AAPL", 0.25);
        row.roe = Some(0.3);
        assert_eq!(row.value(Factor::Momentum), Some(0.25));
        assert_eq!(row.value(Factor::Roe), Some(0.3));
        assert_eq!(row.value(Factor::EpsGrowth), None);
    }
}
