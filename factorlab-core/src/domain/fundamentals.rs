//! Per-ticker fundamental snapshot.

use serde::{Deserialize, Serialize};

/// Fundamental metrics for one ticker as reported by the data source.
///
/// Every field is optional: providers routinely omit metrics. Non-finite values
/// are treated as absent by the accessors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FundamentalRecord {
    pub return_on_equity: Option<f64>,
    pub free_cashflow: Option<f64>,
    pub market_cap: Option<f64>,
    pub revenue_growth: Option<f64>,
    pub earnings_growth: Option<f64>,
}

impl FundamentalRecord {
    pub fn roe(&self) -> Option<f64> {
        finite(self.return_on_equity)
    }

    pub fn revenue_growth(&self) -> Option<f64> {
        finite(self.revenue_growth)
    }

    pub fn earnings_growth(&self) -> Option<f64> {
        finite(self.earnings_growth)
    }

    /// Free cash flow divided by market cap.
    ///
    /// `None` when either input is absent or market cap is zero.
    pub fn fcf_yield(&self) -> Option<f64> {
        let fcf = finite(self.free_cashflow)?;
        let cap = finite(self.market_cap)?;
        if cap == 0.0 {
            return None;
        }
        Some(fcf / cap)
    }
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}
