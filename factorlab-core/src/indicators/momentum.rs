//! Momentum — trailing total return.
//!
//! momentum[t] = x[t] / x[t-period] - 1
//! Lookback: period.

use super::Indicator;

#[derive(Debug, Clone)]
pub struct Momentum {
    period: usize,
    name: String,
}

impl Momentum {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "Momentum period must be >= 1");
        Self {
            period,
            name: format!("momentum_{period}"),
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

impl Indicator for Momentum {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, values: &[f64]) -> Vec<f64> {
        let n = values.len();
        let mut result = vec![f64::NAN; n];

        for i in self.period..n {
            let base = values[i - self.period];
            let curr = values[i];
            if base.is_finite() && curr.is_finite() && base != 0.0 {
                result[i] = curr / base - 1.0;
            }
        }

        result
    }

    fn latest(&self, values: &[f64]) -> f64 {
        let n = values.len();
        if n <= self.period {
            return f64::NAN;
        }
        let base = values[n - 1 - self.period];
        let curr = values[n - 1];
        if base.is_finite() && curr.is_finite() && base != 0.0 {
            curr / base - 1.0
        } else {
            f64::NAN
        }
    }
}
