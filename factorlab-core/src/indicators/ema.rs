//! Exponential Moving Average (EMA).
//!
//! Recursive: EMA[t] = alpha * x[t] + (1 - alpha) * EMA[t-1], alpha = 2 / (span + 1)
//! Seed: EMA equals the first non-missing observation.
//! Missing observations do not update the recursion; the previous EMA carries through.
//! Lookback: 0.

use super::Indicator;

#[derive(Debug, Clone)]
pub struct Ema {
    span: usize,
    name: String,
}

impl Ema {
    pub fn new(span: usize) -> Self {
        assert!(span >= 1, "EMA span must be >= 1");
        Self {
            span,
            name: format!("ema_{span}"),
        }
    }

    pub fn span(&self) -> usize {
        self.span
    }

    pub fn alpha(&self) -> f64 {
        2.0 / (self.span as f64 + 1.0)
    }
}

impl Indicator for Ema {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        0
    }

    fn compute(&self, values: &[f64]) -> Vec<f64> {
        let alpha = self.alpha();
        let mut result = Vec::with_capacity(values.len());
        let mut prev: Option<f64> = None;

        for &x in values {
            let next = match (prev, x.is_finite()) {
                (None, false) => None,
                (None, true) => Some(x),
                (Some(p), false) => Some(p),
                (Some(p), true) => Some(alpha * x + (1.0 - alpha) * p),
            };
            result.push(next.unwrap_or(f64::NAN));
            prev = next;
        }

        result
    }
}
