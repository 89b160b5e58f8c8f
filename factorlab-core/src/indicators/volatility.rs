//! Rolling volatility of daily simple returns.
//!
//! r[t] = x[t] / x[t-1] - 1
//! vol[t] = sample standard deviation (n - 1) of r[t-window+1 ..= t]
//! Lookback: window (window returns need window + 1 prices).

use super::Indicator;

#[derive(Debug, Clone)]
pub struct RollingVolatility {
    window: usize,
    name: String,
}

impl RollingVolatility {
    pub fn new(window: usize) -> Self {
        assert!(window >= 2, "volatility window must be >= 2");
        Self {
            window,
            name: format!("volatility_{window}"),
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    fn std_of_window(&self, values: &[f64], end: usize) -> f64 {
        let start = end + 1 - self.window;
        let mut returns = Vec::with_capacity(self.window);
        for i in start..=end {
            let prev = values[i - 1];
            let curr = values[i];
            if !prev.is_finite() || !curr.is_finite() || prev == 0.0 {
                return f64::NAN;
            }
            returns.push(curr / prev - 1.0);
        }
        sample_std(&returns)
    }
}

impl Indicator for RollingVolatility {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.window
    }

    fn compute(&self, values: &[f64]) -> Vec<f64> {
        let n = values.len();
        let mut result = vec![f64::NAN; n];
        for (end, slot) in result.iter_mut().enumerate().skip(self.window) {
            *slot = self.std_of_window(values, end);
        }
        result
    }

    fn latest(&self, values: &[f64]) -> f64 {
        let n = values.len();
        if n <= self.window {
            return f64::NAN;
        }
        self.std_of_window(values, n - 1)
    }
}

/// Sample standard deviation with Bessel's correction.
fn sample_std(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return f64::NAN;
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    var.sqrt()
}
