//! Series indicators used by the regime filter and the factor pipeline.
//!
//! Time-series indicators implement `Indicator`: a numeric series in, a series
//! of the same length out, NaN where the value is not yet defined.
//! The cross-sectional percentile rank lives in `rank`.

pub mod ema;
pub mod momentum;
pub mod rank;
pub mod volatility;

pub use ema::Ema;
pub use momentum::Momentum;
pub use rank::percentile_rank;
pub use volatility::RollingVolatility;

/// Trait for time-series indicators.
///
/// # Look-ahead guard
/// No output value at index t may depend on input values after t.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "ema_200", "momentum_126").
    fn name(&self) -> &str;

    /// Number of leading observations needed before output is defined.
    fn lookback(&self) -> usize;

    /// Compute the indicator over the whole series.
    ///
    /// Returns a `Vec<f64>` of the same length as `values`.
    fn compute(&self, values: &[f64]) -> Vec<f64>;

    /// Value at the most recent observation (NaN if undefined).
    fn latest(&self, values: &[f64]) -> f64 {
        self.compute(values).last().copied().unwrap_or(f64::NAN)
    }
}

/// Most recent finite value in a series.
pub fn last_valid(values: &[f64]) -> Option<f64> {
    values.iter().rev().copied().find(|v| v.is_finite())
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
