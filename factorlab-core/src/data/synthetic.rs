//! Deterministic synthetic provider for demos and tests.
//!
//! Prices are a random walk on weekdays, seeded from BLAKE3 of the symbol and
//! generated from a fixed anchor date, so the same symbol always yields the
//! same closes on the same dates regardless of the requested window. These
//! series are clearly fake; the provider reports its name as `synthetic`.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::provider::{DataError, FetchWindow, UniverseDataProvider};
use crate::domain::{FundamentalRecord, PricePoint, PriceSeries};

#[derive(Debug, Clone)]
pub struct SyntheticProvider {
    anchor: NaiveDate,
    daily_drift: f64,
    daily_range: f64,
}

impl Default for SyntheticProvider {
    fn default() -> Self {
        Self {
            anchor: NaiveDate::from_ymd_opt(2000, 1, 3).unwrap_or_default(),
            daily_drift: 0.0004,
            daily_range: 0.02,
        }
    }
}

impl SyntheticProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mean daily return added to every step.
    pub fn with_trend(mut self, daily_drift: f64) -> Self {
        self.daily_drift = daily_drift;
        self
    }

    fn rng(tag: &str, symbol: &str) -> StdRng {
        let seed = blake3::hash(format!("{tag}:{symbol}").as_bytes());
        StdRng::from_seed(*seed.as_bytes())
    }

    fn generate(&self, symbol: &str, window: FetchWindow) -> Vec<PricePoint> {
        let mut rng = Self::rng("prices", symbol);
        let start = self.anchor.min(window.start);
        let mut price = 100.0_f64;
        let mut current = start;
        let mut points = Vec::new();

        while current <= window.end {
            if !matches!(current.weekday(), Weekday::Sat | Weekday::Sun) {
                let step: f64 = rng.gen_range(-self.daily_range..self.daily_range);
                price *= 1.0 + self.daily_drift + step;
                if current >= window.start {
                    points.push(PricePoint::new(current, price));
                }
            }
            current += Duration::days(1);
        }
        points
    }
}

impl UniverseDataProvider for SyntheticProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn fetch_series(&self, symbol: &str, window: FetchWindow) -> Result<PriceSeries, DataError> {
        Ok(PriceSeries::new(symbol, self.generate(symbol, window))?)
    }

    fn fetch_fundamentals(&self, symbol: &str) -> Result<FundamentalRecord, DataError> {
        let mut rng = Self::rng("fundamentals", symbol);
        Ok(FundamentalRecord {
            return_on_equity: Some(rng.gen_range(-0.05..0.45)),
            free_cashflow: Some(rng.gen_range(-2.0e9..3.0e10)),
            market_cap: Some(rng.gen_range(2.0e10..1.5e12)),
            revenue_growth: Some(rng.gen_range(-0.10..0.35)),
            earnings_growth: Some(rng.gen_range(-0.20..0.50)),
        })
    }
}
