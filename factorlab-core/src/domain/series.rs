//! PriceSeries — ordered daily adjusted closes for one ticker.

use chrono::{Datelike, NaiveDate, Weekday};
use thiserror::Error;

/// One (date, adjusted close) observation. A NaN close marks a missing value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

impl PricePoint {
    pub fn new(date: NaiveDate, close: f64) -> Self {
        Self { date, close }
    }

    /// True when the close is NaN or infinite.
    pub fn is_missing(&self) -> bool {
        !self.close.is_finite()
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SeriesError {
    #[error("dates must be strictly increasing in '{symbol}': {prev} followed by {next}")]
    NonIncreasingDates {
        symbol: String,
        prev: NaiveDate,
        next: NaiveDate,
    },
}

/// Daily adjusted-close history for a single ticker.
///
/// # Invariant
/// Dates are strictly increasing. Gaps between dates are allowed.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    symbol: String,
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Build a series, rejecting out-of-order or duplicate dates.
    pub fn new(symbol: impl Into<String>, points: Vec<PricePoint>) -> Result<Self, SeriesError> {
        let symbol = symbol.into();
        for pair in points.windows(2) {
            if pair[1].date <= pair[0].date {
                return Err(SeriesError::NonIncreasingDates {
                    symbol,
                    prev: pair[0].date,
                    next: pair[1].date,
                });
            }
        }
        Ok(Self { symbol, points })
    }

    /// Build a series from closes laid out on consecutive weekdays starting at `start`.
    pub fn from_closes(symbol: impl Into<String>, start: NaiveDate, closes: &[f64]) -> Self {
        let points = weekdays_from(start, closes.len())
            .into_iter()
            .zip(closes)
            .map(|(date, &close)| PricePoint { date, close })
            .collect();
        Self {
            symbol: symbol.into(),
            points,
        }
    }

    /// An empty series for `symbol`.
    pub fn empty(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            points: Vec::new(),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&PricePoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&PricePoint> {
        self.points.last()
    }

    /// Close values in date order (NaN where missing).
    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }

    /// True when any close is missing.
    pub fn has_missing(&self) -> bool {
        self.points.iter().any(PricePoint::is_missing)
    }

    /// Copy of the series with missing closes removed.
    pub fn dropna(&self) -> Self {
        Self {
            symbol: self.symbol.clone(),
            points: self
                .points
                .iter()
                .filter(|p| !p.is_missing())
                .copied()
                .collect(),
        }
    }

    /// Copy of the series restricted to `start..=end`.
    pub fn between(&self, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            symbol: self.symbol.clone(),
            points: self
                .points
                .iter()
                .filter(|p| p.date >= start && p.date <= end)
                .copied()
                .collect(),
        }
    }
}

/// `n` consecutive weekdays (Mon–Fri) starting at `start`, or at the next weekday
/// if `start` falls on a weekend.
pub fn weekdays_from(start: NaiveDate, n: usize) -> Vec<NaiveDate> {
    let mut dates = Vec::with_capacity(n);
    let mut current = start;
    while dates.len() < n {
        if !matches!(current.weekday(), Weekday::Sat | Weekday::Sun) {
            dates.push(current);
        }
        current += chrono::Duration::days(1);
    }
    dates
}
