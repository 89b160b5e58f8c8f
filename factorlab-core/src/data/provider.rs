//! Universe data provider trait and structured error types.
//!
//! The `UniverseDataProvider` trait abstracts over data sources (Yahoo Finance,
//! an offline snapshot, synthetic data) so the pipeline can swap implementations
//! and tests can inject fixed maps. Implementations supply the per-ticker
//! fetches; the collecting operations are provided on top of them.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use super::align::complete_columns;
use crate::domain::{FundamentalRecord, PriceSeries, SeriesError, Symbol};
use crate::error::FactorError;

/// Structured error types for data operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("hard stop: data provider has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,

    #[error("no usable closes for '{symbol}'")]
    EmptySeries { symbol: String },

    #[error("invalid series: {0}")]
    InvalidSeries(#[from] SeriesError),

    #[error("snapshot store error: {0}")]
    Store(String),

    #[error("parquet I/O error: {0}")]
    Parquet(String),

    #[error("no snapshot for symbol '{symbol}' (run `factorlab snapshot` first)")]
    NoSnapshot { symbol: String },

    #[error("data error: {0}")]
    Other(String),
}

/// How far back to fetch, relative to the as-of date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookbackPeriod {
    /// Calendar years before the as-of date.
    Years(u32),
    /// Fixed start date.
    Since(NaiveDate),
}

impl LookbackPeriod {
    /// Resolve to a concrete inclusive date window ending at `as_of`.
    pub fn window(&self, as_of: NaiveDate) -> FetchWindow {
        let start = match *self {
            LookbackPeriod::Years(years) => years_before(as_of, years),
            LookbackPeriod::Since(date) => date.min(as_of),
        };
        FetchWindow { start, end: as_of }
    }
}

/// Same month/day `years` earlier; Feb 29 falls back to Feb 28.
fn years_before(date: NaiveDate, years: u32) -> NaiveDate {
    let year = date.year() - years as i32;
    date.with_year(year)
        .or_else(|| NaiveDate::from_ymd_opt(year, date.month(), 28))
        .unwrap_or(date)
}

/// Inclusive date range of a fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FetchWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl FetchWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

/// Source of daily adjusted closes and fundamentals for a ticker universe.
///
/// Implementations must be `Send + Sync`: fundamentals are fetched in
/// parallel and providers are shared behind references.
pub trait UniverseDataProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Daily adjusted closes for one symbol within `window`.
    fn fetch_series(&self, symbol: &str, window: FetchWindow) -> Result<PriceSeries, DataError>;

    /// Latest fundamental snapshot for one symbol.
    fn fetch_fundamentals(&self, symbol: &str) -> Result<FundamentalRecord, DataError>;

    /// Complete daily closes for every ticker that could be fetched.
    ///
    /// Failed tickers are dropped. The survivors are aligned on the union of
    /// their dates and any ticker with a missing close anywhere on that
    /// timeline is dropped as well.
    fn get_prices(&self, tickers: &[Symbol], window: FetchWindow) -> BTreeMap<Symbol, PriceSeries> {
        let mut fetched = BTreeMap::new();
        for symbol in tickers {
            match self.fetch_series(symbol, window) {
                Ok(series) if !series.is_empty() => {
                    fetched.insert(symbol.clone(), series);
                }
                Ok(_) => debug!(symbol = %symbol, "empty price series dropped"),
                Err(e) => debug!(symbol = %symbol, error = %e, "price fetch failed"),
            }
        }
        let fetched_count = fetched.len();
        let complete = complete_columns(fetched);
        if complete.len() < fetched_count {
            debug!(
                dropped = fetched_count - complete.len(),
                "tickers with incomplete closes dropped"
            );
        }
        complete
    }

    /// Per-ticker fundamental fetch outcomes, in parallel.
    ///
    /// Transport errors become `ProviderFailure`; completion order does not
    /// affect the result.
    fn fetch_fundamentals_each(
        &self,
        tickers: &[Symbol],
    ) -> BTreeMap<Symbol, Result<FundamentalRecord, FactorError>> {
        tickers
            .par_iter()
            .map(|symbol| {
                let result = self.fetch_fundamentals(symbol).map_err(|e| {
                    FactorError::ProviderFailure {
                        symbol: symbol.clone(),
                        reason: e.to_string(),
                    }
                });
                (symbol.clone(), result)
            })
            .collect::<Vec<_>>()
            .into_iter()
            .collect()
    }

    /// Fundamental records for every ticker that could be fetched.
    ///
    /// A ticker whose fetch fails is absent from the map.
    fn get_fundamentals(&self, tickers: &[Symbol]) -> BTreeMap<Symbol, FundamentalRecord> {
        self.fetch_fundamentals_each(tickers)
            .into_iter()
            .filter_map(|(symbol, result)| match result {
                Ok(record) => Some((symbol, record)),
                Err(e) => {
                    warn!(symbol = %symbol, error = %e, "fundamentals fetch failed");
                    None
                }
            })
            .collect()
    }

    /// Daily closes of the benchmark index. Failure is fatal for a run.
    fn get_benchmark(&self, symbol: &str, window: FetchWindow) -> Result<PriceSeries, DataError> {
        let series = self.fetch_series(symbol, window)?;
        if series.points().iter().all(|p| p.is_missing()) {
            return Err(DataError::EmptySeries {
                symbol: symbol.to_string(),
            });
        }
        Ok(series)
    }
}

impl<P: UniverseDataProvider + ?Sized> UniverseDataProvider for Box<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn fetch_series(&self, symbol: &str, window: FetchWindow) -> Result<PriceSeries, DataError> {
        (**self).fetch_series(symbol, window)
    }

    fn fetch_fundamentals(&self, symbol: &str) -> Result<FundamentalRecord, DataError> {
        (**self).fetch_fundamentals(symbol)
    }

    fn get_prices(&self, tickers: &[Symbol], window: FetchWindow) -> BTreeMap<Symbol, PriceSeries> {
        (**self).get_prices(tickers, window)
    }

    fn get_fundamentals(&self, tickers: &[Symbol]) -> BTreeMap<Symbol, FundamentalRecord> {
        (**self).get_fundamentals(tickers)
    }

    fn get_benchmark(&self, symbol: &str, window: FetchWindow) -> Result<PriceSeries, DataError> {
        (**self).get_benchmark(symbol, window)
    }
}
