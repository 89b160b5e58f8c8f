//! In-memory provider over fixed maps.
//!
//! Used by tests and by callers that already hold the data. Counts calls so
//! tests can assert which fetches happened.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use super::provider::{DataError, FetchWindow, UniverseDataProvider};
use crate::domain::{FundamentalRecord, PriceSeries, Symbol};

#[derive(Debug, Default)]
pub struct InMemoryProvider {
    series: BTreeMap<Symbol, PriceSeries>,
    fundamentals: BTreeMap<Symbol, FundamentalRecord>,
    failing: BTreeSet<Symbol>,
    series_calls: AtomicUsize,
    fundamentals_calls: AtomicUsize,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_series(mut self, series: PriceSeries) -> Self {
        self.series.insert(series.symbol().to_string(), series);
        self
    }

    pub fn with_fundamentals(mut self, symbol: impl Into<String>, record: FundamentalRecord) -> Self {
        self.fundamentals.insert(symbol.into(), record);
        self
    }

    /// Every fetch for `symbol` fails with a network error.
    pub fn with_failure(mut self, symbol: impl Into<String>) -> Self {
        self.failing.insert(symbol.into());
        self
    }

    /// Number of `fetch_series` calls so far.
    pub fn series_calls(&self) -> usize {
        self.series_calls.load(Ordering::Relaxed)
    }

    /// Number of `fetch_fundamentals` calls so far.
    pub fn fundamentals_calls(&self) -> usize {
        self.fundamentals_calls.load(Ordering::Relaxed)
    }

    fn check_failure(&self, symbol: &str) -> Result<(), DataError> {
        if self.failing.contains(symbol) {
            return Err(DataError::NetworkUnreachable(format!("injected failure for {symbol}")));
        }
        Ok(())
    }
}

impl UniverseDataProvider for InMemoryProvider {
    fn name(&self) -> &str {
        "in_memory"
    }

    fn fetch_series(&self, symbol: &str, window: FetchWindow) -> Result<PriceSeries, DataError> {
        self.series_calls.fetch_add(1, Ordering::Relaxed);
        self.check_failure(symbol)?;
        self.series
            .get(symbol)
            .map(|s| s.between(window.start, window.end))
            .ok_or_else(|| DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            })
    }

    fn fetch_fundamentals(&self, symbol: &str) -> Result<FundamentalRecord, DataError> {
        self.fundamentals_calls.fetch_add(1, Ordering::Relaxed);
        self.check_failure(symbol)?;
        self.fundamentals
            .get(symbol)
            .copied()
            .ok_or_else(|| DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            })
    }
}
