//! Time-bounded memoization around any provider.
//!
//! Collected results (universe prices, fundamentals, benchmark) are cached in
//! memory for a fixed TTL, keyed by a BLAKE3 hash of the request. The cache is
//! advisory: a run produces the same output with or without it. Only
//! successful benchmark fetches are cached.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::debug;

use super::provider::{DataError, FetchWindow, UniverseDataProvider};
use crate::domain::{FundamentalRecord, PriceSeries, Symbol};

/// Default time-to-live of a memoized result.
pub const DEFAULT_TTL: Duration = Duration::from_secs(600);

#[derive(Debug, Clone)]
struct Entry<T> {
    stored_at: Instant,
    value: T,
}

/// TTL-bounded map from request key to value.
#[derive(Debug)]
struct TtlMap<T> {
    entries: Mutex<HashMap<String, Entry<T>>>,
}

impl<T: Clone> TtlMap<T> {
    fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry<T>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn get(&self, key: &str, ttl: Duration) -> Option<T> {
        let mut entries = self.lock();
        match entries.get(key) {
            Some(entry) if entry.stored_at.elapsed() < ttl => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn put(&self, key: String, value: T) {
        self.lock().insert(
            key,
            Entry {
                stored_at: Instant::now(),
                value,
            },
        );
    }

    fn clear(&self) {
        self.lock().clear();
    }

    fn len(&self) -> usize {
        self.lock().len()
    }
}

/// Request key: kind tag, sorted distinct tickers, optional window.
fn request_key(kind: &str, tickers: &[Symbol], window: Option<FetchWindow>) -> String {
    let sorted: BTreeSet<&str> = tickers.iter().map(|s| s.as_str()).collect();
    let mut hasher = blake3::Hasher::new();
    hasher.update(kind.as_bytes());
    for symbol in sorted {
        hasher.update(b"\x1f");
        hasher.update(symbol.as_bytes());
    }
    if let Some(w) = window {
        hasher.update(format!("|{}..{}", w.start, w.end).as_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

/// Wraps a provider and memoizes its collected results.
pub struct MemoizedProvider<P> {
    inner: P,
    ttl: Duration,
    prices: TtlMap<BTreeMap<Symbol, PriceSeries>>,
    fundamentals: TtlMap<BTreeMap<Symbol, FundamentalRecord>>,
    benchmarks: TtlMap<PriceSeries>,
}

impl<P: UniverseDataProvider> MemoizedProvider<P> {
    pub fn new(inner: P) -> Self {
        Self::with_ttl(inner, DEFAULT_TTL)
    }

    pub fn with_ttl(inner: P, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            prices: TtlMap::new(),
            fundamentals: TtlMap::new(),
            benchmarks: TtlMap::new(),
        }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Drop every memoized result.
    pub fn clear(&self) {
        self.prices.clear();
        self.fundamentals.clear();
        self.benchmarks.clear();
        debug!(provider = self.inner.name(), "memo cache cleared");
    }

    /// Number of live entries across all request kinds.
    pub fn len(&self) -> usize {
        self.prices.len() + self.fundamentals.len() + self.benchmarks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<P: UniverseDataProvider> UniverseDataProvider for MemoizedProvider<P> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn fetch_series(&self, symbol: &str, window: FetchWindow) -> Result<PriceSeries, DataError> {
        self.inner.fetch_series(symbol, window)
    }

    fn fetch_fundamentals(&self, symbol: &str) -> Result<FundamentalRecord, DataError> {
        self.inner.fetch_fundamentals(symbol)
    }

    fn get_prices(&self, tickers: &[Symbol], window: FetchWindow) -> BTreeMap<Symbol, PriceSeries> {
        let key = request_key("prices", tickers, Some(window));
        if let Some(hit) = self.prices.get(&key, self.ttl) {
            debug!(tickers = tickers.len(), "memo hit: prices");
            return hit;
        }
        let value = self.inner.get_prices(tickers, window);
        self.prices.put(key, value.clone());
        value
    }

    fn get_fundamentals(&self, tickers: &[Symbol]) -> BTreeMap<Symbol, FundamentalRecord> {
        let key = request_key("fundamentals", tickers, None);
        if let Some(hit) = self.fundamentals.get(&key, self.ttl) {
            debug!(tickers = tickers.len(), "memo hit: fundamentals");
            return hit;
        }
        let value = self.inner.get_fundamentals(tickers);
        self.fundamentals.put(key, value.clone());
        value
    }

    fn get_benchmark(&self, symbol: &str, window: FetchWindow) -> Result<PriceSeries, DataError> {
        let key = request_key("benchmark", &[symbol.to_string()], Some(window));
        if let Some(hit) = self.benchmarks.get(&key, self.ttl) {
            debug!(symbol, "memo hit: benchmark");
            return Ok(hit);
        }
        let series = self.inner.get_benchmark(symbol, window)?;
        self.benchmarks.put(key, series.clone());
        Ok(series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::InMemoryProvider;
    use chrono::NaiveDate;

    fn window() -> FetchWindow {
        FetchWindow::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
        )
    }

    fn provider() -> InMemoryProvider {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        InMemoryProvider::new()
            .with_series(PriceSeries::from_closes("AAPL", start, &[1.0, 2.0, 3.0]))
            .with_series(PriceSeries::from_closes("MSFT", start, &[4.0, 5.0, 6.0]))
            .with_fundamentals("AAPL", FundamentalRecord::default())
    }

    #[test]
    fn key_ignores_ticker_order() {
        let a = request_key("prices", &["A".into(), "B".into()], Some(window()));
        let b = request_key("prices", &["B".into(), "A".into()], Some(window()));
        let c = request_key("prices", &["A".into()], Some(window()));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, request_key("fundamentals", &["A".into(), "B".into()], None));
    }

    #[test]
    fn second_call_within_ttl_is_served_from_memo() {
        let memo = MemoizedProvider::new(provider());
        let tickers = vec!["AAPL".to_string(), "MSFT".to_string()];

        let first = memo.get_prices(&tickers, window());
        let second = memo.get_prices(&tickers, window());
        assert_eq!(first, second);
        assert_eq!(memo.inner().series_calls(), 2);
        assert_eq!(memo.len(), 1);
    }

    #[test]
    fn clear_forces_refetch() {
        let memo = MemoizedProvider::new(provider());
        let tickers = vec!["AAPL".to_string()];

        memo.get_fundamentals(&tickers);
        memo.clear();
        assert!(memo.is_empty());
        memo.get_fundamentals(&tickers);
        assert_eq!(memo.inner().fundamentals_calls(), 2);
    }

    #[test]
    fn expired_entries_are_refetched() {
        let memo = MemoizedProvider::with_ttl(provider(), Duration::ZERO);
        memo.get_benchmark("AAPL", window()).unwrap();
        memo.get_benchmark("AAPL", window()).unwrap();
        assert_eq!(memo.inner().series_calls(), 2);
    }

    #[test]
    fn failed_benchmark_is_not_cached() {
        let memo = MemoizedProvider::new(provider());
        assert!(memo.get_benchmark("SPY", window()).is_err());
        assert!(memo.is_empty());
    }
}
