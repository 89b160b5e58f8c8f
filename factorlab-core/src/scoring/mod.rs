//! Cross-sectional scoring — factors, qualitative filter, composite score, top-N.
//!
//! A `ScoringStrategy` decides how one ticker's factors are computed, which
//! rows survive the filter, and how survivors are scored. `ScoringEngine`
//! drives a strategy over a whole universe and collects exclusions along the
//! way. Per-ticker failures never abort the run.

pub mod blended;
pub mod pure_momentum;
pub mod selection;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{ScoringVariant, StrategyConfig};
use crate::domain::{FactorRow, FundamentalRecord, PriceSeries, RankedResult, Symbol};
use crate::error::{Exclusion, FactorError};
use crate::indicators::{Indicator, Momentum, RollingVolatility};

pub use blended::BlendedStrategy;
pub use pure_momentum::MomentumStrategy;
pub use selection::select;

/// One way of turning price history and fundamentals into a ranking.
pub trait ScoringStrategy: Send + Sync {
    fn variant(&self) -> ScoringVariant;

    fn needs_fundamentals(&self) -> bool {
        self.variant().needs_fundamentals()
    }

    /// Factor row for one ticker, or the reason it cannot be scored.
    fn factors(
        &self,
        series: &PriceSeries,
        fundamentals: Option<&FundamentalRecord>,
    ) -> Result<FactorRow, FactorError>;

    /// Qualitative filter.
    fn passes(&self, row: &FactorRow) -> bool;

    /// Composite score per surviving row, same order as `rows`.
    fn scores(&self, rows: &[FactorRow]) -> Vec<Result<f64, FactorError>>;
}

/// Result of scoring a universe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringOutcome {
    pub ranked: RankedResult,
    /// Tickers dropped for data reasons, in symbol order then scoring order.
    pub excluded: Vec<Exclusion>,
    /// Tickers that computed cleanly but failed the qualitative filter.
    pub filtered: Vec<Symbol>,
    /// Number of rows that passed the filter and were scored.
    pub candidates: usize,
}

pub struct ScoringEngine {
    strategy: Box<dyn ScoringStrategy>,
    n_stocks: usize,
}

impl std::fmt::Debug for ScoringEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScoringEngine")
            .field("variant", &self.strategy.variant())
            .field("n_stocks", &self.n_stocks)
            .finish()
    }
}

impl ScoringEngine {
    pub fn new(strategy: Box<dyn ScoringStrategy>, n_stocks: usize) -> Self {
        Self { strategy, n_stocks }
    }

    /// Engine for the variant selected in `config`.
    pub fn from_config(config: &StrategyConfig) -> Self {
        let strategy: Box<dyn ScoringStrategy> = match config.variant {
            ScoringVariant::Blended => Box::new(BlendedStrategy::from_config(config)),
            ScoringVariant::PureMomentum => Box::new(MomentumStrategy::from_config(config)),
        };
        Self::new(strategy, config.n_stocks)
    }

    pub fn variant(&self) -> ScoringVariant {
        self.strategy.variant()
    }

    pub fn needs_fundamentals(&self) -> bool {
        self.strategy.needs_fundamentals()
    }

    pub fn n_stocks(&self) -> usize {
        self.n_stocks
    }

    /// Score the priced universe and select the top `n_stocks`.
    ///
    /// `prices` keys are the tickers considered. For strategies that need
    /// fundamentals, a ticker without a record in `fundamentals` is excluded
    /// (inner join on symbol).
    pub fn score(
        &self,
        prices: &BTreeMap<Symbol, PriceSeries>,
        fundamentals: &BTreeMap<Symbol, FundamentalRecord>,
    ) -> ScoringOutcome {
        let mut excluded = Vec::new();
        let mut filtered = Vec::new();
        let mut survivors = Vec::new();

        for (symbol, series) in prices {
            match self.strategy.factors(series, fundamentals.get(symbol)) {
                Ok(row) if self.strategy.passes(&row) => survivors.push(row),
                Ok(row) => {
                    debug!(symbol = %row.symbol, "filtered out");
                    filtered.push(row.symbol);
                }
                Err(reason) => {
                    debug!(symbol = %symbol, kind = reason.kind(), %reason, "excluded");
                    excluded.push(Exclusion {
                        symbol: symbol.clone(),
                        reason,
                    });
                }
            }
        }

        let candidates = survivors.len();
        let scores = self.strategy.scores(&survivors);
        let mut scored = Vec::with_capacity(candidates);
        for (row, score) in survivors.into_iter().zip(scores) {
            match score {
                Ok(s) if s.is_finite() => scored.push((row, s)),
                Ok(s) => {
                    let reason = FactorError::undefined(&row.symbol, format!("score is {s}"));
                    debug!(symbol = %row.symbol, %reason, "excluded at scoring");
                    excluded.push(reason.into());
                }
                Err(reason) => {
                    debug!(symbol = %row.symbol, kind = reason.kind(), %reason, "excluded at scoring");
                    excluded.push(reason.into());
                }
            }
        }

        let rows = select(scored, self.n_stocks);
        info!(
            variant = %self.variant(),
            priced = prices.len(),
            excluded = excluded.len(),
            filtered = filtered.len(),
            candidates,
            selected = rows.len(),
            "universe scored"
        );

        ScoringOutcome {
            ranked: RankedResult {
                variant: self.variant(),
                rows,
            },
            excluded,
            filtered,
            candidates,
        }
    }
}

/// Trailing return over `lookback` observations; needs `lookback + 1` closes.
pub fn momentum_factor(series: &PriceSeries, lookback: usize) -> Result<f64, FactorError> {
    let symbol = series.symbol();
    let closes = series.closes();
    if closes.len() < lookback + 1 {
        return Err(FactorError::InsufficientHistory {
            symbol: symbol.to_string(),
            required: lookback + 1,
            available: closes.len(),
        });
    }

    let value = Momentum::new(lookback).latest(&closes);
    if value.is_finite() {
        return Ok(value);
    }
    let base = closes[closes.len() - 1 - lookback];
    let last = closes[closes.len() - 1];
    if base.is_finite() && last.is_finite() {
        Err(FactorError::undefined(symbol, "momentum base close is zero"))
    } else {
        Err(FactorError::missing(symbol, "momentum endpoint close missing"))
    }
}

/// Sample volatility of the last `window` daily returns.
///
/// `Ok(None)` when the window holds enough closes but the value is undefined
/// (missing or zero closes); the strategy turns that into an exclusion at
/// scoring time.
pub fn volatility_factor(series: &PriceSeries, window: usize) -> Result<Option<f64>, FactorError> {
    let closes = series.closes();
    if closes.len() < window + 1 {
        return Err(FactorError::InsufficientHistory {
            symbol: series.symbol().to_string(),
            required: window + 1,
            available: closes.len(),
        });
    }
    let vol = RollingVolatility::new(window).latest(&closes);
    Ok(vol.is_finite().then_some(vol))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};
    use chrono::NaiveDate;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    /// Series of `len` closes growing linearly to a total return of `total`.
    fn series_with_return(symbol: &str, len: usize, total: f64) -> PriceSeries {
        let closes: Vec<f64> = (0..len)
            .map(|i| 100.0 * (1.0 + total * i as f64 / (len - 1) as f64))
            .collect();
        PriceSeries::from_closes(symbol, start(), &closes)
    }

    fn record(roe: f64) -> FundamentalRecord {
        FundamentalRecord {
            return_on_equity: Some(roe),
            free_cashflow: Some(4.0),
            market_cap: Some(100.0),
            revenue_growth: Some(0.1),
            earnings_growth: Some(0.1),
        }
    }

    fn config(variant: ScoringVariant) -> StrategyConfig {
        let mut c = StrategyConfig::default().with_variant(variant);
        c.momentum_lookback = 10;
        c.volatility_lookback = 5;
        c
    }

    #[test]
    fn momentum_factor_needs_lookback_plus_one() {
        let s = series_with_return("A", 10, 0.2);
        let err = momentum_factor(&s, 10).unwrap_err();
        assert_eq!(
            err,
            FactorError::InsufficientHistory {
                symbol: "A".into(),
                required: 11,
                available: 10,
            }
        );
        assert_approx(momentum_factor(&s, 9).unwrap(), 0.2, 1e-12);
    }

    #[test]
    fn blended_excludes_negative_momentum() {
        let mut prices = BTreeMap::new();
        let mut fundamentals = BTreeMap::new();
        for (sym, ret) in [("A", 0.30), ("B", 0.10), ("C", -0.05)] {
            prices.insert(sym.to_string(), series_with_return(sym, 11, ret));
            fundamentals.insert(sym.to_string(), record(0.25));
        }

        let outcome = ScoringEngine::from_config(&config(ScoringVariant::Blended))
            .score(&prices, &fundamentals);
        assert_eq!(outcome.candidates, 2);
        assert_eq!(outcome.filtered, vec!["C".to_string()]);
        assert_eq!(outcome.ranked.symbols(), vec!["A", "B"]);
        assert!(outcome.ranked.rows[0].score > outcome.ranked.rows[1].score);
    }

    #[test]
    fn blended_excludes_ticker_without_fundamentals() {
        let mut prices = BTreeMap::new();
        prices.insert("A".to_string(), series_with_return("A", 11, 0.3));
        prices.insert("B".to_string(), series_with_return("B", 11, 0.2));
        let mut fundamentals = BTreeMap::new();
        fundamentals.insert("A".to_string(), record(0.25));

        let outcome = ScoringEngine::from_config(&config(ScoringVariant::Blended))
            .score(&prices, &fundamentals);
        assert_eq!(outcome.ranked.symbols(), vec!["A"]);
        assert_eq!(outcome.excluded.len(), 1);
        assert_eq!(outcome.excluded[0].symbol, "B");
        assert_eq!(outcome.excluded[0].reason.kind(), "missing_data");
    }

    #[test]
    fn short_history_is_excluded_not_fatal() {
        let mut prices = BTreeMap::new();
        prices.insert("A".to_string(), series_with_return("A", 11, 0.3));
        prices.insert("B".to_string(), series_with_return("B", 4, 0.3));

        let outcome = ScoringEngine::from_config(&config(ScoringVariant::PureMomentum))
            .score(&prices, &BTreeMap::new());
        assert_eq!(outcome.ranked.len(), 1);
        assert_eq!(outcome.excluded[0].reason.kind(), "insufficient_history");
    }

    #[test]
    fn pure_momentum_excludes_zero_volatility() {
        // Doubling every day gives identical returns, so the sample std is exactly zero.
        let closes: Vec<f64> = (0..11).map(|i| 2.0_f64.powi(i)).collect();
        let flat = PriceSeries::from_closes("FLAT", start(), &closes);
        let mut prices = BTreeMap::new();
        prices.insert("FLAT".to_string(), flat);

        let mut engine_config = config(ScoringVariant::PureMomentum);
        engine_config.volatility_lookback = 5;
        let outcome = ScoringEngine::from_config(&engine_config).score(&prices, &BTreeMap::new());
        assert!(outcome.ranked.is_empty());
        assert_eq!(outcome.candidates, 1);
        assert_eq!(outcome.excluded.len(), 1);
    }

    #[test]
    fn pure_momentum_ties_break_by_symbol() {
        let strategy = MomentumStrategy::new(10, 5, 0.0);
        let rows: Vec<FactorRow> = ["ZZZ", "AAA", "MMM"]
            .iter()
            .zip([(0.2, 0.1), (0.4, 0.2), (0.1, 0.1)])
            .map(|(s, (m, v))| {
                let mut r = FactorRow::with_momentum(*s, m);
                r.volatility = Some(v);
                r
            })
            .collect();
        let scored: Vec<(FactorRow, f64)> = rows
            .iter()
            .cloned()
            .zip(strategy.scores(&rows).into_iter().map(|s| s.unwrap()))
            .collect();
        let ranked = select(scored, 15);
        let symbols: Vec<_> = ranked.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["AAA", "ZZZ", "MMM"]);
        assert_approx(ranked[0].score, 2.0, DEFAULT_EPSILON);
    }

    #[test]
    fn equal_risk_adjusted_momentum_is_an_exact_tie() {
        let strategy = MomentumStrategy::new(10, 5, 0.0);
        let rows: Vec<FactorRow> = [("ZZZ", 0.2, 0.1), ("AAA", 0.1, 0.05)]
            .iter()
            .map(|&(s, m, v)| {
                let mut r = FactorRow::with_momentum(s, m);
                r.volatility = Some(v);
                r
            })
            .collect();
        let scores: Vec<f64> = strategy
            .scores(&rows)
            .into_iter()
            .map(|s| s.unwrap())
            .collect();
        assert_eq!(scores, vec![2.0, 2.0]);

        let ranked = select(rows.into_iter().zip(scores).collect(), 15);
        let symbols: Vec<_> = ranked.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["AAA", "ZZZ"]);
    }

    #[test]
    fn selection_never_exceeds_n_stocks() {
        let mut prices = BTreeMap::new();
        for i in 0..20 {
            let sym = format!("T{i:02}");
            let closes: Vec<f64> = (0..11)
                .map(|d| 100.0 + d as f64 * (1.0 + i as f64) + if d % 2 == 0 { 0.5 } else { 0.0 })
                .collect();
            prices.insert(sym.clone(), PriceSeries::from_closes(&sym, start(), &closes));
        }
        let cfg = config(ScoringVariant::PureMomentum).with_n_stocks(15);
        let outcome = ScoringEngine::from_config(&cfg).score(&prices, &BTreeMap::new());
        assert_eq!(outcome.ranked.len(), 15);
        assert!(outcome.ranked.rows.iter().all(|r| r.score.is_finite()));
        assert!(outcome
            .ranked
            .rows
            .windows(2)
            .all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn empty_universe_scores_nothing() {
        let outcome = ScoringEngine::from_config(&StrategyConfig::default())
            .score(&BTreeMap::new(), &BTreeMap::new());
        assert!(outcome.ranked.is_empty());
        assert_eq!(outcome.candidates, 0);
    }
}
