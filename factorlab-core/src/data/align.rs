//! Multi-symbol time alignment.
//!
//! Given daily closes for multiple symbols, align them to the union of their
//! dates. Missing observations become NaN (no forward-fill of price data).
//! `complete_columns` then keeps only the symbols with a close on every date.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::NaiveDate;

use crate::domain::{PricePoint, PriceSeries, Symbol};

/// Closes for multiple symbols on a common timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedCloses {
    /// The common date axis (sorted ascending).
    pub dates: Vec<NaiveDate>,
    /// Closes per symbol; each inner Vec has the same length as `dates`.
    pub closes: BTreeMap<Symbol, Vec<f64>>,
}

impl AlignedCloses {
    /// Symbols with a finite close on every date of the timeline.
    pub fn complete_symbols(&self) -> Vec<&str> {
        self.closes
            .iter()
            .filter(|(_, closes)| closes.iter().all(|c| c.is_finite()))
            .map(|(symbol, _)| symbol.as_str())
            .collect()
    }
}

/// Align multiple series to the union of their dates.
pub fn align_series(series: &BTreeMap<Symbol, PriceSeries>) -> AlignedCloses {
    let dates: Vec<NaiveDate> = series
        .values()
        .flat_map(|s| s.points().iter().map(|p| p.date))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let closes = series
        .iter()
        .map(|(symbol, s)| {
            let by_date: HashMap<NaiveDate, f64> =
                s.points().iter().map(|p| (p.date, p.close)).collect();
            let aligned = dates
                .iter()
                .map(|d| by_date.get(d).copied().unwrap_or(f64::NAN))
                .collect();
            (symbol.clone(), aligned)
        })
        .collect();

    AlignedCloses { dates, closes }
}

/// Drop every symbol with a missing close anywhere on the union timeline.
///
/// Surviving series are returned on the common timeline, so they all have the
/// same dates.
pub fn complete_columns(series: BTreeMap<Symbol, PriceSeries>) -> BTreeMap<Symbol, PriceSeries> {
    let aligned = align_series(&series);
    let dates = aligned.dates;

    aligned
        .closes
        .into_iter()
        .filter(|(_, closes)| closes.iter().all(|c| c.is_finite()))
        .filter_map(|(symbol, closes)| {
            let points = dates
                .iter()
                .zip(closes)
                .map(|(d, c)| PricePoint::new(*d, c))
                .collect();
            // Dates come from a sorted set, so construction cannot fail.
            PriceSeries::new(symbol.clone(), points)
                .ok()
                .map(|s| (symbol, s))
        })
        .collect()
}
