//! Top-N selection.

use std::cmp::Ordering;

use crate::domain::{FactorRow, RankedRow};

/// Sort by score descending, break ties by symbol ascending, keep the first `n`.
///
/// Ranks are assigned 1..=n after sorting.
pub fn select(mut scored: Vec<(FactorRow, f64)>, n: usize) -> Vec<RankedRow> {
    scored.sort_by(|(a_row, a), (b_row, b)| match b.total_cmp(a) {
        Ordering::Equal => a_row.symbol.cmp(&b_row.symbol),
        other => other,
    });
    scored.truncate(n);

    scored
        .into_iter()
        .enumerate()
        .map(|(i, (factors, score))| RankedRow {
            rank: i + 1,
            symbol: factors.symbol.clone(),
            score,
            factors,
        })
        .collect()
}
