//! Cross-sectional fractional percentile rank.
//!
//! pct[i] = average_rank(x[i]) / count, with 1-based ranks over the finite values.
//! Tied values share the mean of the ranks they occupy. Non-finite inputs map to NaN
//! and do not count toward `count`.

/// Percentile rank of each value in (0, 1]; NaN for non-finite inputs.
pub fn percentile_rank(values: &[f64]) -> Vec<f64> {
    let mut result = vec![f64::NAN; values.len()];

    let mut order: Vec<usize> = (0..values.len())
        .filter(|&i| values[i].is_finite())
        .collect();
    let count = order.len();
    if count == 0 {
        return result;
    }
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut start = 0;
    while start < count {
        let mut end = start;
        while end + 1 < count && values[order[end + 1]] == values[order[start]] {
            end += 1;
        }
        // Positions start..=end hold 1-based ranks start+1 ..= end+1.
        let avg_rank = (start + end + 2) as f64 / 2.0;
        for &idx in &order[start..=end] {
            result[idx] = avg_rank / count as f64;
        }
        start = end + 1;
    }

    result
}
