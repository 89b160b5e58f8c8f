//! Criterion benchmarks for FactorLab hot paths.
//!
//! Benchmarks:
//! 1. Regime evaluation (weekly resample + EMA over ten years of daily closes)
//! 2. Scoring engine over a full universe, both variants
//! 3. Percentile rank over a cross-section
//! 4. Universe alignment (complete-column filter)

use std::collections::BTreeMap;

use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use factorlab_core::data::complete_columns;
use factorlab_core::domain::{FundamentalRecord, PriceSeries};
use factorlab_core::indicators::percentile_rank;
use factorlab_core::regime::MarketRegimeFilter;
use factorlab_core::{ScoringEngine, ScoringVariant, StrategyConfig};

// ── Helpers ──────────────────────────────────────────────────────────

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2014, 1, 6).unwrap()
}

fn make_series(symbol: &str, n: usize, phase: f64) -> PriceSeries {
    let closes: Vec<f64> = (0..n)
        .map(|i| 100.0 + i as f64 * 0.05 + ((i as f64 * 0.1) + phase).sin() * 5.0)
        .collect();
    PriceSeries::from_closes(symbol, start(), &closes)
}

fn make_universe(
    size: usize,
    days: usize,
) -> (
    BTreeMap<String, PriceSeries>,
    BTreeMap<String, FundamentalRecord>,
) {
    let mut prices = BTreeMap::new();
    let mut fundamentals = BTreeMap::new();
    for i in 0..size {
        let symbol = format!("T{i:03}");
        prices.insert(symbol.clone(), make_series(&symbol, days, i as f64));
        fundamentals.insert(
            symbol,
            FundamentalRecord {
                return_on_equity: Some(0.12 + (i % 7) as f64 * 0.03),
                free_cashflow: Some(1.0e9 + i as f64 * 1.0e8),
                market_cap: Some(5.0e10),
                revenue_growth: Some((i % 5) as f64 * 0.02),
                earnings_growth: Some((i % 3) as f64 * 0.04),
            },
        );
    }
    (prices, fundamentals)
}

// ── 1. Regime ────────────────────────────────────────────────────────

fn bench_regime(c: &mut Criterion) {
    let benchmark = make_series("SPY", 2520, 0.0);
    let filter = MarketRegimeFilter::default_params();
    c.bench_function("regime_evaluate_10y", |b| {
        b.iter(|| filter.evaluate(black_box(&benchmark)))
    });
}

// ── 2. Scoring ───────────────────────────────────────────────────────

fn bench_scoring(c: &mut Criterion) {
    let mut group = c.benchmark_group("scoring_engine");
    for size in [72usize, 500] {
        let (prices, fundamentals) = make_universe(size, 504);
        for variant in [ScoringVariant::Blended, ScoringVariant::PureMomentum] {
            let engine =
                ScoringEngine::from_config(&StrategyConfig::default().with_variant(variant));
            group.bench_with_input(
                BenchmarkId::new(variant.as_str(), size),
                &(&prices, &fundamentals),
                |b, (p, f)| b.iter(|| engine.score(black_box(p), black_box(f))),
            );
        }
    }
    group.finish();
}

// ── 3. Percentile rank ───────────────────────────────────────────────

fn bench_percentile_rank(c: &mut Criterion) {
    let values: Vec<f64> = (0..1000).map(|i| ((i * 7919) % 1000) as f64 / 10.0).collect();
    c.bench_function("percentile_rank_1000", |b| {
        b.iter(|| percentile_rank(black_box(&values)))
    });
}

// ── 4. Alignment ─────────────────────────────────────────────────────

fn bench_alignment(c: &mut Criterion) {
    let (prices, _) = make_universe(72, 504);
    c.bench_function("complete_columns_72x504", |b| {
        b.iter(|| complete_columns(black_box(prices.clone())))
    });
}

criterion_group!(
    benches,
    bench_regime,
    bench_scoring,
    bench_percentile_rank,
    bench_alignment
);
criterion_main!(benches);
