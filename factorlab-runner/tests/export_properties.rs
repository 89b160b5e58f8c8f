//! Property tests for report export.
//!
//! Uses proptest to verify, over arbitrary reports:
//! 1. JSON reload keeps the ranking, the regime and the warnings
//! 2. CSV has a header plus one record per ranked row, all the same width
//! 3. Markdown lists every ranked symbol, and no table when risk-off

use chrono::NaiveDate;
use proptest::prelude::*;

use factorlab_core::domain::{FactorRow, RankedResult, RankedRow};
use factorlab_core::{RegimeDecision, ScoringVariant};
use factorlab_runner::{
    export_csv, export_json, export_markdown, import_json, PipelineReport, SCHEMA_VERSION,
};

fn as_of() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 28).unwrap()
}

fn arb_variant() -> impl Strategy<Value = ScoringVariant> {
    prop_oneof![Just(ScoringVariant::Blended), Just(ScoringVariant::PureMomentum)]
}

fn arb_factors() -> impl Strategy<Value = (f64, Option<f64>, Option<f64>, Option<f64>)> {
    (
        -0.5..1.5_f64,
        prop::option::of(0.001..0.05_f64),
        prop::option::of(-0.2..0.6_f64),
        prop::option::of(-0.05..0.1_f64),
    )
}

prop_compose! {
    fn arb_report()(
        variant in arb_variant(),
        close in 100.0..600.0_f64,
        ema in 100.0..600.0_f64,
        rows in prop::collection::vec((-5.0..5.0_f64, arb_factors()), 0..20),
        warned in any::<bool>(),
    ) -> PipelineReport {
        let decision = RegimeDecision::from_levels(as_of(), close, ema);
        let rows = if decision.is_risk_on {
            rows.into_iter()
                .enumerate()
                .map(|(i, (score, (momentum, volatility, roe, fcf_yield)))| {
                    let symbol = format!("T{i:03}");
                    let mut factors = FactorRow::with_momentum(symbol.clone(), momentum);
                    factors.volatility = volatility;
                    factors.roe = roe;
                    factors.fcf_yield = fcf_yield;
                    RankedRow { rank: i + 1, symbol, score, factors }
                })
                .collect()
        } else {
            Vec::new()
        };
        PipelineReport {
            schema_version: SCHEMA_VERSION,
            as_of: as_of(),
            variant,
            benchmark: "SPY".into(),
            decision,
            ranked: RankedResult { variant, rows },
            excluded: Vec::new(),
            filtered: Vec::new(),
            universe_size: 72,
            priced_count: 60,
            config_fingerprint: "f00d".into(),
            source: "synthetic".into(),
            warnings: if warned { vec!["fundamentals unavailable".into()] } else { Vec::new() },
        }
    }
}

proptest! {
    #[test]
    fn json_reload_keeps_ranking(report in arb_report()) {
        let loaded = import_json(&export_json(&report).unwrap()).unwrap();

        prop_assert_eq!(loaded.variant, report.variant);
        prop_assert_eq!(loaded.decision.is_risk_on, report.decision.is_risk_on);
        prop_assert_eq!(loaded.ranked.symbols(), report.ranked.symbols());
        prop_assert_eq!(&loaded.warnings, &report.warnings);
        for (a, b) in loaded.ranked.rows.iter().zip(&report.ranked.rows) {
            prop_assert_eq!(a.rank, b.rank);
            prop_assert!((a.score - b.score).abs() < 1e-9);
            prop_assert_eq!(a.factors.roe.is_some(), b.factors.roe.is_some());
        }
    }

    #[test]
    fn csv_has_one_record_per_row(report in arb_report()) {
        let csv = export_csv(&report).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        let width = 3 + report.variant.factor_columns().len();

        prop_assert_eq!(lines.len(), report.ranked.len() + 1);
        for line in &lines {
            prop_assert_eq!(line.split(',').count(), width);
        }
    }

    #[test]
    fn markdown_lists_ranked_symbols(report in arb_report()) {
        let md = export_markdown(&report);

        if report.has_exposure() {
            for row in &report.ranked.rows {
                let cell = format!("| {} |", row.symbol);
                prop_assert!(md.contains(&cell));
            }
        } else {
            prop_assert!(md.contains("No exposure"));
            prop_assert!(!md.contains("| # | Ticker"));
        }
    }
}
