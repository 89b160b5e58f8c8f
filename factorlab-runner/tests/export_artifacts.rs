//! Report export: JSON round-trip and schema gate, CSV columns, Markdown,
//! file output.

use chrono::NaiveDate;
use tempfile::TempDir;

use factorlab_core::data::InMemoryProvider;
use factorlab_core::domain::{FundamentalRecord, PriceSeries};
use factorlab_core::ScoringVariant;
use factorlab_runner::{
    export_csv, export_json, export_markdown, import_json, load_report, write_output,
    ExportError, Pipeline, PipelineReport, RunConfig, SCHEMA_VERSION,
};

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

fn run(variant: ScoringVariant, rising: bool) -> PipelineReport {
    let mut config = RunConfig::default();
    config.strategy = config
        .strategy
        .with_universe(["AAA", "BBB", "NOFUND"])
        .with_variant(variant);
    config.strategy.min_weeks = 10;
    config.strategy.ema_span = 5;

    let bench: Vec<f64> = (0..120)
        .map(|i| if rising { 400.0 + i as f64 } else { 500.0 - i as f64 })
        .collect();
    let record = FundamentalRecord {
        return_on_equity: Some(0.2),
        free_cashflow: Some(1.0e9),
        market_cap: Some(2.0e10),
        revenue_growth: Some(0.1),
        earnings_growth: None,
    };
    let mut provider =
        InMemoryProvider::new().with_series(PriceSeries::from_closes("SPY", start(), &bench));
    for (sym, total) in [("AAA", 0.3), ("BBB", 0.2), ("NOFUND", 0.25)] {
        let closes: Vec<f64> = (0..130)
            .map(|i| 50.0 * (1.0 + total * i as f64 / 129.0) + (i % 3) as f64 * 0.1)
            .collect();
        provider = provider.with_series(PriceSeries::from_closes(sym, start(), &closes));
    }
    let full = FundamentalRecord {
        earnings_growth: Some(0.05),
        ..record
    };
    provider = provider
        .with_fundamentals("AAA", full)
        .with_fundamentals("BBB", full);

    Pipeline::new(&config, &provider)
        .run(NaiveDate::from_ymd_opt(2024, 6, 28).unwrap())
        .unwrap()
}

#[test]
fn json_round_trip() {
    let report = run(ScoringVariant::Blended, true);
    assert_eq!(report.ranked.len(), 2);
    assert_eq!(report.excluded.len(), 1);

    let json = export_json(&report).unwrap();
    let loaded = import_json(&json).unwrap();
    assert_eq!(loaded.schema_version, SCHEMA_VERSION);
    assert_eq!(loaded.ranked.symbols(), report.ranked.symbols());
    assert_eq!(loaded.excluded, report.excluded);
    assert_eq!(loaded.decision.is_risk_on, report.decision.is_risk_on);
}

#[test]
fn newer_schema_is_rejected() {
    let report = run(ScoringVariant::Blended, true);
    let mut value: serde_json::Value = serde_json::from_str(&export_json(&report).unwrap()).unwrap();
    value["schema_version"] = serde_json::json!(SCHEMA_VERSION + 1);

    let err = import_json(&value.to_string()).unwrap_err();
    assert!(matches!(err, ExportError::UnsupportedSchema { .. }));
}

#[test]
fn missing_schema_version_defaults_to_current() {
    let report = run(ScoringVariant::PureMomentum, true);
    let mut value: serde_json::Value = serde_json::from_str(&export_json(&report).unwrap()).unwrap();
    value
        .as_object_mut()
        .unwrap()
        .remove("schema_version");

    let loaded = import_json(&value.to_string()).unwrap();
    assert_eq!(loaded.schema_version, SCHEMA_VERSION);
}

#[test]
fn csv_columns_follow_variant() {
    let blended = export_csv(&run(ScoringVariant::Blended, true)).unwrap();
    let header = blended.lines().next().unwrap();
    assert_eq!(
        header,
        "Rank,Ticker,Score,Momentum,ROE,FCF_Yield,Rev_Growth,EPS_Growth"
    );
    assert_eq!(blended.lines().count(), 3);

    let pure = export_csv(&run(ScoringVariant::PureMomentum, true)).unwrap();
    assert_eq!(
        pure.lines().next().unwrap(),
        "Rank,Ticker,Score,Momentum,Volatility"
    );
    assert_eq!(pure.lines().count(), 4);
}

#[test]
fn risk_off_csv_has_header_only() {
    let csv = export_csv(&run(ScoringVariant::Blended, false)).unwrap();
    assert_eq!(csv.lines().count(), 1);
}

#[test]
fn markdown_shows_regime_and_exclusions() {
    let md = export_markdown(&run(ScoringVariant::Blended, true));
    assert!(md.contains("**RISK ON**"));
    assert!(md.contains("| # | Ticker | Score |"));
    assert!(md.contains("## Excluded"));
    assert!(md.contains("NOFUND"));

    let off = export_markdown(&run(ScoringVariant::Blended, false));
    assert!(off.contains("**RISK OFF**"));
    assert!(off.contains("No exposure"));
    assert!(!off.contains("| # | Ticker"));
}

#[test]
fn report_file_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("reports").join("latest.json");
    let report = run(ScoringVariant::Blended, true);

    write_output(&path, &export_json(&report).unwrap()).unwrap();
    let loaded = load_report(&path).unwrap();
    assert_eq!(loaded.ranked.symbols(), report.ranked.symbols());
}

#[test]
fn missing_report_file_is_io_error() {
    let dir = TempDir::new().unwrap();
    let err = load_report(&dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, ExportError::Io { .. }));
}
