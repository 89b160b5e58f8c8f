//! Terminal presentation of pipeline results.
//!
//! A presenter receives either a finished `PipelineReport` or the `RunError`
//! that stopped the run. The table presenter renders three distinct states:
//! a ranked table, an explicit "no exposure" message when risk-off, and an
//! error banner when the regime gate could not be evaluated.

use std::collections::BTreeMap;
use std::io::{self, Write};

use factorlab_core::domain::{Factor, RankedRow};

use crate::orchestrator::{PipelineReport, RunError};

/// Placeholder for an absent factor value.
pub const MISSING: &str = "—";

/// Consumer of pipeline output.
pub trait ResultPresenter {
    fn present(&mut self, report: &PipelineReport) -> io::Result<()>;

    fn present_failure(&mut self, error: &RunError) -> io::Result<()>;
}

/// Plain-text table presenter.
pub struct TablePresenter<W: Write> {
    out: W,
}

impl<W: Write> TablePresenter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn banner(&mut self, report: &PipelineReport) -> io::Result<()> {
        let d = &report.decision;
        writeln!(
            self.out,
            "Market regime ({}, week ending {})",
            report.benchmark, d.week_ending
        )?;
        writeln!(self.out, "  {} (weekly)   {:>10.2}", report.benchmark, d.last_value)?;
        writeln!(self.out, "  EMA (weekly)   {:>10.2}", d.last_ema)?;
        writeln!(self.out, "  Regime         {:>10}", d.regime().to_string())?;
        writeln!(self.out)
    }

    fn table(&mut self, report: &PipelineReport) -> io::Result<()> {
        let factors = report.variant.factor_columns();
        writeln!(
            self.out,
            "Top {} ({})",
            report.ranked.len(),
            report.variant
        )?;

        let mut header = format!("{:<4} {:<8} {:>8}", "#", "Ticker", "Score");
        for f in factors {
            header.push_str(&format!(" {:>11}", f.column_name()));
        }
        writeln!(self.out, "{header}")?;
        writeln!(self.out, "{}", "-".repeat(header.chars().count()))?;

        for row in &report.ranked.rows {
            writeln!(self.out, "{}", format_row(row, factors))?;
        }
        writeln!(self.out)?;

        if !report.excluded.is_empty() || !report.filtered.is_empty() {
            let mut kinds: BTreeMap<&str, usize> = BTreeMap::new();
            for e in &report.excluded {
                *kinds.entry(e.reason.kind()).or_default() += 1;
            }
            let detail: Vec<String> = kinds.iter().map(|(k, n)| format!("{k} {n}")).collect();
            writeln!(
                self.out,
                "Excluded {} ({}), filtered {}, priced {}/{}",
                report.excluded.len(),
                detail.join(", "),
                report.filtered.len(),
                report.priced_count,
                report.universe_size
            )?;
        }
        Ok(())
    }
}

impl<W: Write> ResultPresenter for TablePresenter<W> {
    fn present(&mut self, report: &PipelineReport) -> io::Result<()> {
        self.banner(report)?;
        if report.has_exposure() {
            self.table(report)?;
        } else {
            writeln!(
                self.out,
                "NO EXPOSURE: {} is below its weekly EMA; the strategy holds no stocks.",
                report.benchmark
            )?;
        }
        for warning in &report.warnings {
            writeln!(self.out, "WARNING: {warning}")?;
        }
        writeln!(self.out, "As of {}", report.as_of)
    }

    fn present_failure(&mut self, error: &RunError) -> io::Result<()> {
        let label = if error.is_insufficient_history() {
            "INSUFFICIENT HISTORY"
        } else {
            match error {
                RunError::Config(_) => "CONFIGURATION ERROR",
                RunError::Benchmark(_) => "BENCHMARK DATA UNAVAILABLE",
                RunError::Regime(_) => "REGIME UNAVAILABLE",
            }
        };
        writeln!(self.out, "{label}: {error}")?;
        if error.is_regime_failure() {
            writeln!(self.out, "No ranking was computed. Try again later.")?;
        }
        Ok(())
    }
}

fn format_row(row: &RankedRow, factors: &[Factor]) -> String {
    let mut line = format!("{:<4} {:<8} {:>8.3}", row.rank, row.symbol, row.score);
    for f in factors {
        line.push_str(&format!(" {:>11}", format_percent(row.factors.value(*f))));
    }
    line
}

/// Ratio as a percentage with two decimals, or the missing placeholder.
pub fn format_percent(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{:.2}%", v * 100.0),
        _ => MISSING.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::SCHEMA_VERSION;
    use chrono::NaiveDate;
    use factorlab_core::domain::{FactorRow, RankedResult};
    use factorlab_core::{Exclusion, FactorError, RegimeDecision, ScoringVariant};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 28).unwrap()
    }

    fn report(risk_on: bool, variant: ScoringVariant) -> PipelineReport {
        let mut factors = FactorRow::with_momentum("AAPL", 0.2534);
        factors.roe = Some(0.31);
        factors.fcf_yield = None;
        factors.rev_growth = Some(0.05);
        factors.eps_growth = Some(-0.012);
        factors.volatility = Some(0.0123);
        let rows = if risk_on {
            vec![RankedRow {
                rank: 1,
                symbol: "AAPL".into(),
                score: 0.87654,
                factors,
            }]
        } else {
            Vec::new()
        };
        PipelineReport {
            schema_version: SCHEMA_VERSION,
            as_of: date(),
            variant,
            benchmark: "SPY".into(),
            decision: RegimeDecision::from_levels(
                date(),
                if risk_on { 500.0 } else { 450.0 },
                480.0,
            ),
            ranked: RankedResult { variant, rows },
            excluded: vec![Exclusion::from(FactorError::InsufficientHistory {
                symbol: "NEW".into(),
                required: 127,
                available: 40,
            })],
            filtered: vec!["XOM".into()],
            universe_size: 3,
            priced_count: 3,
            config_fingerprint: "abc".into(),
            source: "test".into(),
            warnings: Vec::new(),
        }
    }

    fn render(report: &PipelineReport) -> String {
        let mut p = TablePresenter::new(Vec::new());
        p.present(report).unwrap();
        String::from_utf8(p.into_inner()).unwrap()
    }

    #[test]
    fn blended_table_formats_values() {
        let text = render(&report(true, ScoringVariant::Blended));
        assert!(text.contains("RISK ON"));
        assert!(text.contains("500.00"));
        assert!(text.contains("480.00"));
        assert!(text.contains("ROE"));
        assert!(text.contains("EPS_Growth"));
        assert!(!text.contains("Volatility"));
        assert!(text.contains("0.877"));
        assert!(text.contains("25.34%"));
        assert!(text.contains("-1.20%"));
        assert!(text.contains(MISSING));
        assert!(text.contains("insufficient_history 1"));
        assert!(text.contains("As of 2024-06-28"));
    }

    #[test]
    fn pure_momentum_table_shows_volatility() {
        let text = render(&report(true, ScoringVariant::PureMomentum));
        assert!(text.contains("Volatility"));
        assert!(text.contains("1.23%"));
        assert!(!text.contains("FCF_Yield"));
    }

    #[test]
    fn risk_off_shows_no_exposure_instead_of_table() {
        let text = render(&report(false, ScoringVariant::Blended));
        assert!(text.contains("RISK OFF"));
        assert!(text.contains("NO EXPOSURE"));
        assert!(!text.contains("Ticker"));
        assert!(text.contains("As of 2024-06-28"));
    }

    #[test]
    fn warnings_are_printed_after_the_table() {
        let mut r = report(true, ScoringVariant::Blended);
        r.warnings.push("fundamentals unavailable for all 3 priced tickers".into());
        let text = render(&r);
        let table_at = text.find("Ticker").unwrap();
        let warning_at = text.find("WARNING: fundamentals unavailable").unwrap();
        assert!(warning_at > table_at);
    }

    #[test]
    fn insufficient_history_is_distinct_from_no_exposure() {
        let err = RunError::Regime(FactorError::InsufficientHistory {
            symbol: "SPY".into(),
            required: 210,
            available: 100,
        });
        let mut p = TablePresenter::new(Vec::new());
        p.present_failure(&err).unwrap();
        let text = String::from_utf8(p.into_inner()).unwrap();
        assert!(text.starts_with("INSUFFICIENT HISTORY"));
        assert!(!text.contains("NO EXPOSURE"));
    }

    #[test]
    fn percent_formatting() {
        assert_eq!(format_percent(Some(0.1234)), "12.34%");
        assert_eq!(format_percent(None), MISSING);
        assert_eq!(format_percent(Some(f64::NAN)), MISSING);
    }
}
