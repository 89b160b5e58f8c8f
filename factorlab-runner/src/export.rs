//! Report export — JSON, CSV, and Markdown.
//!
//! - **JSON**: the full `PipelineReport`, schema-versioned. Newer versions
//!   are rejected on load.
//! - **CSV**: the ranked rows with the variant's factor columns.
//! - **Markdown**: a human-readable summary with the regime banner.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::orchestrator::{PipelineReport, SCHEMA_VERSION};
use crate::presenter::format_percent;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("unsupported schema version {found} (max supported: {supported})")]
    UnsupportedSchema { found: u32, supported: u32 },
    #[error("CSV output is not valid UTF-8")]
    Utf8,
}

// ─── JSON ───────────────────────────────────────────────────────────

pub fn export_json(report: &PipelineReport) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// Deserialize a report, rejecting schema versions newer than this build.
pub fn import_json(json: &str) -> Result<PipelineReport, ExportError> {
    let report: PipelineReport = serde_json::from_str(json)?;
    if report.schema_version > SCHEMA_VERSION {
        return Err(ExportError::UnsupportedSchema {
            found: report.schema_version,
            supported: SCHEMA_VERSION,
        });
    }
    Ok(report)
}

// ─── CSV ────────────────────────────────────────────────────────────

/// Ranked rows as CSV.
///
/// Columns: rank, ticker, score, then the variant's factor columns as raw
/// ratios. Missing values are empty cells.
pub fn export_csv(report: &PipelineReport) -> Result<String, ExportError> {
    let factors = report.variant.factor_columns();
    let mut wtr = csv::Writer::from_writer(vec![]);

    let mut header = vec!["Rank", "Ticker", "Score"];
    header.extend(factors.iter().map(|f| f.column_name()));
    wtr.write_record(&header)?;

    for row in &report.ranked.rows {
        let mut record = vec![
            row.rank.to_string(),
            row.symbol.clone(),
            format!("{:.6}", row.score),
        ];
        record.extend(factors.iter().map(|f| {
            row.factors
                .value(*f)
                .filter(|v| v.is_finite())
                .map(|v| format!("{v:.6}"))
                .unwrap_or_default()
        }));
        wtr.write_record(&record)?;
    }

    let data = wtr
        .into_inner()
        .map_err(|e| ExportError::Csv(e.into_error().into()))?;
    String::from_utf8(data).map_err(|_| ExportError::Utf8)
}

// ─── Markdown ───────────────────────────────────────────────────────

pub fn export_markdown(report: &PipelineReport) -> String {
    let factors = report.variant.factor_columns();
    let d = &report.decision;
    let mut md = String::with_capacity(1024);

    md.push_str("# FactorLab Ranking\n\n");
    md.push_str("| Field | Value |\n| --- | --- |\n");
    md.push_str(&format!("| As of | {} |\n", report.as_of));
    md.push_str(&format!("| Variant | {} |\n", report.variant));
    md.push_str(&format!(
        "| {} weekly close | {:.2} (week ending {}) |\n",
        report.benchmark, d.last_value, d.week_ending
    ));
    md.push_str(&format!("| Weekly EMA | {:.2} |\n", d.last_ema));
    md.push_str(&format!("| Regime | **{}** |\n", d.regime()));
    md.push_str(&format!(
        "| Universe | {} priced of {} |\n",
        report.priced_count, report.universe_size
    ));
    md.push_str(&format!("| Config | `{}` |\n\n", report.config_fingerprint));
    for warning in &report.warnings {
        md.push_str(&format!("> **Warning:** {warning}\n\n"));
    }

    if !report.has_exposure() {
        md.push_str("No exposure: the strategy holds no stocks while risk-off.\n");
        return md;
    }

    md.push_str("| # | Ticker | Score |");
    for f in factors {
        md.push_str(&format!(" {} |", f.column_name()));
    }
    md.push_str("\n| --- | --- | --- |");
    md.push_str(&" --- |".repeat(factors.len()));
    md.push('\n');
    for row in &report.ranked.rows {
        md.push_str(&format!("| {} | {} | {:.3} |", row.rank, row.symbol, row.score));
        for f in factors {
            md.push_str(&format!(" {} |", format_percent(row.factors.value(*f))));
        }
        md.push('\n');
    }

    if !report.excluded.is_empty() {
        md.push_str("\n## Excluded\n\n");
        for e in &report.excluded {
            md.push_str(&format!("- {}: {}\n", e.symbol, e.reason));
        }
    }
    md
}

// ─── Files ──────────────────────────────────────────────────────────

/// Write `content` to `path`, creating parent directories.
pub fn write_output(path: &Path, content: &str) -> Result<(), ExportError> {
    let io_err = |source: std::io::Error| ExportError::Io {
        path: path.display().to_string(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    fs::write(path, content).map_err(io_err)
}

pub fn load_report(path: &Path) -> Result<PipelineReport, ExportError> {
    let json = fs::read_to_string(path).map_err(|source| ExportError::Io {
        path: path.display().to_string(),
        source,
    })?;
    import_json(&json)
}
