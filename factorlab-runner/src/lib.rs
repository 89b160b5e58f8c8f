//! FactorLab Runner — run configuration, pipeline orchestration, presentation, export.
//!
//! This crate builds on `factorlab-core` to provide:
//! - `RunConfig` loading (strategy plus data-source settings from one TOML file)
//! - The `Pipeline` that sequences regime gate → universe fetch → scoring
//! - Terminal presentation of rankings, risk-off and failure states
//! - JSON, CSV and Markdown export of run reports

pub mod config;
pub mod export;
pub mod orchestrator;
pub mod presenter;

pub use config::{DataConfig, RunConfig};
pub use export::{
    export_csv, export_json, export_markdown, import_json, load_report, write_output, ExportError,
};
pub use orchestrator::{Pipeline, PipelineReport, RunError, SCHEMA_VERSION};
pub use presenter::{ResultPresenter, TablePresenter};
