//! FactorLab CLI — regime-gated equity ranking.
//!
//! Commands:
//! - `rank` — evaluate the market regime and, if risk-on, rank the universe
//! - `snapshot` — capture benchmark, universe prices and fundamentals to disk
//! - `universe` — print the default universe as TOML
//!
//! Exit codes: 0 for a ranking or a risk-off result, 2 when the regime gate
//! could not be evaluated, 1 for any other failure.

mod logging;

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;

use factorlab_core::data::{
    CircuitBreaker, LookbackPeriod, MemoizedProvider, SnapshotProvider, SnapshotStore,
    SyntheticProvider, Universe, UniverseDataProvider, YahooProvider,
};
use factorlab_core::ScoringVariant;
use factorlab_runner::{
    export_csv, export_json, export_markdown, write_output, Pipeline, ResultPresenter, RunConfig,
    TablePresenter,
};

#[derive(Parser)]
#[command(
    name = "factorlab",
    about = "FactorLab CLI — market-regime-gated equity scoring and ranking"
)]
struct Cli {
    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true, default_value_t = false)]
    log_json: bool,

    /// Debug-level logging (ignored when RUST_LOG is set).
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate the regime gate and rank the universe.
    Rank {
        /// Path to a TOML run config.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Universe TOML (sector tables), replacing the configured universe.
        #[arg(long)]
        universe: Option<PathBuf>,

        /// Scoring variant: blended or pure_momentum.
        #[arg(long)]
        variant: Option<ScoringVariant>,

        /// Number of stocks to select.
        #[arg(long)]
        top: Option<usize>,

        /// Run date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        as_of: Option<NaiveDate>,

        /// Serve all data from the snapshot store.
        #[arg(long, default_value_t = false, conflicts_with = "synthetic")]
        offline: bool,

        /// Use deterministic synthetic data.
        #[arg(long, default_value_t = false)]
        synthetic: bool,

        /// Snapshot store directory.
        #[arg(long, default_value = "data")]
        store: PathBuf,

        /// Output format.
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,

        /// Write output to a file instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Capture benchmark, universe prices and fundamentals into the store.
    Snapshot {
        /// Path to a TOML run config.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Snapshot store directory.
        #[arg(long, default_value = "data")]
        store: PathBuf,

        /// Capture synthetic data instead of fetching.
        #[arg(long, default_value_t = false)]
        synthetic: bool,

        /// Run date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },
    /// Print the default universe as TOML.
    Universe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Csv,
    Markdown,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.log_json, cli.verbose);

    let outcome = match cli.command {
        Commands::Rank {
            config,
            universe,
            variant,
            top,
            as_of,
            offline,
            synthetic,
            store,
            format,
            output,
        } => {
            let opts = RankOptions {
                variant,
                top,
                as_of: as_of.unwrap_or_else(today),
                offline,
                synthetic,
                store,
                format,
                output,
            };
            load_config(config.as_deref(), universe.as_deref())
                .and_then(|config| run_rank(&config, &opts))
        }
        Commands::Snapshot {
            config,
            store,
            synthetic,
            as_of,
        } => load_config(config.as_deref(), None).and_then(|config| {
            run_snapshot(&config, &store, synthetic, as_of.unwrap_or_else(today))
        }),
        Commands::Universe => run_universe(),
    };

    match outcome {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

fn load_config(path: Option<&Path>, universe: Option<&Path>) -> Result<RunConfig> {
    let mut config = match path {
        Some(p) => RunConfig::from_file(p)
            .with_context(|| format!("failed to load config {}", p.display()))?,
        None => RunConfig::default(),
    };
    if let Some(u) = universe {
        let universe = Universe::from_file(u)
            .with_context(|| format!("failed to load universe {}", u.display()))?;
        config.strategy.universe = universe.all_tickers();
    }
    Ok(config)
}

/// Live provider chain: Yahoo behind a circuit breaker, memoized.
fn live_provider(config: &RunConfig) -> Result<Box<dyn UniverseDataProvider>> {
    let breaker = Arc::new(CircuitBreaker::new(config.data.breaker_policy()));
    let yahoo = YahooProvider::new(breaker).context("failed to build HTTP client")?;
    Ok(Box::new(MemoizedProvider::with_ttl(
        yahoo,
        config.data.cache_ttl(),
    )))
}

struct RankOptions {
    variant: Option<ScoringVariant>,
    top: Option<usize>,
    as_of: NaiveDate,
    offline: bool,
    synthetic: bool,
    store: PathBuf,
    format: OutputFormat,
    output: Option<PathBuf>,
}

fn run_rank(config: &RunConfig, opts: &RankOptions) -> Result<ExitCode> {
    let mut config = config.clone();
    if let Some(v) = opts.variant {
        config.strategy.variant = v;
    }
    if let Some(n) = opts.top {
        config.strategy.n_stocks = n;
    }

    let provider: Box<dyn UniverseDataProvider> = if opts.synthetic {
        Box::new(SyntheticProvider::new())
    } else if opts.offline {
        let store = SnapshotStore::new(&opts.store);
        Box::new(SnapshotProvider::open(store).context("failed to open snapshot store")?)
    } else {
        live_provider(&config)?
    };
    info!(
        provider = provider.name(),
        variant = %config.strategy.variant,
        universe = config.strategy.universe.len(),
        as_of = %opts.as_of,
        "starting run"
    );

    let report = match Pipeline::new(&config, provider.as_ref()).run(opts.as_of) {
        Ok(report) => report,
        Err(e) => {
            let mut presenter = TablePresenter::new(io::stderr().lock());
            presenter.present_failure(&e)?;
            return Ok(if e.is_regime_failure() {
                ExitCode::from(2)
            } else {
                ExitCode::from(1)
            });
        }
    };

    let rendered = match opts.format {
        OutputFormat::Table => {
            let mut presenter = TablePresenter::new(Vec::new());
            presenter.present(&report)?;
            String::from_utf8(presenter.into_inner()).context("table output is not UTF-8")?
        }
        OutputFormat::Json => export_json(&report)?,
        OutputFormat::Csv => export_csv(&report)?,
        OutputFormat::Markdown => export_markdown(&report),
    };

    match &opts.output {
        Some(path) => {
            write_output(path, &rendered)?;
            info!(path = %path.display(), "output written");
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(rendered.as_bytes())?;
            stdout.flush()?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn run_snapshot(
    config: &RunConfig,
    store_dir: &Path,
    synthetic: bool,
    as_of: NaiveDate,
) -> Result<ExitCode> {
    config.validate()?;
    let provider: Box<dyn UniverseDataProvider> = if synthetic {
        Box::new(SyntheticProvider::new())
    } else {
        live_provider(config)?
    };
    let store = SnapshotStore::new(store_dir);

    let benchmark_window = LookbackPeriod::Years(config.data.benchmark_years).window(as_of);
    let bench = store.capture(
        provider.as_ref(),
        std::slice::from_ref(&config.data.benchmark),
        benchmark_window,
        false,
    )?;
    if !bench.series_failed.is_empty() {
        eprintln!("benchmark {} could not be captured", config.data.benchmark);
        return Ok(ExitCode::from(2));
    }

    let price_window = LookbackPeriod::Years(config.data.price_years).window(as_of);
    let summary = store.capture(
        provider.as_ref(),
        &config.strategy.universe,
        price_window,
        true,
    )?;

    println!(
        "Captured {} series ({} failed), {} fundamentals into {}",
        summary.series_written + bench.series_written,
        summary.series_failed.len(),
        summary.fundamentals_written,
        store_dir.display()
    );
    for symbol in &summary.series_failed {
        eprintln!("  failed: {symbol}");
    }
    Ok(ExitCode::SUCCESS)
}

fn run_universe() -> Result<ExitCode> {
    print!("{}", Universe::default_us().to_toml()?);
    Ok(ExitCode::SUCCESS)
}
