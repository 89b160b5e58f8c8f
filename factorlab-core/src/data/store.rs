//! Offline snapshot store with Hive-style partitioning.
//!
//! Layout:
//! - `{root}/symbol={SYMBOL}/prices.parquet` (columns `date`, `close`)
//! - `{root}/symbol={SYMBOL}/meta.json` (date range, point count, BLAKE3 data hash)
//! - `{root}/fundamentals.json` (symbol → record)
//!
//! Writes are atomic (write to .tmp, rename into place). Loads validate the
//! schema and the data hash recorded in the sidecar.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::provider::{DataError, FetchWindow, UniverseDataProvider};
use crate::domain::{FundamentalRecord, PricePoint, PriceSeries, Symbol};

const PRICES_FILE: &str = "prices.parquet";
const META_FILE: &str = "meta.json";
const FUNDAMENTALS_FILE: &str = "fundamentals.json";

/// Metadata sidecar for a stored symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMeta {
    pub symbol: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub point_count: usize,
    pub data_hash: String,
    pub source: String,
    pub captured_at: chrono::NaiveDateTime,
}

/// Outcome of capturing a universe into the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaptureSummary {
    pub series_written: usize,
    pub series_failed: Vec<Symbol>,
    pub fundamentals_written: usize,
}

/// Directory of Parquet price series plus a fundamentals file.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    root: PathBuf,
}

impl SnapshotStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn symbol_dir(&self, symbol: &str) -> PathBuf {
        self.root.join(format!("symbol={symbol}"))
    }

    fn meta_path(&self, symbol: &str) -> PathBuf {
        self.symbol_dir(symbol).join(META_FILE)
    }

    fn fundamentals_path(&self) -> PathBuf {
        self.root.join(FUNDAMENTALS_FILE)
    }

    /// Write a series and its sidecar, replacing any previous snapshot.
    pub fn write_series(&self, series: &PriceSeries, source: &str) -> Result<SnapshotMeta, DataError> {
        let (first, last) = match (series.first(), series.last()) {
            (Some(f), Some(l)) => (f.date, l.date),
            _ => {
                return Err(DataError::Store(format!(
                    "no points to store for '{}'",
                    series.symbol()
                )))
            }
        };

        let dir = self.symbol_dir(series.symbol());
        fs::create_dir_all(&dir)
            .map_err(|e| DataError::Store(format!("failed to create dir: {e}")))?;

        let df = series_to_dataframe(series)?;
        let path = dir.join(PRICES_FILE);
        let tmp_path = path.with_extension("parquet.tmp");
        write_parquet(&df, &tmp_path)?;
        atomic_rename(&tmp_path, &path)?;

        let meta = SnapshotMeta {
            symbol: series.symbol().to_string(),
            start_date: first,
            end_date: last,
            point_count: series.len(),
            data_hash: series_hash(series),
            source: source.to_string(),
            captured_at: chrono::Local::now().naive_local(),
        };
        let meta_json = serde_json::to_string_pretty(&meta)
            .map_err(|e| DataError::Store(format!("meta serialization: {e}")))?;
        write_atomic(&self.meta_path(series.symbol()), meta_json.as_bytes())?;

        Ok(meta)
    }

    /// Load a stored series, verifying it against its sidecar hash.
    pub fn load_series(&self, symbol: &str) -> Result<PriceSeries, DataError> {
        let path = self.symbol_dir(symbol).join(PRICES_FILE);
        if !path.exists() {
            return Err(DataError::NoSnapshot {
                symbol: symbol.to_string(),
            });
        }

        let series = load_and_validate_parquet(symbol, &path)?;
        if let Some(meta) = self.meta(symbol) {
            let hash = series_hash(&series);
            if hash != meta.data_hash {
                return Err(DataError::Store(format!(
                    "data hash mismatch for '{symbol}': sidecar {} vs file {hash}",
                    meta.data_hash
                )));
            }
        }
        Ok(series)
    }

    /// Sidecar for a stored symbol, if present and readable.
    pub fn meta(&self, symbol: &str) -> Option<SnapshotMeta> {
        let content = fs::read_to_string(self.meta_path(symbol)).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Symbols with a stored price series, sorted.
    pub fn symbols(&self) -> Result<Vec<Symbol>, DataError> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let entries =
            fs::read_dir(&self.root).map_err(|e| DataError::Store(format!("read dir: {e}")))?;

        let mut symbols = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| DataError::Store(format!("dir entry: {e}")))?;
            let name = entry.file_name();
            if let Some(symbol) = name.to_str().and_then(|n| n.strip_prefix("symbol=")) {
                if entry.path().join(PRICES_FILE).exists() {
                    symbols.push(symbol.to_string());
                }
            }
        }
        symbols.sort();
        Ok(symbols)
    }

    pub fn write_fundamentals(
        &self,
        records: &BTreeMap<Symbol, FundamentalRecord>,
    ) -> Result<(), DataError> {
        fs::create_dir_all(&self.root)
            .map_err(|e| DataError::Store(format!("failed to create dir: {e}")))?;
        let json = serde_json::to_string_pretty(records)
            .map_err(|e| DataError::Store(format!("fundamentals serialization: {e}")))?;
        write_atomic(&self.fundamentals_path(), json.as_bytes())
    }

    /// Stored fundamentals; an absent file is an empty map.
    pub fn load_fundamentals(&self) -> Result<BTreeMap<Symbol, FundamentalRecord>, DataError> {
        let path = self.fundamentals_path();
        if !path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = fs::read_to_string(&path)
            .map_err(|e| DataError::Store(format!("read fundamentals: {e}")))?;
        serde_json::from_str(&content)
            .map_err(|e| DataError::Store(format!("parse fundamentals: {e}")))
    }

    /// Fetch every ticker from `provider` and store it.
    ///
    /// Price series are stored raw (before completeness filtering) so a later
    /// offline run applies the same alignment as an online one. Fundamentals
    /// are captured only when `with_fundamentals` is set.
    pub fn capture(
        &self,
        provider: &dyn UniverseDataProvider,
        tickers: &[Symbol],
        window: FetchWindow,
        with_fundamentals: bool,
    ) -> Result<CaptureSummary, DataError> {
        let mut summary = CaptureSummary::default();

        for symbol in tickers {
            match provider.fetch_series(symbol, window) {
                Ok(series) if !series.is_empty() => {
                    self.write_series(&series, provider.name())?;
                    summary.series_written += 1;
                }
                Ok(_) => summary.series_failed.push(symbol.clone()),
                Err(e) => {
                    warn!(symbol = %symbol, error = %e, "snapshot fetch failed");
                    summary.series_failed.push(symbol.clone());
                }
            }
        }

        if with_fundamentals {
            let records = provider.get_fundamentals(tickers);
            summary.fundamentals_written = records.len();
            self.write_fundamentals(&records)?;
        }

        info!(
            root = %self.root.display(),
            written = summary.series_written,
            failed = summary.series_failed.len(),
            fundamentals = summary.fundamentals_written,
            "snapshot captured"
        );
        Ok(summary)
    }
}

/// Provider that serves a previously captured snapshot.
#[derive(Debug, Clone)]
pub struct SnapshotProvider {
    store: SnapshotStore,
    fundamentals: BTreeMap<Symbol, FundamentalRecord>,
}

impl SnapshotProvider {
    pub fn open(store: SnapshotStore) -> Result<Self, DataError> {
        let fundamentals = store.load_fundamentals()?;
        Ok(Self {
            store,
            fundamentals,
        })
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }
}

impl UniverseDataProvider for SnapshotProvider {
    fn name(&self) -> &str {
        "snapshot"
    }

    fn fetch_series(&self, symbol: &str, window: FetchWindow) -> Result<PriceSeries, DataError> {
        let series = self.store.load_series(symbol)?;
        Ok(series.between(window.start, window.end))
    }

    fn fetch_fundamentals(&self, symbol: &str) -> Result<FundamentalRecord, DataError> {
        self.fundamentals
            .get(symbol)
            .copied()
            .ok_or_else(|| DataError::NoSnapshot {
                symbol: symbol.to_string(),
            })
    }
}

/// BLAKE3 over dates and close bits, in order.
fn series_hash(series: &PriceSeries) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(series.symbol().as_bytes());
    for p in series.points() {
        hasher.update(p.date.to_string().as_bytes());
        hasher.update(&p.close.to_le_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

fn atomic_rename(tmp_path: &Path, path: &Path) -> Result<(), DataError> {
    fs::rename(tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(tmp_path);
        DataError::Store(format!("atomic rename failed: {e}"))
    })
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), DataError> {
    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, bytes).map_err(|e| DataError::Store(format!("write: {e}")))?;
    atomic_rename(&tmp_path, path)
}

// ── Parquet I/O helpers ─────────────────────────────────────────────

fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default()
}

fn series_to_dataframe(series: &PriceSeries) -> Result<DataFrame, DataError> {
    let epoch = epoch();
    let dates: Vec<i32> = series
        .points()
        .iter()
        .map(|p| (p.date - epoch).num_days() as i32)
        .collect();
    let closes: Vec<f64> = series.closes();

    DataFrame::new(vec![
        Column::new("date".into(), dates)
            .cast(&DataType::Date)
            .map_err(|e| DataError::Parquet(format!("date cast: {e}")))?,
        Column::new("close".into(), closes),
    ])
    .map_err(|e| DataError::Parquet(format!("dataframe creation: {e}")))
}

fn write_parquet(df: &DataFrame, path: &Path) -> Result<(), DataError> {
    let file = fs::File::create(path).map_err(|e| DataError::Parquet(format!("create file: {e}")))?;
    ParquetWriter::new(file)
        .finish(&mut df.clone())
        .map_err(|e| DataError::Parquet(format!("write parquet: {e}")))?;
    Ok(())
}

fn load_and_validate_parquet(symbol: &str, path: &Path) -> Result<PriceSeries, DataError> {
    let file = fs::File::open(path).map_err(|e| DataError::Parquet(format!("open: {e}")))?;
    let df = ParquetReader::new(file)
        .finish()
        .map_err(|e| DataError::Parquet(format!("read: {e}")))?;

    if df.height() == 0 {
        return Err(DataError::Store(format!("empty snapshot for '{symbol}'")));
    }

    let map_err = |e: PolarsError| DataError::Parquet(format!("column read: {e}"));
    let dates = df.column("date").map_err(map_err)?;
    let closes = df.column("close").map_err(map_err)?;

    let date_ca = dates
        .date()
        .map_err(|e| DataError::Parquet(format!("date column type: {e}")))?;
    let close_ca = closes
        .f64()
        .map_err(|e| DataError::Parquet(format!("close column type: {e}")))?;

    let epoch = epoch();
    let mut points = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let days = date_ca
            .get(i)
            .ok_or_else(|| DataError::Parquet(format!("null date at row {i}")))?;
        points.push(PricePoint::new(
            epoch + chrono::Duration::days(days as i64),
            close_ca.get(i).unwrap_or(f64::NAN),
        ));
    }

    Ok(PriceSeries::new(symbol, points)?)
}
