//! Universe configuration — sector-organized ticker lists.
//!
//! Stored as TOML with one array of tickers per sector. The default universe is
//! the 72-name large-cap list the ranking was designed around.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::config::ConfigError;

/// The complete universe configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Universe {
    pub sectors: BTreeMap<String, Vec<String>>,
}

impl Universe {
    /// Load a universe from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml(&content)
    }

    /// Parse a universe from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let universe: Self =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        if universe.ticker_count() == 0 {
            return Err(ConfigError::EmptyUniverse);
        }
        Ok(universe)
    }

    /// All tickers across all sectors, deduplicated, in sorted order.
    pub fn all_tickers(&self) -> Vec<String> {
        self.sectors
            .values()
            .flatten()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Number of distinct tickers.
    pub fn ticker_count(&self) -> usize {
        self.all_tickers().len()
    }

    /// Default large-cap US universe.
    pub fn default_us() -> Self {
        let groups: [(&str, &[&str]); 9] = [
            (
                "MegaCap",
                &["AAPL", "MSFT", "GOOGL", "AMZN", "META", "NVDA", "TSLA"],
            ),
            (
                "Financials",
                &["JPM", "V", "MA", "ICE", "CME", "SPGI", "MCO", "MSCI", "FIS", "FICO", "NDAQ"],
            ),
            (
                "Healthcare",
                &[
                    "UNH", "JNJ", "ABBV", "MRK", "REGN", "VRTX", "BIIB", "IDXX", "IQV", "EW",
                    "ISRG", "DXCM",
                ],
            ),
            ("ConsumerStaples", &["PG", "KO", "PEP", "COST"]),
            ("Energy", &["XOM", "CVX"]),
            (
                "Software",
                &["ADBE", "ADSK", "INTU", "NOW", "SNPS", "CDNS", "TEAM", "MDB", "DDOG", "NET"],
            ),
            (
                "Semiconductors",
                &["AVGO", "AMAT", "LRCX", "KLAC", "MCHP", "ON", "MPWR", "QRVO", "SWKS"],
            ),
            (
                "Industrials",
                &["ROK", "PH", "ITW", "EMR", "ETN", "AME", "FAST", "GWW"],
            ),
            (
                "ConsumerDiscretionary",
                &["HD", "POOL", "ULTA", "ORLY", "AZO", "DPZ", "SBUX", "LOW", "TJX"],
            ),
        ];

        let sectors = groups
            .iter()
            .map(|(name, tickers)| {
                (
                    name.to_string(),
                    tickers.iter().map(|t| t.to_string()).collect(),
                )
            })
            .collect();

        Self { sectors }
    }

    /// Serialize the universe to TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

impl Default for Universe {
    fn default() -> Self {
        Self::default_us()
    }
}
