//! Ranked selection output.

use serde::{Deserialize, Serialize};

use super::factor::FactorRow;
use crate::config::ScoringVariant;

/// One selected ticker with its composite score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedRow {
    /// 1-based position in the ranking.
    pub rank: usize,
    pub symbol: String,
    pub score: f64,
    pub factors: FactorRow,
}

/// Top-N selection, sorted by descending score with ties broken by symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    pub variant: ScoringVariant,
    pub rows: Vec<RankedRow>,
}

impl RankedResult {
    pub fn empty(variant: ScoringVariant) -> Self {
        Self {
            variant,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn symbols(&self) -> Vec<&str> {
        self.rows.iter().map(|r| r.symbol.as_str()).collect()
    }
}
