//! Factor pipeline error taxonomy.
//!
//! The same variants are fatal at the regime level (the run stops) and merely
//! exclusionary at the per-ticker level (the ticker is dropped from the
//! candidate set).

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FactorError {
    #[error("insufficient history for '{symbol}': need {required} observations, have {available}")]
    InsufficientHistory {
        symbol: String,
        required: usize,
        available: usize,
    },

    #[error("missing data for '{symbol}': {detail}")]
    MissingData { symbol: String, detail: String },

    #[error("undefined ratio for '{symbol}': {detail}")]
    DivisionUndefined { symbol: String, detail: String },

    #[error("provider failure for '{symbol}': {reason}")]
    ProviderFailure { symbol: String, reason: String },
}

impl FactorError {
    pub fn symbol(&self) -> &str {
        match self {
            FactorError::InsufficientHistory { symbol, .. }
            | FactorError::MissingData { symbol, .. }
            | FactorError::DivisionUndefined { symbol, .. }
            | FactorError::ProviderFailure { symbol, .. } => symbol,
        }
    }

    /// Short machine-readable label.
    pub fn kind(&self) -> &'static str {
        match self {
            FactorError::InsufficientHistory { .. } => "insufficient_history",
            FactorError::MissingData { .. } => "missing_data",
            FactorError::DivisionUndefined { .. } => "division_undefined",
            FactorError::ProviderFailure { .. } => "provider_failure",
        }
    }

    pub(crate) fn missing(symbol: &str, detail: impl Into<String>) -> Self {
        FactorError::MissingData {
            symbol: symbol.to_string(),
            detail: detail.into(),
        }
    }

    pub(crate) fn undefined(symbol: &str, detail: impl Into<String>) -> Self {
        FactorError::DivisionUndefined {
            symbol: symbol.to_string(),
            detail: detail.into(),
        }
    }
}

/// A ticker dropped from the candidate set, with the reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exclusion {
    pub symbol: String,
    pub reason: FactorError,
}

impl From<FactorError> for Exclusion {
    fn from(reason: FactorError) -> Self {
        Self {
            symbol: reason.symbol().to_string(),
            reason,
        }
    }
}
