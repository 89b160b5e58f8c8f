//! FactorLab Core — domain types, indicators, regime gate, scoring, data providers.
//!
//! This crate contains the heart of the equity ranking pipeline:
//! - Domain types (price series, fundamentals, factor rows, ranked results)
//! - Series indicators (EMA, momentum, rolling volatility, percentile rank)
//! - Market regime gate on a benchmark's weekly close vs. its weekly EMA
//! - Scoring engine with blended and pure-momentum strategies
//! - Strategy configuration with validation and fingerprinting
//! - Universe data providers (Yahoo Finance, memoized, snapshot, synthetic, in-memory)

pub mod config;
pub mod data;
pub mod domain;
pub mod error;
pub mod indicators;
pub mod regime;
pub mod scoring;

pub use config::{ConfigError, FactorWeights, QualityThresholds, ScoringVariant, StrategyConfig};
pub use error::{Exclusion, FactorError};
pub use regime::{MarketRegimeFilter, Regime, RegimeDecision};
pub use scoring::{ScoringEngine, ScoringOutcome, ScoringStrategy};
