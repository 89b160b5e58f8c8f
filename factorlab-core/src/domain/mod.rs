//! Domain types for FactorLab.

pub mod factor;
pub mod fundamentals;
pub mod ranked;
pub mod series;

pub use factor::{Factor, FactorRow};
pub use fundamentals::FundamentalRecord;
pub use ranked::{RankedResult, RankedRow};
pub use series::{weekdays_from, PricePoint, PriceSeries, SeriesError};

/// Ticker symbol type alias.
pub type Symbol = String;
