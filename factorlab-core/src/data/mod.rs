//! Data acquisition: provider trait, concrete providers, alignment, snapshot store.

pub mod align;
pub mod circuit_breaker;
pub mod memo;
pub mod memory;
pub mod provider;
pub mod store;
pub mod synthetic;
pub mod universe;
pub mod yahoo;

pub use align::{align_series, complete_columns, AlignedCloses};
pub use circuit_breaker::{BreakerPolicy, BreakerState, CircuitBreaker, TripCause};
pub use memo::{MemoizedProvider, DEFAULT_TTL};
pub use memory::InMemoryProvider;
pub use provider::{DataError, FetchWindow, LookbackPeriod, UniverseDataProvider};
pub use store::{CaptureSummary, SnapshotMeta, SnapshotProvider, SnapshotStore};
pub use synthetic::SyntheticProvider;
pub use universe::Universe;
pub use yahoo::YahooProvider;
