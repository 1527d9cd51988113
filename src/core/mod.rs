//! Core normalization and aggregation engine

pub mod asset;
pub mod assembler;
pub mod batch;
pub mod config;
pub mod history;
pub mod log;
pub mod metrics;
pub mod normalize;
pub mod sanitize;
pub mod snapshot;

// Re-export main types for cleaner imports
pub use asset::{AssetClass, AssetRecord, DividendEvent, Indicators, YearlyDividend};
pub use batch::{AssetFailure, AssetOutcome, BatchOptions, Collector};
pub use normalize::PercentScale;
pub use snapshot::{DailyBar, ProviderSnapshot, RawValue, SnapshotProvider};
