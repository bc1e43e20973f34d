//! fuse-bench-common - Shared types and utilities
//!
//! This crate provides the types shared by the provisioner and the runner,
//! without any AWS SDK dependencies to keep it lightweight.
//!
//! ## Modules
//!
//! - [`params`]: Benchmark parameter set and test-case identifier
//! - [`defaults`]: Default configuration values and object key names
//! - [`retry`]: Bounded fixed-delay retry policy
//! - [`report`]: Per-iteration results aggregated into a run report
//! - [`stats`]: Metric statistics (avg/stddev/min/max)
//! - [`fio`]: fio JSON output model and derived metrics
//! - [`summary`]: CSV results summary
//! - [`tags`]: AWS resource tag constants for discovery

pub mod defaults;
pub mod fio;
pub mod params;
pub mod report;
pub mod retry;
pub mod stats;
pub mod summary;
pub mod tags;

// Re-export commonly used types
pub use fio::{FioMetrics, FioOutput, FioParseError, LatencyMetrics};
pub use params::{BenchParams, IoKind, ParamsError};
pub use report::{IterationResult, RunReport};
pub use retry::RetryPolicy;
pub use stats::MetricStats;
