//! # Metrics Collector
//!
//! In-process aggregation engine behind the Performance Dashboard. Instrumented
//! code records counters, gauges and histogram observations into a
//! [`MetricsRegistry`]; a [`Sampler`] periodically takes immutable
//! [`Snapshot`]s into a bounded [`SnapshotHistory`]; the [`derived`]
//! calculators turn that history into dashboard-ready numbers.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  INSTRUMENTED CODE → REGISTRY → SNAPSHOT → HISTORY → DERIVED → PANELS   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use metrics_collector::{derived, MetricsRegistry};
//!
//! let registry = MetricsRegistry::new();
//! registry.increment_counter("http.requests", &[("status", "success")], 1.0);
//! registry.increment_counter("http.requests", &[("status", "error")], 1.0);
//! registry.observe_histogram("db.query_seconds", 0.3, &[]);
//!
//! let snapshot = registry.snapshot();
//! assert_eq!(snapshot.counter("http.requests{status=\"error\"}"), Some(1.0));
//! assert_eq!(derived::error_percentage_by_status(&snapshot, "http.requests"), 50.0);
//! ```

#![warn(rust_2018_idioms)]
#![warn(missing_debug_implementations)]

pub mod config;
pub mod derived;
pub mod error;
pub mod histogram;
pub mod history;
pub mod labels;
pub mod logging;
pub mod registry;
pub mod render;
pub mod sampler;
pub mod snapshot;
pub mod system;
pub mod timer;
pub mod timestamp;

pub use config::{CollectorConfig, LoggingConfig, RegistryConfig, SamplerConfig};
pub use error::{ConfigError, MetricsError, MetricsResult, SamplerError};
pub use histogram::{Histogram, HistogramStats};
pub use history::SnapshotHistory;
pub use labels::{filter_labels, series_key, Label, LabelKey, Labels};
pub use registry::MetricsRegistry;
pub use sampler::Sampler;
pub use snapshot::Snapshot;
pub use system::{SystemMetrics, SystemMetricsUpdate, SystemProbe};
pub use timer::{OwnedTimerHandle, TimerHandle};
pub use timestamp::Timestamp;

// ============================================================================
// CONSTANTS & VERSION INFORMATION
// ============================================================================

/// Crate version - follows semantic versioning
pub const COLLECTOR_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const COLLECTOR_NAME: &str = "metrics-collector";
pub const COLLECTOR_FULL_NAME: &str = "Activity Tracker Metrics Collector";

// ----------------------------------------------------------------------------
// Histogram Buckets
// ----------------------------------------------------------------------------

/// Finite histogram bucket upper bounds in seconds. An implicit `+Inf` bucket
/// follows the last entry.
pub const HISTOGRAM_BOUNDS: [f64; 9] = [0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0];

/// Number of histogram buckets including the `+Inf` overflow bucket.
pub const HISTOGRAM_BUCKETS: usize = HISTOGRAM_BOUNDS.len() + 1;

// ----------------------------------------------------------------------------
// Sampling & History
// ----------------------------------------------------------------------------

/// Default snapshot interval (milliseconds)
pub const DEFAULT_SAMPLE_INTERVAL_MS: u64 = 1000;

/// Minimum allowed snapshot interval (milliseconds)
pub const MIN_SAMPLE_INTERVAL_MS: u64 = 100;

/// Maximum allowed snapshot interval (milliseconds)
pub const MAX_SAMPLE_INTERVAL_MS: u64 = 60_000;

/// Default number of snapshots retained (five minutes at one per second)
pub const DEFAULT_HISTORY_CAPACITY: usize = 300;

/// Upper limit on retained snapshots
pub const MAX_HISTORY_CAPACITY: usize = 100_000;

// ----------------------------------------------------------------------------
// Labels
// ----------------------------------------------------------------------------

/// Labels carried inline before spilling to the heap. Every allowed key fits.
pub const INLINE_LABELS: usize = 8;
