//! framewatch Telemetry
//!
//! Metrics for classification sessions: per-session atomic counters plus
//! counters and histograms exported through the `metrics` facade, picked up
//! by whatever recorder the host installs.

pub mod metrics;

pub use crate::metrics::{describe_metrics, MetricsCollector, MetricsSnapshot};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::metrics::{MetricsCollector, MetricsSnapshot};
}
