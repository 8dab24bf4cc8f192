//! Metrics collection and reporting

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Name of the per-outcome frame counter exported through the `metrics` facade
pub const FRAMES_TOTAL: &str = "framewatch_frames_total";

/// Name of the inference latency histogram exported through the `metrics` facade
pub const INFERENCE_LATENCY_US: &str = "framewatch_inference_latency_us";

/// Register descriptions for the exported metrics with the installed recorder
pub fn describe_metrics() {
    ::metrics::describe_counter!(FRAMES_TOTAL, "Frames seen by classification sessions, by outcome");
    ::metrics::describe_histogram!(
        INFERENCE_LATENCY_US,
        ::metrics::Unit::Microseconds,
        "Latency of one preprocessing + inference pass"
    );
}

/// Metrics collector for classification sessions
#[derive(Clone)]
pub struct MetricsCollector {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    frames_received: AtomicU64,
    frames_classified: AtomicU64,
    frames_failed: AtomicU64,
    frames_gated: AtomicU64,
    inference_latency_us: AtomicU64,
}

impl MetricsCollector {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner {
                frames_received: AtomicU64::new(0),
                frames_classified: AtomicU64::new(0),
                frames_failed: AtomicU64::new(0),
                frames_gated: AtomicU64::new(0),
                inference_latency_us: AtomicU64::new(0),
            }),
        }
    }

    /// Record a frame notification
    pub fn record_frame(&self) {
        self.inner.frames_received.fetch_add(1, Ordering::Relaxed);
        ::metrics::counter!(FRAMES_TOTAL, "outcome" => "received").increment(1);
    }

    /// Record a successful classification pass
    pub fn record_classified(&self, latency_us: u64) {
        self.inner.frames_classified.fetch_add(1, Ordering::Relaxed);
        self.inner
            .inference_latency_us
            .fetch_add(latency_us, Ordering::Relaxed);
        ::metrics::counter!(FRAMES_TOTAL, "outcome" => "classified").increment(1);
        ::metrics::histogram!(INFERENCE_LATENCY_US).record(latency_us as f64);
    }

    /// Record a pass whose label was replaced by the fallback label
    pub fn record_gated(&self) {
        self.inner.frames_gated.fetch_add(1, Ordering::Relaxed);
        ::metrics::counter!(FRAMES_TOTAL, "outcome" => "gated").increment(1);
    }

    /// Record a skipped (failed) pass
    pub fn record_failure(&self) {
        self.inner.frames_failed.fetch_add(1, Ordering::Relaxed);
        ::metrics::counter!(FRAMES_TOTAL, "outcome" => "failed").increment(1);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            frames_received: self.inner.frames_received.load(Ordering::Relaxed),
            frames_classified: self.inner.frames_classified.load(Ordering::Relaxed),
            frames_failed: self.inner.frames_failed.load(Ordering::Relaxed),
            frames_gated: self.inner.frames_gated.load(Ordering::Relaxed),
            inference_latency_us: self.inner.inference_latency_us.load(Ordering::Relaxed),
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of current metrics
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub frames_received: u64,
    pub frames_classified: u64,
    pub frames_failed: u64,
    pub frames_gated: u64,
    pub inference_latency_us: u64,
}

impl MetricsSnapshot {
    /// Calculate average inference latency per classified frame
    pub fn avg_latency_us(&self) -> u64 {
        if self.frames_classified == 0 {
            0
        } else {
            self.inference_latency_us / self.frames_classified
        }
    }

    /// Fraction of received frames that failed
    pub fn failure_rate(&self) -> f64 {
        if self.frames_received == 0 {
            0.0
        } else {
            self.frames_failed as f64 / self.frames_received as f64
        }
    }
}
