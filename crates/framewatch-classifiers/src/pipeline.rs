//! Inference pipeline
//!
//! One pass takes a frame through preprocessing, the model and label
//! selection. An [`InferenceSession`] wraps the pass with what a running
//! classification loop needs: the cached target size, threshold gating,
//! publishing to the last-class slot, and per-frame error isolation.

use crate::classifier::{Classification, ImageModel};
use crate::config::MonitorSettings;
use crate::preprocess;
use framewatch_core::{Error, Frame, LastClassState, Result};
use framewatch_telemetry::MetricsCollector;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Classify one frame
///
/// `target_size` is the model's input edge length and `labels` the label
/// table, index-aligned with the model's score vector.
pub fn classify(
    frame: &Frame,
    model: &dyn ImageModel,
    target_size: usize,
    labels: &[String],
) -> Result<Classification> {
    let start = Instant::now();

    let batch = preprocess::prepare(frame, target_size)?;
    let scores = model.predict(&batch)?;

    let mut result = Classification::from_scores(scores, labels)?;
    result.latency_us = start.elapsed().as_micros() as u64;
    Ok(result)
}

/// Threshold gating applied after classification
#[derive(Debug, Clone, PartialEq)]
pub struct Gate {
    pub enabled: bool,
    pub threshold: f32,
    pub fallback_label: String,
}

impl Gate {
    /// Gate configured from monitor settings
    pub fn from_settings(settings: &MonitorSettings) -> Self {
        Self {
            enabled: settings.gate_below_threshold,
            threshold: settings.threshold,
            fallback_label: settings.fallback_label.clone(),
        }
    }

    /// Replace the label with the fallback when the score is below threshold
    pub fn apply(&self, result: &mut Classification) {
        if self.enabled && !result.exceeds_threshold(self.threshold) {
            debug!(
                label = %result.label,
                score = result.score,
                threshold = self.threshold,
                "Prediction below threshold"
            );
            result.label = self.fallback_label.clone();
            result.gated = true;
        }
    }
}

/// A running classification session bound to one model
pub struct InferenceSession {
    model: Arc<dyn ImageModel>,
    target_size: usize,
    labels: Vec<String>,
    gate: Gate,
    state: LastClassState,
    metrics: MetricsCollector,
}

impl InferenceSession {
    /// Create a session; the model's input size is read once here
    pub fn new(
        model: Arc<dyn ImageModel>,
        settings: &MonitorSettings,
        state: LastClassState,
        metrics: MetricsCollector,
    ) -> Result<Self> {
        let target_size = match model.input_size() {
            Some(size) if size > 0 => size,
            Some(_) => {
                return Err(Error::config(format!(
                    "model '{}' declares a zero input size",
                    model.name()
                )))
            }
            None => {
                return Err(Error::config(format!(
                    "model '{}' does not declare an input size",
                    model.name()
                )))
            }
        };

        let labels = match &settings.labels {
            Some(labels) => {
                let expected = model.labels().len();
                if labels.len() != expected {
                    return Err(Error::config(format!(
                        "label override has {} entries, model '{}' scores {} classes",
                        labels.len(),
                        model.name(),
                        expected
                    )));
                }
                labels.clone()
            }
            None => model.labels(),
        };
        if labels.is_empty() {
            return Err(Error::config("label table is empty"));
        }

        Ok(Self {
            model,
            target_size,
            labels,
            gate: Gate::from_settings(settings),
            state,
            metrics,
        })
    }

    /// Edge length frames are resized to
    pub fn target_size(&self) -> usize {
        self.target_size
    }

    /// Label table in use
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Model this session runs
    pub fn model(&self) -> &Arc<dyn ImageModel> {
        &self.model
    }

    /// Run one pass and publish its result
    pub fn run_pass(&self, frame: &Frame) -> Result<Classification> {
        let mut result = classify(frame, self.model.as_ref(), self.target_size, &self.labels)?;
        self.gate.apply(&mut result);

        self.state.publish(result.label.clone(), result.score);
        self.metrics.record_classified(result.latency_us);
        if result.gated {
            self.metrics.record_gated();
        }

        info!(
            "Prediction: {} at {:.2}% probability",
            result.label,
            result.percent()
        );
        Ok(result)
    }

    /// Frame-modified handler: run a pass, logging and skipping failures
    pub fn on_frame(&self, frame: &Frame) {
        self.metrics.record_frame();

        if let Err(e) = self.run_pass(frame) {
            self.metrics.record_failure();
            if e.is_per_frame() {
                warn!(source = %frame.source(), error = %e, "Skipping frame, last class retained");
            } else {
                error!(source = %frame.source(), error = %e, "Classification pass failed");
            }
        }
    }
}
