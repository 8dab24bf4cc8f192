//! Last-class state shared between the inference pass and its readers

use crate::Result;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::SystemTime;

/// Most recent published prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastClass {
    /// Published label
    pub label: String,

    /// Confidence of the winning class (0.0-1.0 for softmax models)
    pub score: f32,

    /// Monotonic publish counter, starting at 1
    pub sequence: u64,

    /// Publish time
    pub updated_at: SystemTime,
}

impl LastClass {
    /// Serialize as a single JSON line
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Single-slot cell holding the last published class
///
/// Cloning yields another handle to the same slot. There is one writer (the
/// inference session) and any number of readers. The slot is overwritten on
/// every publish and never cleared.
#[derive(Debug, Clone, Default)]
pub struct LastClassState {
    inner: Arc<RwLock<Option<LastClass>>>,
}

impl LastClassState {
    /// Create an empty slot
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the slot with a new label and score
    pub fn publish(&self, label: impl Into<String>, score: f32) -> u64 {
        let mut slot = self.inner.write();
        let sequence = slot.as_ref().map(|c| c.sequence + 1).unwrap_or(1);
        *slot = Some(LastClass {
            label: label.into(),
            score,
            sequence,
            updated_at: SystemTime::now(),
        });
        sequence
    }

    /// Snapshot of the slot
    pub fn get(&self) -> Option<LastClass> {
        self.inner.read().clone()
    }

    /// Last label, or an empty string before the first publish
    pub fn label(&self) -> String {
        self.inner
            .read()
            .as_ref()
            .map(|c| c.label.clone())
            .unwrap_or_default()
    }

    /// Number of publishes so far
    pub fn sequence(&self) -> u64 {
        self.inner.read().as_ref().map(|c| c.sequence).unwrap_or(0)
    }
}
