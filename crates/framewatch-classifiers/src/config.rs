//! Configuration for the classification monitor

use framewatch_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Settings shared by the controller, the inference session and the poller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorSettings {
    /// Minimum top score for a prediction to be published as-is
    pub threshold: f32,

    /// Replace below-threshold predictions with `fallback_label`
    pub gate_below_threshold: bool,

    /// Label published for gated predictions
    pub fallback_label: String,

    /// Label poller period in milliseconds
    pub poll_interval_ms: u64,

    /// Label table override; the model's own labels are used when unset
    pub labels: Option<Vec<String>>,

    /// Model to load on startup
    pub model_path: Option<PathBuf>,

    /// Forward every poll to the sink, not only label changes
    pub emit_unchanged: bool,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            gate_below_threshold: true,
            fallback_label: "None".to_string(),
            poll_interval_ms: 100,
            labels: None,
            model_path: None,
            emit_unchanged: false,
        }
    }
}

impl MonitorSettings {
    /// Load from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let settings: Self = serde_yaml::from_str(yaml)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Set the gating threshold
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(Error::config(format!(
                "threshold must be within [0, 1], got {}",
                self.threshold
            )));
        }
        if self.poll_interval_ms == 0 {
            return Err(Error::config("poll_interval_ms must be positive"));
        }
        if let Some(labels) = &self.labels {
            if labels.is_empty() {
                return Err(Error::config("label override must not be empty"));
            }
        }
        Ok(())
    }

    /// Poller period
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = MonitorSettings::default();
        assert_eq!(settings.threshold, 0.5);
        assert!(settings.gate_below_threshold);
        assert_eq!(settings.fallback_label, "None");
        assert_eq!(settings.poll_interval(), Duration::from_millis(100));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml() {
        let yaml = r#"
threshold: 0.8
labels: [car, truck, none]
model_path: ./models/vehicles
"#;

        let settings = MonitorSettings::from_yaml(yaml).unwrap();
        assert_eq!(settings.threshold, 0.8);
        assert_eq!(settings.poll_interval_ms, 100);
        assert_eq!(settings.labels.as_ref().map(Vec::len), Some(3));
        assert_eq!(settings.model_path, Some(PathBuf::from("./models/vehicles")));
    }

    #[test]
    fn test_rejects_out_of_range_threshold() {
        let result = MonitorSettings::from_yaml("threshold: 1.5");
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("monitor.yaml");
        std::fs::write(&path, "gate_below_threshold: false\npoll_interval_ms: 250\n").unwrap();

        let settings = MonitorSettings::from_file(&path).unwrap();
        assert!(!settings.gate_below_threshold);
        assert_eq!(settings.poll_interval(), Duration::from_millis(250));
    }
}
