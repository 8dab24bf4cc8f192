//! Mock models for testing
//!
//! Provides configurable mock implementations of the ImageModel and
//! ModelLoader traits for testing the controller, gating, and error handling.

#![allow(dead_code)]

use candle_core::Tensor;
use framewatch_classifiers::{ImageModel, ModelLoader};
use framewatch_core::{Error, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// A model that returns a fixed score vector
pub struct StubModel {
    name: String,
    input_size: Option<usize>,
    scores: Vec<f32>,
    call_count: AtomicU32,
    last_batch: Mutex<Option<Vec<usize>>>,
}

impl StubModel {
    /// Create a stub with input size 32 that favors the first class
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            input_size: Some(32),
            scores: vec![0.9, 0.025, 0.025, 0.025, 0.025],
            call_count: AtomicU32::new(0),
            last_batch: Mutex::new(None),
        }
    }

    /// Set the score vector this model will return
    pub fn with_scores(mut self, scores: Vec<f32>) -> Self {
        self.scores = scores;
        self
    }

    /// Set the declared input size
    pub fn with_input_size(mut self, size: Option<usize>) -> Self {
        self.input_size = size;
        self
    }

    /// Get the number of times predict was called
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    /// Dimensions of the last batch seen by predict
    pub fn last_batch_dims(&self) -> Option<Vec<usize>> {
        self.last_batch.lock().clone()
    }
}

impl ImageModel for StubModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn input_size(&self) -> Option<usize> {
        self.input_size
    }

    fn predict(&self, batch: &Tensor) -> Result<Vec<f32>> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        *self.last_batch.lock() = Some(batch.dims().to_vec());
        Ok(self.scores.clone())
    }
}

/// A model whose predict always fails
pub struct FailingModel {
    error_message: String,
}

impl FailingModel {
    /// Create a new failing model
    pub fn new(error_message: &str) -> Self {
        Self {
            error_message: error_message.to_string(),
        }
    }
}

impl ImageModel for FailingModel {
    fn name(&self) -> &str {
        "failing"
    }

    fn input_size(&self) -> Option<usize> {
        Some(8)
    }

    fn predict(&self, _batch: &Tensor) -> Result<Vec<f32>> {
        Err(Error::inference(self.error_message.clone()))
    }
}

/// A loader that resolves paths from a fixed table
#[derive(Default)]
pub struct StubLoader {
    models: HashMap<String, Arc<dyn ImageModel>>,
}

impl StubLoader {
    /// Create an empty loader
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `path` load `model`
    pub fn with_model(mut self, path: &str, model: Arc<dyn ImageModel>) -> Self {
        self.models.insert(path.to_string(), model);
        self
    }
}

impl ModelLoader for StubLoader {
    fn load(&self, path: &Path) -> Result<Arc<dyn ImageModel>> {
        self.models
            .get(path.to_string_lossy().as_ref())
            .cloned()
            .ok_or_else(|| Error::model_load(format!("Model file not found: {}", path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device};

    #[test]
    fn test_stub_model_records_batch() {
        let model = StubModel::new("test").with_scores(vec![0.2, 0.8]);
        let batch = Tensor::zeros((1, 32, 32), DType::F32, &Device::Cpu).unwrap();

        assert_eq!(model.predict(&batch).unwrap(), vec![0.2, 0.8]);
        assert_eq!(model.call_count(), 1);
        assert_eq!(model.last_batch_dims(), Some(vec![1, 32, 32]));
    }

    #[test]
    fn test_failing_model() {
        let model = FailingModel::new("Test error");
        let batch = Tensor::zeros((1, 8, 8), DType::F32, &Device::Cpu).unwrap();

        let result = model.predict(&batch);
        assert!(matches!(result, Err(Error::Inference(_))));
    }

    #[test]
    fn test_stub_loader() {
        let loader = StubLoader::new().with_model("models/a", Arc::new(StubModel::new("a")));

        assert_eq!(loader.load(Path::new("models/a")).unwrap().name(), "a");
        assert!(matches!(
            loader.load(Path::new("models/b")),
            Err(Error::ModelLoad(_))
        ));
    }
}
