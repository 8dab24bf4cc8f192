//! Model loading for Candle-based frame classifiers

use crate::classifier::ImageModel;
use crate::model_config::{ModelDescriptor, DESCRIPTOR_FILE};
use crate::network::Sequential;
use candle_core::{DType, Device, Tensor};
use candle_nn::{VarBuilder, VarMap};
use framewatch_core::{Error, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Pluggable model library backend
///
/// Implement this trait to load models from another inference backend; the
/// controller only sees the resulting [`ImageModel`].
pub trait ModelLoader: Send + Sync {
    /// Load a model from a filesystem path
    fn load(&self, path: &Path) -> Result<Arc<dyn ImageModel>>;
}

/// Loader for descriptor + safetensors model directories
#[derive(Debug, Clone, Default)]
pub struct CandleModelLoader;

impl CandleModelLoader {
    /// Create a new loader
    pub fn new() -> Self {
        Self
    }
}

impl ModelLoader for CandleModelLoader {
    fn load(&self, path: &Path) -> Result<Arc<dyn ImageModel>> {
        Ok(Arc::new(CandleImageModel::load(path)?))
    }
}

/// Paths of the two files that make up a model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelFiles {
    pub descriptor: PathBuf,
    pub weights: PathBuf,
}

/// Resolve a model directory, descriptor path, or weights path to both files
pub fn resolve_model_files(path: &Path) -> Result<ModelFiles> {
    if !path.exists() {
        return Err(Error::model_load(format!(
            "Model file not found: {}",
            path.display()
        )));
    }

    let descriptor = if path.is_dir() {
        path.join(DESCRIPTOR_FILE)
    } else {
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => path.to_path_buf(),
            _ => path
                .parent()
                .map(|dir| dir.join(DESCRIPTOR_FILE))
                .unwrap_or_else(|| PathBuf::from(DESCRIPTOR_FILE)),
        }
    };

    if !descriptor.is_file() {
        return Err(Error::model_load(format!(
            "Model descriptor not found: {}",
            descriptor.display()
        )));
    }

    let descriptor_dir = descriptor
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();

    let weights = if path.is_file() && descriptor.as_path() != path {
        path.to_path_buf()
    } else {
        let spec = ModelDescriptor::from_file(&descriptor)
            .map_err(|e| Error::model_load(format!("Failed to read descriptor: {}", e)))?;
        descriptor_dir.join(spec.weights)
    };

    Ok(ModelFiles {
        descriptor,
        weights,
    })
}

/// Loaded sequential classifier
pub struct CandleImageModel {
    descriptor: ModelDescriptor,
    network: Sequential,
    device: Device,
    weights_path: PathBuf,
}

impl CandleImageModel {
    /// Load a model from a directory, descriptor path, or weights path
    pub fn load(path: &Path) -> Result<Self> {
        let files = resolve_model_files(path)?;

        let descriptor = ModelDescriptor::from_file(&files.descriptor)
            .map_err(|e| Error::model_load(format!("Failed to read descriptor: {}", e)))?;

        let device = descriptor.device.to_device()?;

        let bytes = std::fs::read(&files.weights).map_err(|e| {
            Error::model_load(format!(
                "Failed to read weights {}: {}",
                files.weights.display(),
                e
            ))
        })?;

        let vb = VarBuilder::from_buffered_safetensors(bytes, DType::F32, &device)
            .map_err(|e| Error::model_load(format!("Failed to load SafeTensors: {}", e)))?;

        let network = Sequential::build(&descriptor, vb)?;

        info!(
            model = %descriptor.name,
            input_size = ?descriptor.input_size(),
            labels = descriptor.labels.len(),
            "Loaded model from {}",
            files.weights.display()
        );

        Ok(Self {
            descriptor,
            network,
            device,
            weights_path: files.weights,
        })
    }

    /// Get model descriptor
    pub fn descriptor(&self) -> &ModelDescriptor {
        &self.descriptor
    }

    /// Get reference to the device
    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Get weights path
    pub fn weights_path(&self) -> &Path {
        &self.weights_path
    }

    fn to_nchw(&self, batch: &Tensor) -> Result<Tensor> {
        let size = self
            .descriptor
            .input_size()
            .ok_or_else(|| Error::config("model does not declare an input size"))?;
        let channels = self.descriptor.input_channels();

        let nhwc = match batch.rank() {
            3 => batch.unsqueeze(3),
            4 => Ok(batch.clone()),
            r => {
                return Err(Error::inference(format!(
                    "expected a rank 3 or 4 batch, got rank {}",
                    r
                )))
            }
        }
        .map_err(|e| Error::inference(format!("Failed to add channel axis: {}", e)))?;

        if nhwc.dims() != [1, size, size, channels] {
            return Err(Error::inference(format!(
                "batch shape {:?} does not match model input [1, {}, {}, {}]",
                nhwc.dims(),
                size,
                size,
                channels
            )));
        }

        nhwc.permute((0, 3, 1, 2))
            .and_then(|t| t.contiguous())
            .and_then(|t| t.to_device(&self.device))
            .map_err(|e| Error::inference(format!("Failed to lay out input tensor: {}", e)))
    }
}

impl ImageModel for CandleImageModel {
    fn name(&self) -> &str {
        &self.descriptor.name
    }

    fn input_size(&self) -> Option<usize> {
        self.descriptor.input_size()
    }

    fn input_channels(&self) -> Option<usize> {
        Some(self.descriptor.input_channels())
    }

    fn labels(&self) -> Vec<String> {
        self.descriptor.labels.clone()
    }

    fn predict(&self, batch: &Tensor) -> Result<Vec<f32>> {
        let input = self.to_nchw(batch)?;

        let output = self
            .network
            .forward(&input)
            .map_err(|e| Error::inference(format!("Model forward pass failed: {}", e)))?;

        output
            .get(0)
            .and_then(|row| row.to_dtype(DType::F32))
            .and_then(|row| row.to_vec1::<f32>())
            .map_err(|e| Error::inference(format!("Failed to read scores: {}", e)))
    }
}

/// Write a model directory with randomly initialized weights
///
/// Produces `model.yaml` and the weights file named by the descriptor.
pub fn scaffold_model(descriptor: &ModelDescriptor, dir: &Path) -> Result<ModelFiles> {
    descriptor.validate()?;
    std::fs::create_dir_all(dir)?;

    let varmap = VarMap::new();
    let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
    Sequential::build(descriptor, vb)?;

    let files = ModelFiles {
        descriptor: dir.join(DESCRIPTOR_FILE),
        weights: dir.join(&descriptor.weights),
    };

    varmap
        .save(&files.weights)
        .map_err(|e| Error::internal(format!("Failed to save weights: {}", e)))?;
    std::fs::write(&files.descriptor, descriptor.to_yaml()?)?;

    debug!(dir = %dir.display(), "Scaffolded model");
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_path() {
        let result = resolve_model_files(Path::new("/nonexistent/model"));
        assert!(matches!(result, Err(Error::ModelLoad(_))));
    }

    #[test]
    fn test_resolve_from_each_entry_point() {
        let dir = tempfile::tempdir().unwrap();
        let descriptor = ModelDescriptor::simple_cnn("resolve", 8, 1);
        let files = scaffold_model(&descriptor, dir.path()).unwrap();

        assert_eq!(resolve_model_files(dir.path()).unwrap(), files);
        assert_eq!(resolve_model_files(&files.descriptor).unwrap(), files);
        assert_eq!(resolve_model_files(&files.weights).unwrap(), files);
    }

    #[test]
    fn test_directory_without_descriptor() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            CandleImageModel::load(dir.path()),
            Err(Error::ModelLoad(_))
        ));
    }

    #[test]
    fn test_load_scaffolded_model() {
        let dir = tempfile::tempdir().unwrap();
        scaffold_model(&ModelDescriptor::simple_cnn("cars", 8, 1), dir.path()).unwrap();

        let model = CandleImageModel::load(dir.path()).unwrap();
        assert_eq!(model.name(), "cars");
        assert_eq!(model.input_size(), Some(8));

        let batch = Tensor::zeros((1, 8, 8), DType::F32, &Device::Cpu).unwrap();
        let scores = model.predict(&batch).unwrap();
        assert_eq!(scores.len(), 5);
        assert!((scores.iter().sum::<f32>() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_predict_rejects_wrong_shape() {
        let dir = tempfile::tempdir().unwrap();
        scaffold_model(&ModelDescriptor::simple_cnn("cars", 8, 1), dir.path()).unwrap();
        let model = CandleImageModel::load(dir.path()).unwrap();

        let batch = Tensor::zeros((1, 4, 4), DType::F32, &Device::Cpu).unwrap();
        assert!(matches!(model.predict(&batch), Err(Error::Inference(_))));
    }

    #[test]
    fn test_corrupt_weights() {
        let dir = tempfile::tempdir().unwrap();
        let files =
            scaffold_model(&ModelDescriptor::simple_cnn("cars", 8, 1), dir.path()).unwrap();
        std::fs::write(&files.weights, b"not a safetensors file").unwrap();

        assert!(matches!(
            CandleImageModel::load(dir.path()),
            Err(Error::ModelLoad(_))
        ));
    }
}
