//! Model descriptor structures
//!
//! A model directory holds `model.yaml` (this descriptor) next to a
//! safetensors weights file. Layer weights are named
//! `layers.<index>.weight` and `layers.<index>.bias`.

use crate::classifier::default_labels;
use candle_core::Device;
use framewatch_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// File name of the descriptor inside a model directory
pub const DESCRIPTOR_FILE: &str = "model.yaml";

/// Default weights file name inside a model directory
pub const DEFAULT_WEIGHTS_FILE: &str = "model.safetensors";

/// Descriptor of a sequential image classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelDescriptor {
    /// Model name
    #[serde(default)]
    pub name: String,

    /// Model version
    #[serde(default)]
    pub version: String,

    /// Model description
    #[serde(default)]
    pub description: String,

    /// Input shape of the first layer, `[batch, height, width, channels]`;
    /// `null` entries are unspecified
    #[serde(default)]
    pub input_shape: Vec<Option<usize>>,

    /// Ordered class labels
    #[serde(default = "default_labels")]
    pub labels: Vec<String>,

    /// Sequential layer stack
    pub layers: Vec<LayerSpec>,

    /// Weights file, relative to the descriptor
    #[serde(default = "default_weights")]
    pub weights: String,

    /// Device to run on
    #[serde(default)]
    pub device: DeviceSpec,
}

fn default_weights() -> String {
    DEFAULT_WEIGHTS_FILE.to_string()
}

/// One layer of the sequential stack
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum LayerSpec {
    /// 2D convolution over NCHW activations
    Conv2d {
        filters: usize,
        kernel_size: usize,
        #[serde(default = "default_stride")]
        stride: usize,
        #[serde(default)]
        padding: usize,
    },

    /// Non-overlapping max pooling
    MaxPool2d { size: usize },

    /// Rectified linear activation
    Relu,

    /// Flatten all non-batch axes (channel-major order)
    Flatten,

    /// Fully connected layer
    Dense { units: usize },

    /// Softmax over the last axis
    Softmax,

    /// Dropout; identity at inference time
    Dropout {
        #[serde(default)]
        rate: f32,
    },
}

fn default_stride() -> usize {
    1
}

/// Device specification
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceSpec {
    #[default]
    Cpu,
    Cuda,
    Metal,
}

impl DeviceSpec {
    /// Create the candle device
    pub fn to_device(self) -> Result<Device> {
        match self {
            DeviceSpec::Cpu => Ok(Device::Cpu),
            DeviceSpec::Cuda => Device::new_cuda(0)
                .map_err(|e| Error::model_load(format!("Failed to create CUDA device: {}", e))),
            DeviceSpec::Metal => Device::new_metal(0)
                .map_err(|e| Error::model_load(format!("Failed to create Metal device: {}", e))),
        }
    }
}

impl ModelDescriptor {
    /// A small convolutional classifier for `size x size x channels` frames
    pub fn simple_cnn(name: impl Into<String>, size: usize, channels: usize) -> Self {
        Self {
            name: name.into(),
            version: "1.0".to_string(),
            description: String::new(),
            input_shape: vec![None, Some(size), Some(size), Some(channels)],
            labels: default_labels(),
            layers: vec![
                LayerSpec::Conv2d {
                    filters: 8,
                    kernel_size: 3,
                    stride: 1,
                    padding: 1,
                },
                LayerSpec::Relu,
                LayerSpec::MaxPool2d { size: 2 },
                LayerSpec::Flatten,
                LayerSpec::Dense { units: 5 },
                LayerSpec::Softmax,
            ],
            weights: default_weights(),
            device: DeviceSpec::Cpu,
        }
    }

    /// Replace the label table, resizing the last dense layer to match
    pub fn with_labels(mut self, labels: Vec<String>) -> Self {
        let last_dense = self
            .layers
            .iter_mut()
            .rev()
            .find_map(|layer| match layer {
                LayerSpec::Dense { units } => Some(units),
                _ => None,
            });
        if let Some(units) = last_dense {
            *units = labels.len();
        }
        self.labels = labels;
        self
    }

    /// Load a descriptor from YAML text
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let descriptor: Self = serde_yaml::from_str(yaml)?;
        descriptor.validate()?;
        Ok(descriptor)
    }

    /// Load a descriptor from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Serialize to YAML
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Edge length the first layer expects (`input_shape[1]`)
    pub fn input_size(&self) -> Option<usize> {
        self.input_shape.get(1).copied().flatten()
    }

    /// Channel count the first layer expects (`input_shape[3]`, default 1)
    pub fn input_channels(&self) -> usize {
        self.input_shape.get(3).copied().flatten().unwrap_or(1)
    }

    /// Structural checks that do not need weights
    pub fn validate(&self) -> Result<()> {
        if self.labels.is_empty() {
            return Err(Error::model_load("descriptor declares no labels"));
        }
        if self.layers.is_empty() {
            return Err(Error::model_load("descriptor declares no layers"));
        }
        if let (Some(Some(h)), Some(Some(w))) = (self.input_shape.get(1), self.input_shape.get(2)) {
            if h != w {
                return Err(Error::model_load(format!(
                    "input shape must be square, got {}x{}",
                    h, w
                )));
            }
        }
        for (index, layer) in self.layers.iter().enumerate() {
            let invalid = match layer {
                LayerSpec::Conv2d {
                    filters,
                    kernel_size,
                    stride,
                    ..
                } => *filters == 0 || *kernel_size == 0 || *stride == 0,
                LayerSpec::MaxPool2d { size } => *size == 0,
                LayerSpec::Dense { units } => *units == 0,
                LayerSpec::Dropout { rate } => !(0.0..1.0).contains(rate),
                LayerSpec::Relu | LayerSpec::Flatten | LayerSpec::Softmax => false,
            };
            if invalid {
                return Err(Error::model_load(format!(
                    "layer {} has invalid parameters: {:?}",
                    index, layer
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_descriptor() {
        let yaml = r#"
name: "cars-cnn"
version: "1.0"
description: "Vehicle class classifier"
input_shape: [null, 32, 32, 1]
labels: [A, C, None, R, S]
layers:
  - type: conv2d
    filters: 4
    kernel_size: 3
  - type: relu
  - type: max-pool2d
    size: 2
  - type: flatten
  - type: dropout
    rate: 0.25
  - type: dense
    units: 5
  - type: softmax
"#;

        let descriptor = ModelDescriptor::from_yaml(yaml).unwrap();
        assert_eq!(descriptor.name, "cars-cnn");
        assert_eq!(descriptor.input_size(), Some(32));
        assert_eq!(descriptor.input_channels(), 1);
        assert_eq!(descriptor.layers.len(), 7);
        assert_eq!(descriptor.weights, DEFAULT_WEIGHTS_FILE);
        assert_eq!(descriptor.device, DeviceSpec::Cpu);
        assert_eq!(
            descriptor.layers[0],
            LayerSpec::Conv2d {
                filters: 4,
                kernel_size: 3,
                stride: 1,
                padding: 0
            }
        );
    }

    #[test]
    fn test_unspecified_input_size() {
        let yaml = r#"
input_shape: [null, null, null, 3]
layers:
  - type: flatten
  - type: dense
    units: 5
"#;
        let descriptor = ModelDescriptor::from_yaml(yaml).unwrap();
        assert_eq!(descriptor.input_size(), None);
        assert_eq!(descriptor.labels, default_labels());
    }

    #[test]
    fn test_rejects_invalid_layers() {
        let yaml = r#"
input_shape: [null, 8, 8, 1]
layers:
  - type: dense
    units: 0
"#;
        assert!(matches!(
            ModelDescriptor::from_yaml(yaml),
            Err(Error::ModelLoad(_))
        ));

        let yaml = r#"
input_shape: [null, 8, 16, 1]
layers:
  - type: flatten
"#;
        assert!(ModelDescriptor::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_with_labels_resizes_output() {
        let descriptor = ModelDescriptor::simple_cnn("pets", 8, 1)
            .with_labels(vec!["cat".to_string(), "dog".to_string()]);

        assert_eq!(descriptor.labels.len(), 2);
        assert!(descriptor.layers.contains(&LayerSpec::Dense { units: 2 }));
    }

    #[test]
    fn test_yaml_roundtrip_of_simple_cnn() {
        let descriptor = ModelDescriptor::simple_cnn("demo", 16, 3);
        let parsed = ModelDescriptor::from_yaml(&descriptor.to_yaml().unwrap()).unwrap();

        assert_eq!(parsed.input_size(), Some(16));
        assert_eq!(parsed.input_channels(), 3);
        assert_eq!(parsed.layers, descriptor.layers);
    }
}
