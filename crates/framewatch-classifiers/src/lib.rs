//! framewatch Classifiers
//!
//! Continuous classification of streaming image frames.
//!
//! A [`ClassificationController`] owns a loaded [`ImageModel`] and subscribes
//! an [`InferenceSession`] to a frame source. Every frame-modified
//! notification is resized to the model's input edge, normalized by its own
//! maximum, scored, and the winning label is published to a shared
//! last-class slot that a [`LabelPoller`] forwards to a display sink.
//!
//! Models are sequential candle networks described by a `model.yaml`
//! descriptor next to a safetensors weights file.

pub mod classifier;
pub mod config;
pub mod controller;
pub mod model_config;
pub mod model_loader;
pub mod network;
pub mod pipeline;
pub mod poller;
pub mod preprocess;

pub use classifier::{argmax, default_labels, Classification, ImageModel, DEFAULT_LABELS};
pub use config::MonitorSettings;
pub use controller::{ClassificationController, ControllerState};
pub use model_config::{DeviceSpec, LayerSpec, ModelDescriptor};
pub use model_loader::{
    resolve_model_files, scaffold_model, CandleImageModel, CandleModelLoader, ModelFiles,
    ModelLoader,
};
pub use pipeline::{classify, Gate, InferenceSession};
pub use poller::LabelPoller;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::classifier::{Classification, ImageModel};
    pub use crate::config::MonitorSettings;
    pub use crate::controller::{ClassificationController, ControllerState};
    pub use crate::model_loader::{CandleModelLoader, ModelLoader};
    pub use crate::poller::LabelPoller;
}
