//! Error types for framewatch

/// Result type alias using framewatch's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for framewatch operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Model could not be loaded (bad path, corrupt descriptor or weights)
    #[error("model load error: {0}")]
    ModelLoad(String),

    /// No frame source selected, or the source carries no image data
    #[error("missing input: {0}")]
    MissingInput(String),

    /// Classification requested before any model was loaded
    #[error("no model loaded")]
    NoModel,

    /// Model or session configuration is unusable (e.g. unknown input size)
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Frame layout cannot be turned into a 2D (or 2D + channel) array
    #[error("unsupported frame shape: {0}")]
    UnsupportedShape(String),

    /// A single inference pass failed
    #[error("inference error: {0}")]
    Inference(String),

    /// Frame source errors (subscription, lookup)
    #[error("source error: {0}")]
    Source(String),

    /// Filesystem errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML descriptor/config errors
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Generic internal errors
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new model load error
    pub fn model_load(msg: impl Into<String>) -> Self {
        Self::ModelLoad(msg.into())
    }

    /// Create a new missing input error
    pub fn missing_input(msg: impl Into<String>) -> Self {
        Self::MissingInput(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a new unsupported shape error
    pub fn shape(msg: impl Into<String>) -> Self {
        Self::UnsupportedShape(msg.into())
    }

    /// Create a new inference error
    pub fn inference(msg: impl Into<String>) -> Self {
        Self::Inference(msg.into())
    }

    /// Create a new source error
    pub fn source(msg: impl Into<String>) -> Self {
        Self::Source(msg.into())
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether this error only affects a single frame and the session may continue
    pub fn is_per_frame(&self) -> bool {
        matches!(self, Self::Inference(_) | Self::UnsupportedShape(_))
    }
}
