//! Classification loop controller
//!
//! Owns the loaded model and at most one frame subscription. `start` attaches
//! an [`InferenceSession`] to a frame source; every frame-modified
//! notification then runs one pass synchronously on the notifying thread.

use crate::classifier::ImageModel;
use crate::config::MonitorSettings;
use crate::model_loader::{CandleModelLoader, ModelLoader};
use crate::pipeline::InferenceSession;
use framewatch_core::{
    Error, Frame, FrameCallback, FrameSource, LastClass, LastClassState, Result, SourceId,
    Subscription,
};
use framewatch_telemetry::MetricsCollector;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Controller state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerState {
    Idle,
    Active { source: SourceId },
}

/// Drives classification of a frame source with a loaded model
pub struct ClassificationController {
    frames: Arc<dyn FrameSource>,
    loader: Box<dyn ModelLoader>,
    model: Option<Arc<dyn ImageModel>>,
    subscription: Option<Subscription>,
    session: Option<Arc<InferenceSession>>,
    settings: MonitorSettings,
    state: LastClassState,
    metrics: MetricsCollector,
}

impl ClassificationController {
    /// Create a controller using the candle model loader
    pub fn new(frames: Arc<dyn FrameSource>, settings: MonitorSettings) -> Self {
        Self::with_loader(frames, settings, Box::new(CandleModelLoader::new()))
    }

    /// Create a controller with a custom model loader
    pub fn with_loader(
        frames: Arc<dyn FrameSource>,
        settings: MonitorSettings,
        loader: Box<dyn ModelLoader>,
    ) -> Self {
        Self {
            frames,
            loader,
            model: None,
            subscription: None,
            session: None,
            settings,
            state: LastClassState::new(),
            metrics: MetricsCollector::new(),
        }
    }

    /// Load a model, replacing the current one on success
    ///
    /// Failures are logged and leave the previously loaded model in place.
    pub fn load_model(&mut self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        match self.try_load_model(path) {
            Ok(()) => true,
            Err(e) => {
                error!(path = %path.display(), error = %e, "Failed to load model");
                false
            }
        }
    }

    /// Load a model, returning the failure instead of logging it
    pub fn try_load_model(&mut self, path: &Path) -> Result<()> {
        let model = self.loader.load(path)?;
        info!(model = model.name(), path = %path.display(), "Model loaded");
        self.model = Some(model);
        Ok(())
    }

    /// Install an already loaded model
    pub fn set_model(&mut self, model: Arc<dyn ImageModel>) {
        self.model = Some(model);
    }

    /// Whether a model is loaded
    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    /// Currently loaded model
    pub fn model(&self) -> Option<&Arc<dyn ImageModel>> {
        self.model.as_ref()
    }

    /// Toggle classification of `source`
    ///
    /// From `Idle` this validates the model and source and attaches a new
    /// session. From `Active` it ends the running session and returns to
    /// `Idle` without starting another one.
    ///
    /// `threshold` applies to the new session only; the controller's stored
    /// settings are left unchanged.
    pub fn start(&mut self, source: &SourceId, threshold: f32) -> Result<ControllerState> {
        if self.is_active() {
            self.stop();
            return Ok(ControllerState::Idle);
        }

        let model = self.model.clone().ok_or(Error::NoModel)?;

        if !self.frames.contains(source) {
            return Err(Error::missing_input(format!(
                "source '{}' does not exist",
                source
            )));
        }
        let frame = self.frames.frame(source).ok_or_else(|| {
            Error::missing_input(format!("source '{}' has no image data", source))
        })?;
        let shape = frame.processing_shape()?;
        if let Some(expected) = model.input_channels() {
            if expected != shape.channel_count() {
                return Err(Error::config(format!(
                    "model '{}' expects {} channels, source '{}' has {}",
                    model.name(),
                    expected,
                    source,
                    shape.channel_count()
                )));
            }
        }

        let settings = self.settings.clone().with_threshold(threshold);
        settings.validate()?;

        let session = Arc::new(InferenceSession::new(
            model,
            &settings,
            self.state.clone(),
            self.metrics.clone(),
        )?);
        debug!(
            source = %source,
            shape = ?shape.dims(),
            target_size = session.target_size(),
            "Session prepared"
        );

        let handler = session.clone();
        let on_frame: FrameCallback = Arc::new(move |frame: &Frame| handler.on_frame(frame));
        let subscription = Subscription::attach(self.frames.as_ref(), source, on_frame)?;

        self.subscription = Some(subscription);
        self.session = Some(session);

        info!(source = %source, threshold, "Processing started");
        Ok(ControllerState::Active {
            source: source.clone(),
        })
    }

    /// End the running session; returns false if nothing was running
    pub fn stop(&mut self) -> bool {
        self.session = None;
        match self.subscription.take() {
            Some(subscription) => {
                let source = subscription.source().clone();
                subscription.detach(self.frames.as_ref());
                info!(source = %source, "Processing stopped");
                true
            }
            None => false,
        }
    }

    /// Current state
    pub fn state(&self) -> ControllerState {
        match &self.subscription {
            Some(subscription) => ControllerState::Active {
                source: subscription.source().clone(),
            },
            None => ControllerState::Idle,
        }
    }

    /// Whether a session is running
    pub fn is_active(&self) -> bool {
        self.subscription.is_some()
    }

    /// Last published class
    pub fn last_class(&self) -> Option<LastClass> {
        self.state.get()
    }

    /// Handle to the last-class slot, for pollers and display surfaces
    pub fn last_class_state(&self) -> LastClassState {
        self.state.clone()
    }

    /// Session metrics
    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    /// Current settings
    pub fn settings(&self) -> &MonitorSettings {
        &self.settings
    }
}

impl Drop for ClassificationController {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Tensor;
    use framewatch_core::InMemorySource;

    struct StubModel;

    impl ImageModel for StubModel {
        fn name(&self) -> &str {
            "stub"
        }

        fn input_size(&self) -> Option<usize> {
            Some(4)
        }

        fn predict(&self, _batch: &Tensor) -> Result<Vec<f32>> {
            Ok(vec![0.0, 0.0, 0.0, 1.0, 0.0])
        }
    }

    fn source_with_frame() -> (Arc<InMemorySource>, SourceId) {
        let frames = Arc::new(InMemorySource::new());
        let id = SourceId::new("vol");
        frames
            .publish(Frame::new(id.clone(), [8, 8, 1], 1, vec![1.0; 64]).unwrap())
            .unwrap();
        (frames, id)
    }

    #[test]
    fn test_start_without_model() {
        let (frames, id) = source_with_frame();
        let mut controller = ClassificationController::new(frames, MonitorSettings::default());

        assert!(matches!(controller.start(&id, 0.5), Err(Error::NoModel)));
        assert_eq!(controller.state(), ControllerState::Idle);
    }

    #[test]
    fn test_start_without_source() {
        let frames = Arc::new(InMemorySource::new());
        let mut controller = ClassificationController::new(frames, MonitorSettings::default());
        controller.set_model(Arc::new(StubModel));

        let result = controller.start(&SourceId::new("missing"), 0.5);
        assert!(matches!(result, Err(Error::MissingInput(_))));
    }

    #[test]
    fn test_source_without_image_data() {
        let frames = Arc::new(InMemorySource::new());
        frames.add_source("empty");
        let mut controller =
            ClassificationController::new(frames.clone(), MonitorSettings::default());
        controller.set_model(Arc::new(StubModel));

        let result = controller.start(&SourceId::new("empty"), 0.5);
        assert!(matches!(result, Err(Error::MissingInput(_))));
        assert_eq!(frames.subscriber_count(&SourceId::new("empty")), 0);
    }

    #[test]
    fn test_invalid_threshold_stays_idle() {
        let (frames, id) = source_with_frame();
        let mut controller = ClassificationController::new(frames, MonitorSettings::default());
        controller.set_model(Arc::new(StubModel));

        assert!(matches!(
            controller.start(&id, 2.0),
            Err(Error::Configuration(_))
        ));
        assert!(!controller.is_active());
    }

    #[test]
    fn test_start_threshold_leaves_settings_untouched() {
        let (frames, id) = source_with_frame();
        let mut controller = ClassificationController::new(frames, MonitorSettings::default());
        controller.set_model(Arc::new(StubModel));

        controller.start(&id, 0.9).unwrap();
        assert_eq!(controller.settings().threshold, 0.5);

        controller.start(&id, 0.9).unwrap();
        assert!(matches!(
            controller.start(&id, 1.5),
            Err(Error::Configuration(_))
        ));
        assert_eq!(controller.settings().threshold, 0.5);
    }

    #[test]
    fn test_notification_publishes_label() {
        let (frames, id) = source_with_frame();
        let mut controller =
            ClassificationController::new(frames.clone(), MonitorSettings::default());
        controller.set_model(Arc::new(StubModel));

        let state = controller.start(&id, 0.5).unwrap();
        assert_eq!(state, ControllerState::Active { source: id.clone() });

        frames
            .publish(Frame::new(id.clone(), [8, 8, 1], 1, vec![2.0; 64]).unwrap())
            .unwrap();
        assert_eq!(controller.last_class().unwrap().label, "R");
    }

    #[test]
    fn test_drop_detaches() {
        let (frames, id) = source_with_frame();
        {
            let mut controller =
                ClassificationController::new(frames.clone(), MonitorSettings::default());
            controller.set_model(Arc::new(StubModel));
            controller.start(&id, 0.5).unwrap();
            assert_eq!(frames.subscriber_count(&id), 1);
        }
        assert_eq!(frames.subscriber_count(&id), 0);
    }
}
