use crate::stream::Pattern;
use framewatch_core::{Frame, InMemorySource, Result, SourceId};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// Shape and content of the synthetic source
#[derive(Debug, Clone)]
pub struct StreamConfig {
    pub width: usize,
    pub height: usize,
    pub components: usize,
    pub pattern: Pattern,
    /// Frames per second
    pub rate: f64,
    pub seed: Option<u64>,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            width: 64,
            height: 64,
            components: 1,
            pattern: Pattern::Blob,
            rate: 10.0,
            seed: None,
        }
    }
}

/// Renders successive frames for one source
pub struct FrameGenerator {
    config: StreamConfig,
    rng: StdRng,
    tick: u64,
}

impl FrameGenerator {
    pub fn new(config: StreamConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            config,
            rng,
            tick: 0,
        }
    }

    /// Render the next frame
    pub fn next_frame(&mut self, source: &SourceId) -> Result<Frame> {
        let StreamConfig {
            width,
            height,
            components,
            pattern,
            ..
        } = self.config;

        let data = pattern.render(&mut self.rng, width, height, components, self.tick);
        self.tick += 1;
        Frame::new(source.clone(), [width, height, 1], components, data)
    }

    /// Number of frames rendered so far
    pub fn frames_rendered(&self) -> u64 {
        self.tick
    }
}

/// Publishes generated frames into an in-memory source at a fixed rate
pub struct SyntheticStream {
    frames: Arc<InMemorySource>,
    source: SourceId,
}

impl SyntheticStream {
    pub fn new(frames: Arc<InMemorySource>, source: SourceId) -> Self {
        Self { frames, source }
    }

    /// Publish one frame so the source carries image data
    pub fn prime(&self, generator: &mut FrameGenerator) -> Result<()> {
        self.frames.publish(generator.next_frame(&self.source)?)?;
        Ok(())
    }

    /// Run generation until stopped, returning the number of frames published
    ///
    /// Subscribers run inside `publish`, so each publish goes to the blocking
    /// pool and a slow classification pass lowers the effective frame rate.
    pub async fn run(
        &self,
        mut generator: FrameGenerator,
        mut stop_signal: oneshot::Receiver<()>,
    ) -> u64 {
        let interval = Duration::from_secs_f64(1.0 / generator.config.rate.max(0.001));
        let start_time = Instant::now();
        let mut published = 0;

        loop {
            if stop_signal.try_recv().is_ok() {
                break;
            }

            match generator.next_frame(&self.source) {
                Ok(frame) => {
                    let frames = self.frames.clone();
                    match tokio::task::spawn_blocking(move || frames.publish(frame)).await {
                        Ok(Ok(observers)) => {
                            published += 1;
                            debug!(source = %self.source, observers, "Published synthetic frame");
                        }
                        Ok(Err(e)) => {
                            warn!(source = %self.source, error = %e, "Failed to publish frame")
                        }
                        Err(e) => warn!(source = %self.source, error = %e, "Publish task failed"),
                    }
                }
                Err(e) => warn!(source = %self.source, error = %e, "Failed to render frame"),
            }

            tokio::select! {
                _ = &mut stop_signal => break,
                _ = tokio::time::sleep(interval) => {}
            }
        }

        debug!(
            published,
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "Synthetic stream stopped"
        );
        published
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use framewatch_core::FrameSource;

    #[test]
    fn test_generator_shapes() {
        let mut generator = FrameGenerator::new(StreamConfig {
            width: 20,
            height: 10,
            components: 3,
            seed: Some(1),
            ..Default::default()
        });

        let frame = generator.next_frame(&SourceId::new("synthetic")).unwrap();
        assert_eq!(frame.dimensions(), [20, 10, 1]);
        assert_eq!(frame.components(), 3);
        assert_eq!(generator.frames_rendered(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stream_publishes_until_stopped() {
        let frames = Arc::new(InMemorySource::new());
        let id = SourceId::new("synthetic");
        let stream = SyntheticStream::new(frames.clone(), id.clone());

        let generator = FrameGenerator::new(StreamConfig {
            rate: 10.0,
            seed: Some(3),
            ..Default::default()
        });
        let (stop_tx, stop_rx) = oneshot::channel();

        let run = stream.run(generator, stop_rx);
        let stopper = async {
            tokio::time::sleep(Duration::from_millis(450)).await;
            stop_tx.send(()).unwrap();
        };
        let (published, _) = tokio::join!(run, stopper);

        assert_eq!(published, 5);
        assert!(frames.frame(&id).is_some());
    }
}
