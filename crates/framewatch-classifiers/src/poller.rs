//! Periodic last-class poller

use framewatch_core::{LastClass, LastClassState};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::debug;

/// Background task that re-reads the last-class slot on a fixed period
/// and forwards it to a display sink
///
/// Must be spawned from within a tokio runtime.
pub struct LabelPoller {
    stop: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl LabelPoller {
    /// Start polling `state` every `period`
    ///
    /// The sink sees each new publish once; with `emit_unchanged` it is
    /// called on every tick that finds a published class.
    pub fn spawn<F>(state: LastClassState, period: Duration, emit_unchanged: bool, mut sink: F) -> Self
    where
        F: FnMut(&LastClass) + Send + 'static,
    {
        let (stop_tx, mut stop_rx) = oneshot::channel();

        let handle = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut last_seen = 0u64;

            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => {
                        if let Some(class) = state.get() {
                            if emit_unchanged || class.sequence != last_seen {
                                last_seen = class.sequence;
                                sink(&class);
                            }
                        }
                    }
                }
            }

            debug!("Label poller stopped");
        });

        Self {
            stop: Some(stop_tx),
            handle: Some(handle),
        }
    }

    /// Whether the polling task is still running
    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// Stop polling and wait for the task to finish
    pub async fn stop(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for LabelPoller {
    fn drop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
    }
}
