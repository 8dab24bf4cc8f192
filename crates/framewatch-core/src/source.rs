//! Frame source capability and subscriptions
//!
//! A frame source is anything that can hand out the current frame of a named
//! source and notify observers when that frame changes. The classification
//! controller only ever talks to this trait, never to a concrete host.

use crate::{Frame, Result, SourceId};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Callback invoked synchronously with every new frame
pub type FrameCallback = Arc<dyn Fn(&Frame) + Send + Sync>;

/// Opaque registration token handed out by a frame source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionToken(u64);

impl SubscriptionToken {
    /// Wrap a raw token value
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw token value
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Observable frame source
pub trait FrameSource: Send + Sync {
    /// Whether the source can currently be resolved
    fn contains(&self, id: &SourceId) -> bool;

    /// Current frame of the source, `None` if unknown or without image data
    fn frame(&self, id: &SourceId) -> Option<Frame>;

    /// Register a callback for frame-modified notifications
    fn subscribe(&self, id: &SourceId, on_frame: FrameCallback) -> Result<SubscriptionToken>;

    /// Remove a registration; returns false if nothing was removed
    fn unsubscribe(&self, id: &SourceId, token: SubscriptionToken) -> bool;
}

/// A live registration paired with the source it was registered against
pub struct Subscription {
    source: SourceId,
    token: SubscriptionToken,
}

impl Subscription {
    /// Subscribe `on_frame` to `source`
    pub fn attach(
        frames: &dyn FrameSource,
        source: &SourceId,
        on_frame: FrameCallback,
    ) -> Result<Self> {
        let token = frames.subscribe(source, on_frame)?;
        debug!(source = %source, token = token.raw(), "Subscription attached");

        Ok(Self {
            source: source.clone(),
            token,
        })
    }

    /// Detach from the source this subscription was registered against
    ///
    /// If the source can no longer be resolved the detachment is skipped and
    /// `false` is returned.
    pub fn detach(self, frames: &dyn FrameSource) -> bool {
        if !frames.contains(&self.source) {
            warn!(source = %self.source, "Source no longer exists, skipping detach");
            return false;
        }

        let removed = frames.unsubscribe(&self.source, self.token);
        debug!(source = %self.source, token = self.token.raw(), removed, "Subscription detached");
        removed
    }

    /// Source this subscription observes
    pub fn source(&self) -> &SourceId {
        &self.source
    }

    /// Token issued by the source
    pub fn token(&self) -> SubscriptionToken {
        self.token
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("source", &self.source)
            .field("token", &self.token.raw())
            .finish()
    }
}
