//! In-process frame source
//!
//! Stores the latest frame per source and notifies subscribers synchronously
//! from `publish`, on the publishing thread. A slow subscriber therefore
//! delays the return of `publish`.

use crate::source::{FrameCallback, FrameSource, SubscriptionToken};
use crate::{Error, Frame, Result, SourceId};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace};

#[derive(Default)]
struct SourceEntry {
    frame: Option<Frame>,
    observers: Vec<(SubscriptionToken, FrameCallback)>,
}

/// Frame source backed by an in-memory map
pub struct InMemorySource {
    sources: RwLock<HashMap<SourceId, SourceEntry>>,
    next_token: AtomicU64,
}

impl InMemorySource {
    /// Create an empty source registry
    pub fn new() -> Self {
        Self {
            sources: RwLock::new(HashMap::new()),
            next_token: AtomicU64::new(1),
        }
    }

    /// Register a source without image data; returns false if it already exists
    pub fn add_source(&self, id: impl Into<SourceId>) -> bool {
        let id = id.into();
        let mut sources = self.sources.write();
        if sources.contains_key(&id) {
            return false;
        }
        debug!(source = %id, "Source added");
        sources.insert(id, SourceEntry::default());
        true
    }

    /// Remove a source and all of its observers
    pub fn remove_source(&self, id: &SourceId) -> bool {
        let removed = self.sources.write().remove(id).is_some();
        if removed {
            debug!(source = %id, "Source removed");
        }
        removed
    }

    /// Store a frame and notify every observer of its source
    ///
    /// The source is created on first publish. Returns the number of
    /// observers notified.
    pub fn publish(&self, frame: Frame) -> Result<usize> {
        let observers: Vec<FrameCallback> = {
            let mut sources = self.sources.write();
            let entry = sources.entry(frame.source().clone()).or_default();
            entry.frame = Some(frame.clone());
            entry.observers.iter().map(|(_, cb)| cb.clone()).collect()
        };

        trace!(source = %frame.source(), observers = observers.len(), "Frame published");

        // Lock released: observers may read the source back.
        for observer in &observers {
            observer(&frame);
        }

        Ok(observers.len())
    }

    /// Number of observers attached to a source
    pub fn subscriber_count(&self, id: &SourceId) -> usize {
        self.sources
            .read()
            .get(id)
            .map(|entry| entry.observers.len())
            .unwrap_or(0)
    }
}

impl Default for InMemorySource {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSource for InMemorySource {
    fn contains(&self, id: &SourceId) -> bool {
        self.sources.read().contains_key(id)
    }

    fn frame(&self, id: &SourceId) -> Option<Frame> {
        self.sources.read().get(id).and_then(|entry| entry.frame.clone())
    }

    fn subscribe(&self, id: &SourceId, on_frame: FrameCallback) -> Result<SubscriptionToken> {
        let mut sources = self.sources.write();
        let entry = sources
            .get_mut(id)
            .ok_or_else(|| Error::source(format!("unknown source '{}'", id)))?;

        let token = SubscriptionToken::new(self.next_token.fetch_add(1, Ordering::Relaxed));
        entry.observers.push((token, on_frame));
        Ok(token)
    }

    fn unsubscribe(&self, id: &SourceId, token: SubscriptionToken) -> bool {
        let mut sources = self.sources.write();
        match sources.get_mut(id) {
            Some(entry) => {
                let before = entry.observers.len();
                entry.observers.retain(|(t, _)| *t != token);
                entry.observers.len() != before
            }
            None => false,
        }
    }
}
