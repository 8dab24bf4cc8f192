//! framewatch Core
//!
//! Core types, traits, and utilities shared across framewatch components.
//!
//! This crate provides:
//! - Frame types and the row-major shape derivation used by preprocessing
//! - The frame source capability and subscription handles
//! - The shared last-class slot polled by display surfaces
//! - Error types and result handling
//! - An in-memory frame source for drivers and tests

pub mod error;
pub mod memory;
pub mod source;
pub mod state;
pub mod types;

pub use error::{Error, Result};
pub use memory::InMemorySource;
pub use source::{FrameCallback, FrameSource, Subscription, SubscriptionToken};
pub use state::{LastClass, LastClassState};
pub use types::{Frame, FrameShape, SourceId};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::source::{FrameSource, Subscription};
    pub use crate::state::LastClassState;
    pub use crate::types::{Frame, FrameShape, SourceId};
}
