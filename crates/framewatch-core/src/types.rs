//! Core types for framewatch

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::SystemTime;

/// Identifier of an observable frame source (a streaming volume node)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceId(String);

impl SourceId {
    /// Create a new source identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SourceId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for SourceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// One snapshot of a source's pixel buffer
///
/// `dimensions` are reported the way imaging hosts report them: fastest-varying
/// axis first (width, height, depth). Samples are interleaved per pixel when
/// `components > 1`.
#[derive(Debug, Clone)]
pub struct Frame {
    source: SourceId,
    dimensions: [usize; 3],
    components: usize,
    data: Vec<f32>,
    captured_at: SystemTime,
}

impl Frame {
    /// Create a frame from `f32` samples
    pub fn new(
        source: impl Into<SourceId>,
        dimensions: [usize; 3],
        components: usize,
        data: Vec<f32>,
    ) -> Result<Self> {
        if components == 0 {
            return Err(Error::shape("frame must have at least one component"));
        }

        let expected = dimensions
            .iter()
            .try_fold(components, |acc, &d| acc.checked_mul(d))
            .ok_or_else(|| Error::shape(format!("frame dimensions overflow: {:?}", dimensions)))?;

        if data.len() != expected {
            return Err(Error::shape(format!(
                "buffer holds {} samples, dimensions {:?} x {} components need {}",
                data.len(),
                dimensions,
                components,
                expected
            )));
        }

        Ok(Self {
            source: source.into(),
            dimensions,
            components,
            data,
            captured_at: SystemTime::now(),
        })
    }

    /// Create a frame from 8-bit samples
    pub fn from_u8(
        source: impl Into<SourceId>,
        dimensions: [usize; 3],
        components: usize,
        data: &[u8],
    ) -> Result<Self> {
        Self::new(
            source,
            dimensions,
            components,
            data.iter().map(|&v| f32::from(v)).collect(),
        )
    }

    /// Create a frame from 16-bit samples
    pub fn from_u16(
        source: impl Into<SourceId>,
        dimensions: [usize; 3],
        components: usize,
        data: &[u16],
    ) -> Result<Self> {
        Self::new(
            source,
            dimensions,
            components,
            data.iter().map(|&v| f32::from(v)).collect(),
        )
    }

    /// Source this frame was read from
    pub fn source(&self) -> &SourceId {
        &self.source
    }

    /// Dimensions as reported by the source (fastest-varying first)
    pub fn dimensions(&self) -> [usize; 3] {
        self.dimensions
    }

    /// Number of scalar components per pixel
    pub fn components(&self) -> usize {
        self.components
    }

    /// Raw interleaved samples
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// When the frame was captured
    pub fn captured_at(&self) -> SystemTime {
        self.captured_at
    }

    /// Derive the row-major processing shape for this frame
    ///
    /// The reported dimensions are reversed (slowest-varying first) and the
    /// component count becomes a trailing axis when there is more than one
    /// component. The first axis of length 1 is then dropped, so a slice
    /// reported as `(W, H, 1)` or `(W, 1, D)` becomes two-dimensional.
    pub fn processing_shape(&self) -> Result<FrameShape> {
        if self.dimensions.contains(&0) {
            return Err(Error::shape(format!(
                "frame has an empty axis: {:?}",
                self.dimensions
            )));
        }

        let mut axes: Vec<usize> = self.dimensions.iter().rev().copied().collect();
        if self.components > 1 {
            axes.push(self.components);
        }

        let singleton = axes.iter().position(|&d| d == 1).ok_or_else(|| {
            Error::shape(format!(
                "expected a single-slice frame, got dimensions {:?}",
                self.dimensions
            ))
        })?;
        axes.remove(singleton);

        let channels = if self.components > 1 {
            Some(self.components)
        } else {
            None
        };

        Ok(FrameShape {
            height: axes[0],
            width: axes[1],
            channels,
        })
    }
}

/// Row-major layout of a frame: `(H, W)` or `(H, W, C)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameShape {
    pub height: usize,
    pub width: usize,
    /// Trailing channel axis, present only for multi-component frames
    pub channels: Option<usize>,
}

impl FrameShape {
    /// Axis lengths, slowest-varying first
    pub fn dims(&self) -> Vec<usize> {
        match self.channels {
            Some(c) => vec![self.height, self.width, c],
            None => vec![self.height, self.width],
        }
    }

    /// Number of channels (1 when there is no channel axis)
    pub fn channel_count(&self) -> usize {
        self.channels.unwrap_or(1)
    }

    /// Total number of samples
    pub fn len(&self) -> usize {
        self.height * self.width * self.channel_count()
    }

    /// Whether the shape holds no samples
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
