//! Image model trait and classification result types

use candle_core::Tensor;
use framewatch_core::{Error, Result};

/// Label table used when neither the model nor the settings provide one
pub const DEFAULT_LABELS: [&str; 5] = ["A", "C", "None", "R", "S"];

/// Default label table as owned strings
pub fn default_labels() -> Vec<String> {
    DEFAULT_LABELS.iter().map(|l| l.to_string()).collect()
}

/// Trait for all frame classifiers
pub trait ImageModel: Send + Sync {
    /// Get the model name
    fn name(&self) -> &str;

    /// Square edge length the first layer expects, if the model declares one
    fn input_size(&self) -> Option<usize>;

    /// Channels per pixel the model expects, if it declares them
    fn input_channels(&self) -> Option<usize> {
        None
    }

    /// Ordered class labels, index-aligned with `predict` output
    fn labels(&self) -> Vec<String> {
        default_labels()
    }

    /// Score a batch of one preprocessed frame
    ///
    /// The batch is `(1, S, S)` for single-component frames and
    /// `(1, S, S, C)` otherwise. Returns one score per class.
    fn predict(&self, batch: &Tensor) -> Result<Vec<f32>>;
}

/// Result of classifying one frame
#[derive(Debug, Clone)]
pub struct Classification {
    /// Published label (may be the fallback label when gated)
    pub label: String,

    /// Confidence score of the winning class
    pub score: f32,

    /// Index of the winning class in the score vector
    pub index: usize,

    /// All class scores, in model output order
    pub scores: Vec<f32>,

    /// Whether the label was replaced because the score fell below threshold
    pub gated: bool,

    /// Latency in microseconds
    pub latency_us: u64,
}

impl Classification {
    /// Pick the top-scoring class and map it through the label table
    pub fn from_scores(scores: Vec<f32>, labels: &[String]) -> Result<Self> {
        if scores.len() != labels.len() {
            return Err(Error::inference(format!(
                "model produced {} scores for {} labels",
                scores.len(),
                labels.len()
            )));
        }

        let (index, score) = argmax(&scores)
            .ok_or_else(|| Error::inference("score vector has no finite entries"))?;

        Ok(Self {
            label: labels[index].clone(),
            score,
            index,
            scores,
            gated: false,
            latency_us: 0,
        })
    }

    /// Check if score exceeds threshold
    pub fn exceeds_threshold(&self, threshold: f32) -> bool {
        self.score >= threshold
    }

    /// Score as a percentage, for display
    pub fn percent(&self) -> f32 {
        self.score * 100.0
    }
}

/// Index and value of the largest score; first index wins ties, NaN never wins
pub fn argmax(scores: &[f32]) -> Option<(usize, f32)> {
    scores
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, s)| !s.is_nan())
        .fold(None, |best, (i, s)| match best {
            Some((_, b)) if s <= b => best,
            _ => Some((i, s)),
        })
}
