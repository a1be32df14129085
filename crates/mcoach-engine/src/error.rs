//! Error types for the feedback engine.

use mcoach_models::SkeletonError;
use thiserror::Error;

/// Result type for engine operations.
pub type CoachResult<T> = Result<T, CoachError>;

/// Errors that can occur while comparing skeletons.
///
/// Low confidence and degenerate geometry are not errors; they produce
/// degraded results instead. Only malformed input fails.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoachError {
    #[error("Shape mismatch: user has {user} joints, expert has {expert}")]
    ShapeMismatch { user: usize, expert: usize },

    #[error("Anchor index {index} is outside a {len}-joint skeleton")]
    AnchorOutOfRange { index: usize, len: usize },

    #[error("Confidence mask has {mask} entries for {joints} joints")]
    MaskLengthMismatch { mask: usize, joints: usize },

    #[error("Invalid skeleton: {0}")]
    Skeleton(#[from] SkeletonError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl CoachError {
    /// Create a shape mismatch error from two joint counts.
    pub fn shape_mismatch(user: usize, expert: usize) -> Self {
        Self::ShapeMismatch { user, expert }
    }

    /// Create an invalid request error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }
}

/// Errors from an optional cue polisher.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PolishError {
    #[error("Polisher unavailable: {0}")]
    Unavailable(String),

    #[error("Polisher returned an unusable answer: {0}")]
    InvalidOutput(String),
}
