//! Shared data models for the MotionCoach feedback core.
//!
//! This crate provides Serde-serializable types for:
//! - Skeletons (hand and body keypoints) with explicit confidence variants
//! - 2-D vectors and 3x3 homogeneous transform matrices
//! - Normalization, alignment and scoring results
//! - Coaching cues
//! - Feedback request/report envelopes and session identifiers

pub mod alignment;
pub mod cue;
pub mod feedback;
pub mod keypoint;
pub mod scoring;
pub mod session;
pub mod skeleton;
pub mod vector;

// Re-export common types
pub use alignment::{AlignmentResult, AlignmentSummary, NormalizationParams};
pub use cue::{Cue, CueCategory, CueDirection};
pub use feedback::{FeedbackReport, FeedbackRequest, SkeletonInput};
pub use keypoint::{KeypointType, KeypointTypeParseError, PackType, PackTypeParseError};
pub use scoring::{ScoringMode, ScoringResult};
pub use session::SessionId;
pub use skeleton::{Confidence, Joint, RowLayout, Skeleton, SkeletonError};
pub use vector::{Matrix3, Vec2, IDENTITY_MATRIX};
