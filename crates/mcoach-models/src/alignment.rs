//! Normalization and alignment records.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{Matrix3, Skeleton, Vec2, IDENTITY_MATRIX};

/// Parameters of a canonical-space normalization.
///
/// The forward map is `p' = R(rotation) * (scale * (p + translation))`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct NormalizationParams {
    pub translation: Vec2,
    pub scale: f64,
    /// Radians.
    pub rotation: f64,
}

impl Default for NormalizationParams {
    fn default() -> Self {
        Self {
            translation: Vec2::ZERO,
            scale: 1.0,
            rotation: 0.0,
        }
    }
}

/// Expert skeleton placed into the user's screen space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AlignmentResult {
    /// Full expert skeleton after the similarity transform.
    pub aligned_expert: Skeleton,
    /// Homogeneous matrix equal to translate * rotate * scale.
    pub transform_matrix: Matrix3,
    pub scale: f64,
    pub translation: Vec2,
    /// Radians.
    pub rotation: f64,
    /// 0.0 = degraded identity fallback, 1.0 = every anchor trusted.
    pub quality: f64,
}

impl AlignmentResult {
    /// Identity alignment returned when there is not enough trusted data.
    pub fn identity(expert: &Skeleton) -> Self {
        Self {
            aligned_expert: expert.clone(),
            transform_matrix: IDENTITY_MATRIX,
            scale: 1.0,
            translation: Vec2::ZERO,
            rotation: 0.0,
            quality: 0.0,
        }
    }

    /// Whether this result is the degraded identity fallback.
    pub fn is_degraded(&self) -> bool {
        self.quality <= 0.0
    }

    pub fn summary(&self) -> AlignmentSummary {
        AlignmentSummary {
            scale: self.scale,
            translation: self.translation,
            rotation: self.rotation,
            quality: self.quality,
        }
    }
}

/// Transform parameters of an alignment without the projected skeleton.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AlignmentSummary {
    pub scale: f64,
    pub translation: Vec2,
    pub rotation: f64,
    pub quality: f64,
}
