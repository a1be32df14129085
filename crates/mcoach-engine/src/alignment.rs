//! Expert-to-user alignment.
//!
//! Places the expert skeleton into the user's screen space with a
//! similarity transform (uniform scale, rotation, translation) so it can be
//! drawn as an overlay the user steps into.
//!
//! Two modes are available:
//! - `Anchor`: match a few stable joints (wrist and knuckles, or shoulders
//!   and hips). Fast and robust to finger motion.
//! - `Procrustes`: least-squares fit over every trusted joint.
//!
//! Too few trusted joints is not an error: the engine returns the identity
//! transform with `quality = 0.0`.

use std::fmt;
use std::str::FromStr;

use mcoach_models::{AlignmentResult, Skeleton, Vec2};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::error::{CoachError, CoachResult};
use crate::geometry::{centroid, similarity_matrix, transform_point, EPSILON};
use crate::metrics;

/// How the similarity transform is estimated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AlignmentMode {
    /// Match the layout's anchor joints.
    #[default]
    Anchor,
    /// Least-squares fit over every trusted joint.
    Procrustes,
}

impl AlignmentMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlignmentMode::Anchor => "anchor",
            AlignmentMode::Procrustes => "procrustes",
        }
    }
}

impl fmt::Display for AlignmentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when parsing an unknown alignment mode.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown alignment mode: {0}")]
pub struct AlignmentModeParseError(pub String);

impl FromStr for AlignmentMode {
    type Err = AlignmentModeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "anchor" => Ok(AlignmentMode::Anchor),
            "procrustes" => Ok(AlignmentMode::Procrustes),
            _ => Err(AlignmentModeParseError(s.to_string())),
        }
    }
}

/// Least-squares similarity fit of one point set onto another.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityFit {
    pub scale: f64,
    /// Radians.
    pub rotation: f64,
    pub translation: Vec2,
    /// Residual sum of squares divided by the target's centered sum of squares.
    pub disparity: f64,
}

/// Closed-form 2-D similarity fit mapping `source` onto `target`.
///
/// Minimizes `sum |s * R * source_i + t - target_i|^2`. A collapsed source
/// keeps unit scale and zero rotation; a collapsed target reports disparity
/// 1.0.
///
/// # Panics
/// Panics if the slices differ in length.
pub fn procrustes_fit(source: &[Vec2], target: &[Vec2]) -> SimilarityFit {
    assert_eq!(source.len(), target.len(), "point sets must have equal length");

    let source_centroid = centroid(source);
    let target_centroid = centroid(target);

    // Cross-covariance terms of the centered sets
    let mut dot_sum = 0.0;
    let mut cross_sum = 0.0;
    let mut source_ss = 0.0;
    let mut target_ss = 0.0;
    for (&s, &t) in source.iter().zip(target) {
        let a = s - source_centroid;
        let b = t - target_centroid;
        dot_sum += a.dot(b);
        cross_sum += a.cross(b);
        source_ss += a.norm_squared();
        target_ss += b.norm_squared();
    }

    let (scale, rotation) = if source_ss > EPSILON * EPSILON {
        let rotation = cross_sum.atan2(dot_sum);
        let scale = (dot_sum * dot_sum + cross_sum * cross_sum).sqrt() / source_ss;
        (scale, rotation)
    } else {
        (1.0, 0.0)
    };

    let translation = target_centroid - (source_centroid * scale).rotated(rotation);

    let residual: f64 = source
        .iter()
        .zip(target)
        .map(|(&s, &t)| ((s * scale).rotated(rotation) + translation - t).norm_squared())
        .sum();
    let disparity = if target_ss > EPSILON * EPSILON {
        residual / target_ss
    } else {
        1.0
    };

    SimilarityFit {
        scale,
        rotation,
        translation,
        disparity,
    }
}

/// Stateless expert-to-user alignment.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlignmentEngine {
    mode: AlignmentMode,
}

impl AlignmentEngine {
    pub fn new(mode: AlignmentMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> AlignmentMode {
        self.mode
    }

    /// Align `expert` onto `user`.
    ///
    /// `anchor_indices` defaults to the keypoint type's anchors and is only
    /// used in anchor mode. Joints are trusted when the user's confidence is
    /// at least `confidence_threshold`; a user skeleton without confidence
    /// trusts every joint.
    pub fn align(
        &self,
        expert: &Skeleton,
        user: &Skeleton,
        anchor_indices: Option<&[usize]>,
        confidence_threshold: f64,
    ) -> CoachResult<AlignmentResult> {
        if user.len() != expert.len() {
            return Err(CoachError::shape_mismatch(user.len(), expert.len()));
        }

        let result = match self.mode {
            AlignmentMode::Anchor => {
                let anchors = anchor_indices.unwrap_or_else(|| user.keypoint_type().default_anchors());
                self.align_anchors(expert, user, anchors, confidence_threshold)?
            }
            AlignmentMode::Procrustes => self.align_procrustes(expert, user, confidence_threshold),
        };

        metrics::record_alignment(self.mode.as_str(), result.quality, result.is_degraded());
        Ok(result)
    }

    fn align_anchors(
        &self,
        expert: &Skeleton,
        user: &Skeleton,
        anchors: &[usize],
        confidence_threshold: f64,
    ) -> CoachResult<AlignmentResult> {
        if let Some(&index) = anchors.iter().find(|&&i| i >= user.len()) {
            return Err(CoachError::AnchorOutOfRange {
                index,
                len: user.len(),
            });
        }

        let valid: Vec<usize> = anchors
            .iter()
            .copied()
            .filter(|&i| is_trusted(user, i, confidence_threshold))
            .collect();

        if valid.len() < 2 {
            warn!(
                keypoint_type = %user.keypoint_type(),
                valid_anchors = valid.len(),
                "Not enough trusted anchors, using identity alignment"
            );
            return Ok(AlignmentResult::identity(expert));
        }

        let expert_pts: Vec<Vec2> = valid.iter().map(|&i| expert.point(i)).collect();
        let user_pts: Vec<Vec2> = valid.iter().map(|&i| user.point(i)).collect();
        let (scale, rotation, translation) = anchor_transform(&expert_pts, &user_pts);
        let quality = valid.len() as f64 / anchors.len() as f64;

        debug!(scale, rotation, quality, "Anchor alignment computed");

        Ok(self.build_result(expert, scale, translation, rotation, quality))
    }

    fn align_procrustes(
        &self,
        expert: &Skeleton,
        user: &Skeleton,
        confidence_threshold: f64,
    ) -> AlignmentResult {
        let valid: Vec<usize> = (0..user.len())
            .filter(|&i| is_trusted(user, i, confidence_threshold))
            .collect();

        if valid.len() < 2 {
            warn!(
                keypoint_type = %user.keypoint_type(),
                valid_joints = valid.len(),
                "Not enough trusted joints, using identity alignment"
            );
            return AlignmentResult::identity(expert);
        }

        let expert_pts: Vec<Vec2> = valid.iter().map(|&i| expert.point(i)).collect();
        let user_pts: Vec<Vec2> = valid.iter().map(|&i| user.point(i)).collect();
        let fit = procrustes_fit(&expert_pts, &user_pts);
        let quality = (1.0 - fit.disparity).clamp(0.0, 1.0);

        debug!(
            scale = fit.scale,
            rotation = fit.rotation,
            disparity = fit.disparity,
            "Procrustes alignment computed"
        );

        self.build_result(expert, fit.scale, fit.translation, fit.rotation, quality)
    }

    fn build_result(
        &self,
        expert: &Skeleton,
        scale: f64,
        translation: Vec2,
        rotation: f64,
        quality: f64,
    ) -> AlignmentResult {
        AlignmentResult {
            aligned_expert: self.apply_similarity_transform(expert, scale, translation, rotation),
            transform_matrix: similarity_matrix(scale, translation, rotation),
            scale,
            translation,
            rotation,
            quality,
        }
    }

    /// Project every joint of `skeleton` through `translate * rotate * scale`.
    pub fn apply_similarity_transform(
        &self,
        skeleton: &Skeleton,
        scale: f64,
        translation: Vec2,
        rotation: f64,
    ) -> Skeleton {
        let matrix = similarity_matrix(scale, translation, rotation);
        skeleton.map_points(|p| transform_point(p, &matrix))
    }
}

fn is_trusted(skeleton: &Skeleton, index: usize, threshold: f64) -> bool {
    skeleton
        .confidence()
        .map_or(true, |values| values[index] >= threshold)
}

/// Scale, rotation and translation from paired trusted anchors.
///
/// Scale is the ratio of RMS anchor-to-centroid distances; rotation aligns
/// the vector between the first two anchors.
fn anchor_transform(expert: &[Vec2], user: &[Vec2]) -> (f64, f64, Vec2) {
    let expert_center = centroid(expert);
    let user_center = centroid(user);

    let expert_rms = rms_radius(expert, expert_center);
    let user_rms = rms_radius(user, user_center);
    let scale = if expert_rms > EPSILON {
        user_rms / expert_rms
    } else {
        debug!("Expert anchors collapsed, keeping unit scale");
        1.0
    };

    let v_expert = expert[1] - expert[0];
    let v_user = user[1] - user[0];
    let rotation = if v_expert.norm() > EPSILON && v_user.norm() > EPSILON {
        let delta = v_user.angle() - v_expert.angle();
        delta.sin().atan2(delta.cos())
    } else {
        0.0
    };

    let translation = user_center - (expert_center * scale).rotated(rotation);
    (scale, rotation, translation)
}

fn rms_radius(points: &[Vec2], center: Vec2) -> f64 {
    let sum: f64 = points.iter().map(|&p| (p - center).norm_squared()).sum();
    (sum / points.len() as f64).sqrt()
}
