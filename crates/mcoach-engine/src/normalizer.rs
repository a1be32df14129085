//! Canonical-space normalization.
//!
//! Removes translation, scale and in-plane rotation from a skeleton so a
//! user and an expert can be compared joint by joint regardless of where
//! they stand in the frame or how close they are to the camera.
//!
//! - Hand: wrist at the origin, wrist→middle fingertip of length
//!   `target_scale`, wrist→middle knuckle along +x.
//! - Body: hip midpoint at the origin, shoulder width of `target_scale`,
//!   shoulder line horizontal.

use mcoach_models::keypoint::{body, hand};
use mcoach_models::{KeypointType, NormalizationParams, Skeleton, Vec2};
use tracing::debug;

use crate::geometry::{distance, EPSILON};

/// Stateless canonical-space normalizer.
#[derive(Debug, Clone, Copy, Default)]
pub struct Normalizer;

impl Normalizer {
    pub fn new() -> Self {
        Self
    }

    /// Normalize `skeleton` according to its keypoint type.
    ///
    /// Never fails: degenerate reference lengths fall back to scale 1.0 and
    /// degenerate orientation vectors to rotation 0.
    pub fn normalize(&self, skeleton: &Skeleton, target_scale: f64) -> (Skeleton, NormalizationParams) {
        let points = skeleton.points();
        let params = match skeleton.keypoint_type() {
            KeypointType::Hand => self.hand_params(&points, target_scale),
            KeypointType::Body => self.body_params(&points, target_scale),
        };
        let normalized = skeleton.map_points(|p| forward(p, &params));
        (normalized, params)
    }

    /// Reference length used for scale: wrist→middle fingertip or shoulder width.
    pub fn reference_length(&self, skeleton: &Skeleton) -> f64 {
        match skeleton.keypoint_type() {
            KeypointType::Hand => distance(skeleton.point(hand::WRIST), skeleton.point(hand::MIDDLE_TIP)),
            KeypointType::Body => distance(
                skeleton.point(body::LEFT_SHOULDER),
                skeleton.point(body::RIGHT_SHOULDER),
            ),
        }
    }

    fn hand_params(&self, points: &[Vec2], target_scale: f64) -> NormalizationParams {
        let wrist = points[hand::WRIST];
        let translation = -wrist;

        let ref_len = distance(wrist, points[hand::MIDDLE_TIP]);
        let scale = scale_for(ref_len, target_scale);

        let orientation = (points[hand::MIDDLE_MCP] + translation) * scale;
        let rotation = rotation_for(orientation);

        NormalizationParams {
            translation,
            scale,
            rotation,
        }
    }

    fn body_params(&self, points: &[Vec2], target_scale: f64) -> NormalizationParams {
        let hip_center = (points[body::LEFT_HIP] + points[body::RIGHT_HIP]) / 2.0;
        let translation = -hip_center;

        let left_shoulder = points[body::LEFT_SHOULDER];
        let right_shoulder = points[body::RIGHT_SHOULDER];
        let scale = scale_for(distance(left_shoulder, right_shoulder), target_scale);

        let rotation = rotation_for((right_shoulder - left_shoulder) * scale);

        NormalizationParams {
            translation,
            scale,
            rotation,
        }
    }

    /// Forward transform `R(rotation) * (scale * (p + translation))`.
    pub fn apply_transform(&self, points: &[Vec2], params: &NormalizationParams) -> Vec<Vec2> {
        points.iter().map(|&p| forward(p, params)).collect()
    }

    /// Exact inverse of [`Normalizer::apply_transform`].
    pub fn invert_transform(&self, points: &[Vec2], params: &NormalizationParams) -> Vec<Vec2> {
        points.iter().map(|&p| inverse(p, params)).collect()
    }

    /// Map a canonical-space skeleton back into screen space.
    pub fn denormalize(&self, skeleton: &Skeleton, params: &NormalizationParams) -> Skeleton {
        skeleton.map_points(|p| inverse(p, params))
    }
}

fn scale_for(ref_len: f64, target_scale: f64) -> f64 {
    if ref_len > EPSILON {
        target_scale / ref_len
    } else {
        debug!(ref_len, "Degenerate reference length, keeping unit scale");
        1.0
    }
}

fn rotation_for(orientation: Vec2) -> f64 {
    if orientation.norm() > EPSILON {
        -orientation.angle()
    } else {
        debug!("Degenerate orientation vector, skipping rotation");
        0.0
    }
}

fn forward(p: Vec2, params: &NormalizationParams) -> Vec2 {
    ((p + params.translation) * params.scale).rotated(params.rotation)
}

fn inverse(p: Vec2, params: &NormalizationParams) -> Vec2 {
    let scale = if params.scale.abs() > EPSILON { params.scale } else { 1.0 };
    p.rotated(-params.rotation) / scale - params.translation
}
