//! Per-frame similarity scoring.
//!
//! Combines a weighted positional error and a joint-angle error into a
//! 0-100 score, smoothed across frames with an EMA. One engine instance
//! holds the smoothing state of one session.

use std::collections::BTreeMap;

use mcoach_models::keypoint::hand;
use mcoach_models::{KeypointType, ScoringMode, ScoringResult, Skeleton};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CoachError, CoachResult};
use crate::filters::{mean, EmaFilter};
use crate::geometry::{angle_at_joint, distance};
use crate::metrics;

/// Scoring engine configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub mode: ScoringMode,
    /// Weight of the positional score in combined mode
    pub position_weight: f64,
    /// Weight of the angular score in combined mode
    pub angle_weight: f64,
    /// EMA smoothing factor for `overall_score`
    pub ema_alpha: f64,
    /// Error-to-score slope: `score = 100 - k * error`
    pub k_scaling: f64,
    /// Number of worst joints reported
    pub top_n: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            mode: ScoringMode::Combined,
            position_weight: 0.6,
            angle_weight: 0.4,
            ema_alpha: 0.3,
            k_scaling: 500.0,
            top_n: 3,
        }
    }
}

impl ScoringConfig {
    /// Hand tracking: positions and finger angles both matter.
    pub fn for_hand() -> Self {
        Self::default()
    }

    /// Body tracking: positions only.
    pub fn for_body() -> Self {
        Self {
            mode: ScoringMode::Positional,
            ..Self::default()
        }
    }

    /// Default configuration for a keypoint layout.
    pub fn for_keypoint_type(keypoint_type: KeypointType) -> Self {
        match keypoint_type {
            KeypointType::Hand => Self::for_hand(),
            KeypointType::Body => Self::for_body(),
        }
    }
}

/// Positional weight of a joint. Fingertips count more on hands.
pub fn joint_weight(keypoint_type: KeypointType, index: usize) -> f64 {
    match (keypoint_type, index) {
        (KeypointType::Hand, hand::THUMB_TIP | hand::INDEX_TIP | hand::MIDDLE_TIP) => 1.5,
        (KeypointType::Hand, hand::RING_TIP | hand::PINKY_TIP) => 1.2,
        _ => 1.0,
    }
}

/// Convert an error to a 0-100 score: `clamp(100 - k * error, 0, 100)`.
pub fn error_to_score(error: f64, k_scaling: f64) -> f64 {
    (100.0 - k_scaling * error).clamp(0.0, 100.0)
}

/// Indices of the `n` largest errors, worst first; ties keep ascending index.
pub fn top_error_joints(per_joint_errors: &BTreeMap<usize, f64>, n: usize) -> Vec<usize> {
    let mut sorted: Vec<(usize, f64)> = per_joint_errors.iter().map(|(&i, &e)| (i, e)).collect();
    sorted.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    sorted.into_iter().take(n).map(|(i, _)| i).collect()
}

/// Stateful per-session scorer.
#[derive(Debug, Clone)]
pub struct ScoringEngine {
    config: ScoringConfig,
    ema: EmaFilter,
}

impl ScoringEngine {
    pub fn new(config: ScoringConfig) -> Self {
        Self {
            ema: EmaFilter::new(config.ema_alpha),
            config,
        }
    }

    /// Engine with the default configuration of a keypoint layout.
    pub fn for_keypoint_type(keypoint_type: KeypointType) -> Self {
        Self::new(ScoringConfig::for_keypoint_type(keypoint_type))
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Current smoothed score, `None` before the first frame or after a reset.
    pub fn smoothed_score(&self) -> Option<f64> {
        self.ema.value()
    }

    /// Score one frame.
    ///
    /// `confidence_mask[i] == false` excludes joint `i` from the positional
    /// error and from every angle triplet it belongs to.
    pub fn score_frame(
        &mut self,
        user: &Skeleton,
        expert: &Skeleton,
        confidence_mask: Option<&[bool]>,
    ) -> CoachResult<ScoringResult> {
        if user.len() != expert.len() {
            return Err(CoachError::shape_mismatch(user.len(), expert.len()));
        }
        if let Some(mask) = confidence_mask {
            if mask.len() != user.len() {
                return Err(CoachError::MaskLengthMismatch {
                    mask: mask.len(),
                    joints: user.len(),
                });
            }
        }

        let (positional_error, per_joint_errors) =
            self.compute_positional_error(user, expert, confidence_mask);
        let positional_score = self.error_to_score(positional_error);

        let angular_error = self.compute_angular_error(user, expert, confidence_mask);
        let angular_score = self.error_to_score(angular_error);

        let raw_score = match self.config.mode {
            ScoringMode::Positional => positional_score,
            ScoringMode::Angular => angular_score,
            ScoringMode::Combined => {
                self.config.position_weight * positional_score
                    + self.config.angle_weight * angular_score
            }
        };

        let overall_score = self.ema.update(raw_score);
        let top_error_joints = top_error_joints(&per_joint_errors, self.config.top_n);

        debug!(
            keypoint_type = %user.keypoint_type(),
            raw_score,
            overall_score,
            positional_error,
            angular_error,
            "Frame scored"
        );
        metrics::record_frame_scored(
            user.keypoint_type().as_str(),
            self.config.mode.as_str(),
            raw_score,
        );

        Ok(ScoringResult {
            overall_score,
            raw_score,
            positional_score,
            angular_score,
            timing_penalty: 0.0,
            per_joint_errors,
            top_error_joints,
        })
    }

    /// Weighted mean joint distance over unmasked joints, with per-joint distances.
    ///
    /// Returns 0.0 when every joint is masked.
    pub fn compute_positional_error(
        &self,
        user: &Skeleton,
        expert: &Skeleton,
        mask: Option<&[bool]>,
    ) -> (f64, BTreeMap<usize, f64>) {
        let keypoint_type = user.keypoint_type();
        let mut per_joint_errors = BTreeMap::new();
        let mut weighted_error = 0.0;
        let mut total_weight = 0.0;

        for idx in (0..user.len()).filter(|&i| is_unmasked(mask, i)) {
            let weight = joint_weight(keypoint_type, idx);
            let dist = distance(user.point(idx), expert.point(idx));
            per_joint_errors.insert(idx, dist);
            weighted_error += weight * dist;
            total_weight += weight;
        }

        if total_weight == 0.0 {
            return (0.0, per_joint_errors);
        }
        (weighted_error / total_weight, per_joint_errors)
    }

    /// Mean absolute joint-angle difference across kinematic chains, in units of 180°.
    pub fn compute_angular_error(
        &self,
        user: &Skeleton,
        expert: &Skeleton,
        mask: Option<&[bool]>,
    ) -> f64 {
        let chain_errors: Vec<f64> = user
            .keypoint_type()
            .chains()
            .into_iter()
            .filter_map(|chain| {
                let diffs: Vec<f64> = chain
                    .windows(3)
                    .filter(|t| t.iter().all(|&i| is_unmasked(mask, i)))
                    .map(|t| {
                        let user_angle = angle_at_joint(user.point(t[0]), user.point(t[1]), user.point(t[2]));
                        let expert_angle =
                            angle_at_joint(expert.point(t[0]), expert.point(t[1]), expert.point(t[2]));
                        (user_angle - expert_angle).abs()
                    })
                    .collect();
                (!diffs.is_empty()).then(|| mean(&diffs))
            })
            .collect();

        mean(&chain_errors) / 180.0
    }

    pub fn error_to_score(&self, error: f64) -> f64 {
        error_to_score(error, self.config.k_scaling)
    }

    /// Clear the smoothing state; the next frame's score is not blended.
    pub fn reset(&mut self) {
        self.ema.reset();
    }
}

impl Default for ScoringEngine {
    fn default() -> Self {
        Self::new(ScoringConfig::default())
    }
}

fn is_unmasked(mask: Option<&[bool]>, index: usize) -> bool {
    mask.map_or(true, |m| m[index])
}
