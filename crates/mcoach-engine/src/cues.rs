//! Rule-based coaching cues.
//!
//! Each detector looks at one kind of mistake (position, rotation, finger
//! spread, finger curl, timing) and emits at most one finding per finger or
//! per frame. Findings are phrased through a fixed template table, then
//! deduplicated, ranked by priority and truncated.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use mcoach_models::keypoint::{body, hand};
use mcoach_models::{Cue, CueCategory, CueDirection, KeypointType, Skeleton, Vec2};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CoachError, CoachResult};
use crate::filters::mean;
use crate::geometry::{angle_at_joint, bearing_degrees, centroid, distance, wrap_degrees, EPSILON};
use crate::scoring::error_to_score;

pub const POSITION_PRIORITY: f64 = 0.9;
pub const ROTATION_PRIORITY: f64 = 0.8;
pub const SPREAD_PRIORITY: f64 = 0.7;
pub const CURL_PRIORITY: f64 = 0.65;
pub const TIMING_PRIORITY: f64 = 0.6;

/// Cue mapper thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CueMapperConfig {
    /// Minimum centroid offset (coordinate units) for a position cue
    pub position_threshold: f64,
    /// Minimum orientation or joint-angle difference (degrees)
    pub angle_threshold: f64,
    /// Allowed deviation of the fingertip spread ratio from 1.0
    pub spread_threshold: f64,
    /// Minimum timing offset magnitude for a timing cue
    pub timing_threshold: f64,
    /// Error-to-score slope used for positive reinforcement
    pub k_scaling: f64,
    /// Phrase horizontal cues for a mirrored (selfie) preview
    pub mirror_x: bool,
}

impl Default for CueMapperConfig {
    fn default() -> Self {
        Self {
            position_threshold: 0.08,
            angle_threshold: 15.0,
            spread_threshold: 0.1,
            timing_threshold: 0.2,
            k_scaling: 500.0,
            mirror_x: true,
        }
    }
}

impl CueMapperConfig {
    /// Looser thresholds for beginners.
    pub fn lenient() -> Self {
        Self {
            position_threshold: 0.12,
            angle_threshold: 25.0,
            spread_threshold: 0.2,
            timing_threshold: 0.35,
            ..Self::default()
        }
    }

    /// Tighter thresholds for fine-grained practice.
    pub fn strict() -> Self {
        Self {
            position_threshold: 0.05,
            angle_threshold: 10.0,
            spread_threshold: 0.05,
            timing_threshold: 0.1,
            ..Self::default()
        }
    }
}

/// Fixed cue phrasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CueTemplate {
    HandTooHigh,
    HandTooLow,
    HandTooLeft,
    HandTooRight,
    BodyTooHigh,
    BodyTooLow,
    BodyTooLeft,
    BodyTooRight,
    WristRotateCw,
    WristRotateCcw,
    ShouldersRotateCw,
    ShouldersRotateCcw,
    FingersTooClosed,
    FingersTooOpen,
    ThumbPosition,
    IndexCurl,
    IndexExtend,
    MiddleCurl,
    MiddleExtend,
    RingCurl,
    RingExtend,
    PinkyCurl,
    PinkyExtend,
    GoingTooFast,
    GoingTooSlow,
    Perfect,
    GreatJob,
    AlmostThere,
}

impl CueTemplate {
    /// Template key.
    pub fn as_str(&self) -> &'static str {
        match self {
            CueTemplate::HandTooHigh => "hand_too_high",
            CueTemplate::HandTooLow => "hand_too_low",
            CueTemplate::HandTooLeft => "hand_too_left",
            CueTemplate::HandTooRight => "hand_too_right",
            CueTemplate::BodyTooHigh => "body_too_high",
            CueTemplate::BodyTooLow => "body_too_low",
            CueTemplate::BodyTooLeft => "body_too_left",
            CueTemplate::BodyTooRight => "body_too_right",
            CueTemplate::WristRotateCw => "wrist_rotate_cw",
            CueTemplate::WristRotateCcw => "wrist_rotate_ccw",
            CueTemplate::ShouldersRotateCw => "shoulders_rotate_cw",
            CueTemplate::ShouldersRotateCcw => "shoulders_rotate_ccw",
            CueTemplate::FingersTooClosed => "fingers_too_closed",
            CueTemplate::FingersTooOpen => "fingers_too_open",
            CueTemplate::ThumbPosition => "thumb_position",
            CueTemplate::IndexCurl => "index_curl",
            CueTemplate::IndexExtend => "index_extend",
            CueTemplate::MiddleCurl => "middle_curl",
            CueTemplate::MiddleExtend => "middle_extend",
            CueTemplate::RingCurl => "ring_curl",
            CueTemplate::RingExtend => "ring_extend",
            CueTemplate::PinkyCurl => "pinky_curl",
            CueTemplate::PinkyExtend => "pinky_extend",
            CueTemplate::GoingTooFast => "going_too_fast",
            CueTemplate::GoingTooSlow => "going_too_slow",
            CueTemplate::Perfect => "perfect",
            CueTemplate::GreatJob => "great_job",
            CueTemplate::AlmostThere => "almost_there",
        }
    }

    pub fn text(&self) -> &'static str {
        match self {
            CueTemplate::HandTooHigh => "Lower your hand slightly",
            CueTemplate::HandTooLow => "Raise your hand",
            CueTemplate::HandTooLeft => "Move hand to the right",
            CueTemplate::HandTooRight => "Move hand to the left",
            CueTemplate::BodyTooHigh => "Move down a little",
            CueTemplate::BodyTooLow => "Move up a little",
            CueTemplate::BodyTooLeft => "Step to the right",
            CueTemplate::BodyTooRight => "Step to the left",
            CueTemplate::WristRotateCw => "Rotate wrist clockwise",
            CueTemplate::WristRotateCcw => "Rotate wrist counter-clockwise",
            CueTemplate::ShouldersRotateCw => "Turn your shoulders clockwise",
            CueTemplate::ShouldersRotateCcw => "Turn your shoulders counter-clockwise",
            CueTemplate::FingersTooClosed => "Open your fingers wider",
            CueTemplate::FingersTooOpen => "Close your fingers slightly",
            CueTemplate::ThumbPosition => "Adjust your thumb position",
            CueTemplate::IndexCurl => "Curl your index finger more",
            CueTemplate::IndexExtend => "Extend your index finger",
            CueTemplate::MiddleCurl => "Curl your middle finger",
            CueTemplate::MiddleExtend => "Extend your middle finger",
            CueTemplate::RingCurl => "Curl your ring finger",
            CueTemplate::RingExtend => "Extend your ring finger",
            CueTemplate::PinkyCurl => "Curl your pinky",
            CueTemplate::PinkyExtend => "Extend your pinky",
            CueTemplate::GoingTooFast => "Slow down a bit",
            CueTemplate::GoingTooSlow => "Try to keep up with the pace",
            CueTemplate::Perfect => "Perfect! Keep it up!",
            CueTemplate::GreatJob => "Great job! Almost perfect!",
            CueTemplate::AlmostThere => "Almost there! Small adjustment needed",
        }
    }

    pub fn category(&self) -> CueCategory {
        match self {
            CueTemplate::HandTooHigh
            | CueTemplate::HandTooLow
            | CueTemplate::HandTooLeft
            | CueTemplate::HandTooRight
            | CueTemplate::BodyTooHigh
            | CueTemplate::BodyTooLow
            | CueTemplate::BodyTooLeft
            | CueTemplate::BodyTooRight => CueCategory::Position,
            CueTemplate::WristRotateCw
            | CueTemplate::WristRotateCcw
            | CueTemplate::ShouldersRotateCw
            | CueTemplate::ShouldersRotateCcw => CueCategory::Rotation,
            CueTemplate::FingersTooClosed | CueTemplate::FingersTooOpen => CueCategory::Spread,
            CueTemplate::ThumbPosition
            | CueTemplate::IndexCurl
            | CueTemplate::IndexExtend
            | CueTemplate::MiddleCurl
            | CueTemplate::MiddleExtend
            | CueTemplate::RingCurl
            | CueTemplate::RingExtend
            | CueTemplate::PinkyCurl
            | CueTemplate::PinkyExtend => CueCategory::Curl,
            CueTemplate::GoingTooFast | CueTemplate::GoingTooSlow => CueCategory::Timing,
            CueTemplate::Perfect | CueTemplate::GreatJob | CueTemplate::AlmostThere => {
                CueCategory::Global
            }
        }
    }

    /// Build a cue from this template.
    pub fn to_cue(
        self,
        priority: f64,
        affected_joints: impl IntoIterator<Item = usize>,
        direction: Option<CueDirection>,
    ) -> Cue {
        Cue {
            text: self.text().to_string(),
            category: self.category(),
            priority,
            affected_joints: affected_joints.into_iter().collect::<BTreeSet<_>>(),
            direction,
        }
    }

    fn finger(finger: usize, curl: bool) -> Self {
        match (finger, curl) {
            (1, true) => CueTemplate::IndexCurl,
            (1, false) => CueTemplate::IndexExtend,
            (2, true) => CueTemplate::MiddleCurl,
            (2, false) => CueTemplate::MiddleExtend,
            (3, true) => CueTemplate::RingCurl,
            (3, false) => CueTemplate::RingExtend,
            (4, true) => CueTemplate::PinkyCurl,
            (4, false) => CueTemplate::PinkyExtend,
            _ => CueTemplate::ThumbPosition,
        }
    }
}

/// Converts error signals into ranked, human-readable cues.
#[derive(Debug, Clone, Copy, Default)]
pub struct CueMapper {
    config: CueMapperConfig,
}

impl CueMapper {
    pub fn new(config: CueMapperConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CueMapperConfig {
        &self.config
    }

    /// Generate at most `max_cues` cues, highest priority first, unique by text.
    ///
    /// `timing_offset` is positive when the user is ahead of the expert.
    pub fn generate_cues(
        &self,
        user: &Skeleton,
        expert: &Skeleton,
        per_joint_errors: &BTreeMap<usize, f64>,
        top_error_joints: &[usize],
        timing_offset: f64,
        max_cues: usize,
    ) -> CoachResult<Vec<Cue>> {
        if user.len() != expert.len() {
            return Err(CoachError::shape_mismatch(user.len(), expert.len()));
        }
        let keypoint_type = user.keypoint_type();
        let mut cues = Vec::new();

        if let Some((template, direction)) = self.detect_position_error(user, expert) {
            cues.push(template.to_cue(POSITION_PRIORITY, 0..user.len(), Some(direction)));
        }

        if let Some((template, direction)) = self.detect_rotation_error(user, expert) {
            let joints: &[usize] = match keypoint_type {
                KeypointType::Hand => &[hand::WRIST],
                KeypointType::Body => &[body::LEFT_SHOULDER, body::RIGHT_SHOULDER],
            };
            cues.push(template.to_cue(ROTATION_PRIORITY, joints.iter().copied(), Some(direction)));
        }

        if keypoint_type == KeypointType::Hand {
            if let Some(template) = self.detect_spread_error(user, expert) {
                cues.push(template.to_cue(SPREAD_PRIORITY, hand::FINGERTIPS, None));
            }
            cues.extend(self.curl_cues(user, expert, top_error_joints));
        }

        if let Some(template) = self.detect_timing_error(timing_offset) {
            cues.push(template.to_cue(TIMING_PRIORITY, [], None));
        }

        let mean_error = mean(&per_joint_errors.values().copied().collect::<Vec<_>>());
        if let Some(cue) = self.positive_cue(error_to_score(mean_error, self.config.k_scaling)) {
            cues.push(cue);
        }

        let mut cues = deduplicate_cues(cues);
        cues.sort_by(|a, b| {
            b.priority
                .partial_cmp(&a.priority)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        cues.truncate(max_cues);

        debug!(
            keypoint_type = %keypoint_type,
            cue_count = cues.len(),
            "Cues generated"
        );
        Ok(cues)
    }

    /// Dominant-axis centroid offset of user relative to expert.
    ///
    /// Coordinates are image coordinates with y growing downward. A positive
    /// vertical offset (user centroid below the expert's) is "too low" and
    /// asks the user to raise it; a negative one asks them to lower it.
    pub fn detect_position_error(
        &self,
        user: &Skeleton,
        expert: &Skeleton,
    ) -> Option<(CueTemplate, CueDirection)> {
        let diff = centroid(&user.points()) - centroid(&expert.points());
        let vertical = diff.y.abs() > diff.x.abs();
        let offset = if vertical { diff.y } else { diff.x };
        if offset.abs() < self.config.position_threshold {
            return None;
        }

        let is_hand = user.keypoint_type() == KeypointType::Hand;
        let finding = if vertical {
            match (offset > 0.0, is_hand) {
                (true, true) => (CueTemplate::HandTooLow, CueDirection::Up),
                (true, false) => (CueTemplate::BodyTooLow, CueDirection::Up),
                (false, true) => (CueTemplate::HandTooHigh, CueDirection::Down),
                (false, false) => (CueTemplate::BodyTooHigh, CueDirection::Down),
            }
        } else {
            // In a mirrored preview the user sees image +x as their left.
            let shifted_left = (offset > 0.0) == self.config.mirror_x;
            match (shifted_left, is_hand) {
                (true, true) => (CueTemplate::HandTooLeft, CueDirection::Right),
                (true, false) => (CueTemplate::BodyTooLeft, CueDirection::Right),
                (false, true) => (CueTemplate::HandTooRight, CueDirection::Left),
                (false, false) => (CueTemplate::BodyTooRight, CueDirection::Left),
            }
        };
        Some(finding)
    }

    /// Orientation difference of wrist→middle knuckle (hand) or the shoulder line (body).
    pub fn detect_rotation_error(
        &self,
        user: &Skeleton,
        expert: &Skeleton,
    ) -> Option<(CueTemplate, CueDirection)> {
        let (from, to) = match user.keypoint_type() {
            KeypointType::Hand => (hand::WRIST, hand::MIDDLE_MCP),
            KeypointType::Body => (body::LEFT_SHOULDER, body::RIGHT_SHOULDER),
        };
        let user_vec = user.point(to) - user.point(from);
        let expert_vec = expert.point(to) - expert.point(from);
        if user_vec.norm() < EPSILON || expert_vec.norm() < EPSILON {
            return None;
        }

        let delta = wrap_degrees(
            bearing_degrees(user.point(from), user.point(to))
                - bearing_degrees(expert.point(from), expert.point(to)),
        );
        if delta.abs() < self.config.angle_threshold {
            return None;
        }

        let is_hand = user.keypoint_type() == KeypointType::Hand;
        let finding = match (delta > 0.0, is_hand) {
            (true, true) => (CueTemplate::WristRotateCcw, CueDirection::Ccw),
            (true, false) => (CueTemplate::ShouldersRotateCcw, CueDirection::Ccw),
            (false, true) => (CueTemplate::WristRotateCw, CueDirection::Cw),
            (false, false) => (CueTemplate::ShouldersRotateCw, CueDirection::Cw),
        };
        Some(finding)
    }

    /// Mean adjacent-fingertip distance of user relative to expert.
    pub fn detect_spread_error(&self, user: &Skeleton, expert: &Skeleton) -> Option<CueTemplate> {
        let spread_expert = fingertip_spread(&expert.points());
        if spread_expert < EPSILON {
            return None;
        }
        let ratio = fingertip_spread(&user.points()) / spread_expert;
        if ratio < 1.0 - self.config.spread_threshold {
            Some(CueTemplate::FingersTooClosed)
        } else if ratio > 1.0 + self.config.spread_threshold {
            Some(CueTemplate::FingersTooOpen)
        } else {
            None
        }
    }

    /// One curl/extend cue per finger that contains a top-error joint.
    ///
    /// A finger straighter than the expert's (larger angle at its middle
    /// joint) needs to curl; a more bent one needs to extend.
    fn curl_cues(&self, user: &Skeleton, expert: &Skeleton, top_error_joints: &[usize]) -> Vec<Cue> {
        hand::FINGER_CHAINS
            .iter()
            .enumerate()
            .filter(|(_, chain)| chain.iter().any(|j| top_error_joints.contains(j)))
            .filter_map(|(finger, chain)| {
                let (p1, p2, p3) = (chain[1], chain[2], chain[3]);
                let angle_user = angle_at_joint(user.point(p1), user.point(p2), user.point(p3));
                let angle_expert = angle_at_joint(expert.point(p1), expert.point(p2), expert.point(p3));
                let delta = angle_user - angle_expert;
                if delta.abs() < self.config.angle_threshold {
                    return None;
                }
                debug!(finger = hand::FINGER_NAMES[finger], delta, "Finger angle off");
                let template = CueTemplate::finger(finger, delta > 0.0);
                Some(template.to_cue(CURL_PRIORITY, chain.iter().copied(), None))
            })
            .collect()
    }

    pub fn detect_timing_error(&self, timing_offset: f64) -> Option<CueTemplate> {
        if timing_offset > self.config.timing_threshold {
            Some(CueTemplate::GoingTooFast)
        } else if timing_offset < -self.config.timing_threshold {
            Some(CueTemplate::GoingTooSlow)
        } else {
            None
        }
    }

    /// Encouragement for a good approximate score.
    pub fn positive_cue(&self, score: f64) -> Option<Cue> {
        let (template, priority) = if score >= 95.0 {
            (CueTemplate::Perfect, 0.5)
        } else if score >= 85.0 {
            (CueTemplate::GreatJob, 0.3)
        } else if score >= 75.0 {
            (CueTemplate::AlmostThere, 0.2)
        } else {
            return None;
        };
        Some(template.to_cue(priority, [], None))
    }
}

/// Drop cues whose text was already seen, keeping the first.
pub fn deduplicate_cues(cues: Vec<Cue>) -> Vec<Cue> {
    let mut seen = HashSet::new();
    cues.into_iter()
        .filter(|cue| seen.insert(cue.text.clone()))
        .collect()
}

fn fingertip_spread(points: &[Vec2]) -> f64 {
    let dists: Vec<f64> = hand::FINGERTIPS
        .windows(2)
        .map(|pair| distance(points[pair[0]], points[pair[1]]))
        .collect();
    mean(&dists)
}
