//! Synthetic skeletons for tests and benchmarks. Hidden from the public
//! docs; helpers panic on malformed input.
//!
//! The hand is an open right hand in normalized image coordinates (y grows
//! downward) with straight fingers; the body is a front-facing standing pose.

use mcoach_models::keypoint::hand::FINGER_CHAINS;
use mcoach_models::{Joint, KeypointType, Skeleton, Vec2};

const WRIST: Vec2 = Vec2 { x: 0.5, y: 0.8 };

/// (direction from straight up in radians, distance of the first chain joint, segment length)
const FINGER_RAYS: [(f64, f64, f64); 5] = [
    (-0.8, 0.04, 0.035),
    (-0.25, 0.1, 0.035),
    (0.0, 0.1, 0.04),
    (0.2, 0.1, 0.035),
    (0.4, 0.09, 0.03),
];

/// Points of the reference open hand.
pub fn hand_points() -> Vec<Vec2> {
    let mut points = vec![WRIST; 21];
    for (chain, &(direction, base, segment)) in FINGER_CHAINS.iter().zip(FINGER_RAYS.iter()) {
        let ray = Vec2::new(direction.sin(), -direction.cos());
        for (step, &joint) in chain[1..].iter().enumerate() {
            points[joint] = WRIST + ray * (base + segment * step as f64);
        }
    }
    points
}

/// Reference open hand without confidence.
pub fn hand_skeleton() -> Skeleton {
    skeleton_from(KeypointType::Hand, &hand_points())
}

/// Reference open hand with the same confidence on every joint.
pub fn hand_with_confidence(confidence: f64) -> Skeleton {
    with_confidence(&hand_skeleton(), vec![confidence; 21])
}

/// Copy of `points` with finger `finger` (0 = thumb) bent by `radians` at
/// its middle joint.
pub fn bend_finger(points: &[Vec2], finger: usize, radians: f64) -> Vec<Vec2> {
    let mut bent = points.to_vec();
    let chain = FINGER_CHAINS[finger];
    let pivot = points[chain[2]];
    for &joint in &chain[3..] {
        bent[joint] = pivot + (points[joint] - pivot).rotated(radians);
    }
    bent
}

/// Points of the reference standing body.
pub fn body_points() -> Vec<Vec2> {
    let mut points = vec![Vec2::new(0.5, 0.2); 33];
    let layout: [(usize, f64, f64); 32] = [
        (1, 0.49, 0.18),
        (2, 0.48, 0.18),
        (3, 0.47, 0.18),
        (4, 0.51, 0.18),
        (5, 0.52, 0.18),
        (6, 0.53, 0.18),
        (7, 0.46, 0.19),
        (8, 0.54, 0.19),
        (9, 0.49, 0.23),
        (10, 0.51, 0.23),
        (11, 0.4, 0.35),
        (12, 0.6, 0.35),
        (13, 0.35, 0.5),
        (14, 0.65, 0.5),
        (15, 0.34, 0.63),
        (16, 0.66, 0.63),
        (17, 0.33, 0.66),
        (18, 0.67, 0.66),
        (19, 0.345, 0.67),
        (20, 0.655, 0.67),
        (21, 0.35, 0.65),
        (22, 0.65, 0.65),
        (23, 0.44, 0.65),
        (24, 0.56, 0.65),
        (25, 0.43, 0.8),
        (26, 0.57, 0.8),
        (27, 0.435, 0.95),
        (28, 0.565, 0.95),
        (29, 0.44, 0.97),
        (30, 0.56, 0.97),
        (31, 0.41, 0.98),
        (32, 0.59, 0.98),
    ];
    for (index, x, y) in layout {
        points[index] = Vec2::new(x, y);
    }
    points
}

/// Reference standing body without confidence.
pub fn body_skeleton() -> Skeleton {
    skeleton_from(KeypointType::Body, &body_points())
}

/// Reference standing body with the same visibility on every joint.
pub fn body_with_confidence(confidence: f64) -> Skeleton {
    with_confidence(&body_skeleton(), vec![confidence; 33])
}

/// Copy of `skeleton` carrying the given per-joint confidence.
///
/// # Panics
/// Panics if `confidence` does not match the joint count.
pub fn with_confidence(skeleton: &Skeleton, confidence: Vec<f64>) -> Skeleton {
    Skeleton::with_confidence(skeleton.keypoint_type(), skeleton.joints().to_vec(), confidence)
        .expect("fixture confidence must match the joint count")
}

/// Skeleton from fixture points.
///
/// # Panics
/// Panics if the point count does not match the keypoint type.
pub fn skeleton_from(keypoint_type: KeypointType, points: &[Vec2]) -> Skeleton {
    let joints = points.iter().map(|p| Joint::new(p.x, p.y)).collect();
    Skeleton::new(keypoint_type, joints).expect("fixture point count must match the keypoint type")
}
