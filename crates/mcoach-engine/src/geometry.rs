//! Vector helpers for keypoint processing.
//!
//! Everything here is pure: no state, no logging, no allocation beyond the
//! returned collections.

use mcoach_models::{Matrix3, Vec2};

/// Lengths below this are treated as zero.
pub const EPSILON: f64 = 1e-6;

/// Euclidean distance between two points.
pub fn distance(p1: Vec2, p2: Vec2) -> f64 {
    (p1 - p2).norm()
}

/// Angle in degrees between two vectors.
///
/// The cosine is clamped to [-1, 1] before `acos`, so rounding noise on
/// (anti)parallel vectors never yields NaN. Zero-length input gives 90°.
pub fn angle_between_vectors(v1: Vec2, v2: Vec2) -> f64 {
    let denom = v1.norm() * v2.norm();
    if denom < f64::EPSILON {
        return 90.0;
    }
    let cos_angle = (v1.dot(v2) / denom).clamp(-1.0, 1.0);
    cos_angle.acos().to_degrees()
}

/// Interior angle at `p2` (degrees) formed by `p1-p2-p3`.
pub fn angle_at_joint(p1: Vec2, p2: Vec2, p3: Vec2) -> f64 {
    angle_between_vectors(p1 - p2, p3 - p2)
}

/// 2x2 rotation matrix for `theta` radians.
pub fn rotation_matrix_2d(theta: f64) -> [[f64; 2]; 2] {
    let (s, c) = theta.sin_cos();
    [[c, -s], [s, c]]
}

/// Homogeneous matrix for `translate(translation) * rotate(rotation) * scale(scale)`.
pub fn similarity_matrix(scale: f64, translation: Vec2, rotation: f64) -> Matrix3 {
    let [[c, neg_s], [s, _]] = rotation_matrix_2d(rotation);
    [
        [scale * c, scale * neg_s, translation.x],
        [scale * s, scale * c, translation.y],
        [0.0, 0.0, 1.0],
    ]
}

/// Apply a 3x3 homogeneous transform to 2-D points.
pub fn affine_transform(points: &[Vec2], matrix: &Matrix3) -> Vec<Vec2> {
    points.iter().map(|&p| transform_point(p, matrix)).collect()
}

/// Apply a 3x3 homogeneous transform to a single point.
pub fn transform_point(p: Vec2, m: &Matrix3) -> Vec2 {
    let x = m[0][0] * p.x + m[0][1] * p.y + m[0][2];
    let y = m[1][0] * p.x + m[1][1] * p.y + m[1][2];
    let w = m[2][0] * p.x + m[2][1] * p.y + m[2][2];
    if (w - 1.0).abs() > f64::EPSILON && w.abs() > EPSILON {
        Vec2::new(x / w, y / w)
    } else {
        Vec2::new(x, y)
    }
}

/// Centroid of a point set; the origin for an empty set.
pub fn centroid(points: &[Vec2]) -> Vec2 {
    if points.is_empty() {
        return Vec2::ZERO;
    }
    let sum = points.iter().fold(Vec2::ZERO, |acc, &p| acc + p);
    sum / points.len() as f64
}

/// Bearing of the vector `from -> to` in degrees, `atan2` convention.
pub fn bearing_degrees(from: Vec2, to: Vec2) -> f64 {
    (to - from).angle().to_degrees()
}

/// Wrap an angle difference in degrees into (-180, 180].
pub fn wrap_degrees(delta: f64) -> f64 {
    let wrapped = (delta + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped <= -180.0 {
        wrapped + 360.0
    } else {
        wrapped
    }
}
