//! Skeleton definitions.
//!
//! A skeleton is a fixed-length, ordered list of joints for one keypoint
//! layout. Whether per-joint confidence is available is carried by an
//! explicit [`Confidence`] variant instead of being inferred from array width.

use schemars::gen::SchemaGenerator;
use schemars::schema::Schema;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{KeypointType, Vec2};

/// Errors raised when building a skeleton from tracker output.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SkeletonError {
    #[error("{keypoint_type} skeleton needs {expected} joints, got {actual}")]
    JointCount {
        keypoint_type: KeypointType,
        expected: usize,
        actual: usize,
    },

    #[error("confidence has {actual} values for {expected} joints")]
    ConfidenceLength { expected: usize, actual: usize },

    #[error("row {row} has {actual} components, layout expects {expected}")]
    RowWidth {
        row: usize,
        expected: usize,
        actual: usize,
    },

    #[error("unsupported row width {0} (expected 2-4 components)")]
    UnsupportedRowWidth(usize),

    #[error("joint {index} has a non-finite value")]
    NonFinite { index: usize },
}

/// A single tracked joint.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct Joint {
    pub x: f64,
    pub y: f64,
    /// Depth, when the tracker provides it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<f64>,
}

impl Joint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y, z: None }
    }

    pub fn with_z(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z: Some(z) }
    }

    /// Image-plane position.
    pub fn xy(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.map_or(true, f64::is_finite)
    }
}

/// Per-joint confidence availability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", content = "values", rename_all = "snake_case")]
pub enum Confidence {
    /// One confidence/visibility value per joint.
    WithConfidence(Vec<f64>),
    /// The tracker did not report confidence.
    WithoutConfidence,
}

/// Column layout of raw tracker rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RowLayout {
    /// `[x, y]`
    Xy,
    /// `[x, y, confidence]`
    XyConfidence,
    /// `[x, y, z]`
    Xyz,
    /// `[x, y, z, confidence]`
    XyzConfidence,
}

impl RowLayout {
    /// Number of components per row.
    pub fn width(&self) -> usize {
        match self {
            RowLayout::Xy => 2,
            RowLayout::XyConfidence | RowLayout::Xyz => 3,
            RowLayout::XyzConfidence => 4,
        }
    }

    /// Whether the last column is a confidence value.
    pub fn has_confidence(&self) -> bool {
        matches!(self, RowLayout::XyConfidence | RowLayout::XyzConfidence)
    }

    /// Layout emitted by the trackers for a given row width.
    ///
    /// Three-column rows are `[x, y, confidence]` (hand tracker output);
    /// four-column rows are `[x, y, z, visibility]` (pose tracker output).
    pub fn infer(width: usize) -> Result<Self, SkeletonError> {
        match width {
            2 => Ok(RowLayout::Xy),
            3 => Ok(RowLayout::XyConfidence),
            4 => Ok(RowLayout::XyzConfidence),
            other => Err(SkeletonError::UnsupportedRowWidth(other)),
        }
    }
}

/// A validated skeleton for one keypoint layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SkeletonRepr")]
pub struct Skeleton {
    keypoint_type: KeypointType,
    joints: Vec<Joint>,
    confidence: Confidence,
}

/// Unvalidated wire shape of [`Skeleton`].
#[derive(Deserialize, JsonSchema)]
struct SkeletonRepr {
    keypoint_type: KeypointType,
    joints: Vec<Joint>,
    confidence: Confidence,
}

impl TryFrom<SkeletonRepr> for Skeleton {
    type Error = SkeletonError;

    fn try_from(repr: SkeletonRepr) -> Result<Self, Self::Error> {
        Skeleton::build(repr.keypoint_type, repr.joints, repr.confidence)
    }
}

impl JsonSchema for Skeleton {
    fn schema_name() -> String {
        "Skeleton".to_string()
    }

    fn json_schema(gen: &mut SchemaGenerator) -> Schema {
        SkeletonRepr::json_schema(gen)
    }
}

impl Skeleton {
    fn build(
        keypoint_type: KeypointType,
        joints: Vec<Joint>,
        confidence: Confidence,
    ) -> Result<Self, SkeletonError> {
        let expected = keypoint_type.joint_count();
        if joints.len() != expected {
            return Err(SkeletonError::JointCount {
                keypoint_type,
                expected,
                actual: joints.len(),
            });
        }
        if let Some(index) = joints.iter().position(|j| !j.is_finite()) {
            return Err(SkeletonError::NonFinite { index });
        }
        if let Confidence::WithConfidence(values) = &confidence {
            if values.len() != expected {
                return Err(SkeletonError::ConfidenceLength {
                    expected,
                    actual: values.len(),
                });
            }
            if let Some(index) = values.iter().position(|c| !c.is_finite()) {
                return Err(SkeletonError::NonFinite { index });
            }
        }
        Ok(Self {
            keypoint_type,
            joints,
            confidence,
        })
    }

    /// Skeleton without confidence information.
    pub fn new(keypoint_type: KeypointType, joints: Vec<Joint>) -> Result<Self, SkeletonError> {
        Self::build(keypoint_type, joints, Confidence::WithoutConfidence)
    }

    /// Skeleton with one confidence value per joint.
    pub fn with_confidence(
        keypoint_type: KeypointType,
        joints: Vec<Joint>,
        confidence: Vec<f64>,
    ) -> Result<Self, SkeletonError> {
        Self::build(keypoint_type, joints, Confidence::WithConfidence(confidence))
    }

    /// Skeleton from bare image-plane points.
    pub fn from_points(keypoint_type: KeypointType, points: &[Vec2]) -> Result<Self, SkeletonError> {
        let joints = points.iter().map(|p| Joint::new(p.x, p.y)).collect();
        Self::new(keypoint_type, joints)
    }

    /// Parse raw tracker rows with an explicit column layout.
    pub fn from_rows(
        keypoint_type: KeypointType,
        rows: &[Vec<f64>],
        layout: RowLayout,
    ) -> Result<Self, SkeletonError> {
        let width = layout.width();
        let mut joints = Vec::with_capacity(rows.len());
        let mut confidence = Vec::with_capacity(rows.len());

        for (row_idx, row) in rows.iter().enumerate() {
            if row.len() != width {
                return Err(SkeletonError::RowWidth {
                    row: row_idx,
                    expected: width,
                    actual: row.len(),
                });
            }
            let joint = match layout {
                RowLayout::Xy | RowLayout::XyConfidence => Joint::new(row[0], row[1]),
                RowLayout::Xyz | RowLayout::XyzConfidence => Joint::with_z(row[0], row[1], row[2]),
            };
            joints.push(joint);
            if layout.has_confidence() {
                confidence.push(row[width - 1]);
            }
        }

        if layout.has_confidence() {
            Self::with_confidence(keypoint_type, joints, confidence)
        } else {
            Self::new(keypoint_type, joints)
        }
    }

    /// Parse raw tracker rows, inferring the layout from the first row's width.
    pub fn from_rows_inferred(
        keypoint_type: KeypointType,
        rows: &[Vec<f64>],
    ) -> Result<Self, SkeletonError> {
        let width = rows.first().map(|r| r.len()).unwrap_or(2);
        Self::from_rows(keypoint_type, rows, RowLayout::infer(width)?)
    }

    pub fn keypoint_type(&self) -> KeypointType {
        self.keypoint_type
    }

    /// Number of joints (fixed by the keypoint type).
    pub fn len(&self) -> usize {
        self.joints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }

    pub fn joints(&self) -> &[Joint] {
        &self.joints
    }

    /// Image-plane position of joint `index`.
    ///
    /// # Panics
    /// Panics if `index` is outside the layout.
    pub fn point(&self, index: usize) -> Vec2 {
        self.joints[index].xy()
    }

    /// Image-plane positions of all joints.
    pub fn points(&self) -> Vec<Vec2> {
        self.joints.iter().map(Joint::xy).collect()
    }

    pub fn confidence(&self) -> Option<&[f64]> {
        match &self.confidence {
            Confidence::WithConfidence(values) => Some(values),
            Confidence::WithoutConfidence => None,
        }
    }

    pub fn has_confidence(&self) -> bool {
        matches!(self.confidence, Confidence::WithConfidence(_))
    }

    /// Per-joint `confidence >= threshold`, or `None` when confidence is absent.
    pub fn confidence_mask(&self, threshold: f64) -> Option<Vec<bool>> {
        self.confidence()
            .map(|values| values.iter().map(|&c| c >= threshold).collect())
    }

    /// Copy of this skeleton with every image-plane position mapped through `f`.
    ///
    /// Depth and confidence are carried over unchanged.
    pub fn map_points(&self, f: impl Fn(Vec2) -> Vec2) -> Skeleton {
        let joints = self
            .joints
            .iter()
            .map(|j| {
                let p = f(j.xy());
                Joint { x: p.x, y: p.y, z: j.z }
            })
            .collect();
        Skeleton {
            keypoint_type: self.keypoint_type,
            joints,
            confidence: self.confidence.clone(),
        }
    }

    /// Copy of this skeleton with positions replaced by `points`, index by index.
    ///
    /// Joints beyond `points.len()` keep their position.
    pub fn with_points(&self, points: &[Vec2]) -> Skeleton {
        let joints = self
            .joints
            .iter()
            .enumerate()
            .map(|(i, j)| match points.get(i) {
                Some(p) => Joint { x: p.x, y: p.y, z: j.z },
                None => *j,
            })
            .collect();
        Skeleton {
            keypoint_type: self.keypoint_type,
            joints,
            confidence: self.confidence.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hand_rows(width: usize) -> Vec<Vec<f64>> {
        (0..21)
            .map(|i| {
                let mut row = vec![i as f64 * 0.01, 0.5];
                row.extend(std::iter::repeat(0.9).take(width - 2));
                row
            })
            .collect()
    }

    #[test]
    fn test_joint_count_enforced() {
        let err = Skeleton::from_points(KeypointType::Hand, &[Vec2::ZERO; 20]).unwrap_err();
        assert_eq!(
            err,
            SkeletonError::JointCount {
                keypoint_type: KeypointType::Hand,
                expected: 21,
                actual: 20
            }
        );
        assert!(Skeleton::from_points(KeypointType::Body, &[Vec2::ZERO; 33]).is_ok());
    }

    #[test]
    fn test_row_layouts() {
        let xy = Skeleton::from_rows(KeypointType::Hand, &hand_rows(2), RowLayout::Xy).unwrap();
        assert!(!xy.has_confidence());

        let xyc = Skeleton::from_rows_inferred(KeypointType::Hand, &hand_rows(3)).unwrap();
        assert_eq!(xyc.confidence().unwrap()[0], 0.9);
        assert_eq!(xyc.joints()[0].z, None);

        let xyz = Skeleton::from_rows(KeypointType::Hand, &hand_rows(3), RowLayout::Xyz).unwrap();
        assert!(!xyz.has_confidence());
        assert_eq!(xyz.joints()[0].z, Some(0.9));

        let xyzc = Skeleton::from_rows_inferred(KeypointType::Hand, &hand_rows(4)).unwrap();
        assert!(xyzc.has_confidence());
        assert_eq!(xyzc.joints()[3].z, Some(0.9));
    }

    #[test]
    fn test_row_width_mismatch() {
        let mut rows = hand_rows(3);
        rows[4].push(1.0);
        let err = Skeleton::from_rows(KeypointType::Hand, &rows, RowLayout::XyConfidence).unwrap_err();
        assert!(matches!(err, SkeletonError::RowWidth { row: 4, .. }));
        assert!(RowLayout::infer(5).is_err());
    }

    #[test]
    fn test_non_finite_rejected() {
        let mut rows = hand_rows(2);
        rows[7][1] = f64::NAN;
        let err = Skeleton::from_rows(KeypointType::Hand, &rows, RowLayout::Xy).unwrap_err();
        assert_eq!(err, SkeletonError::NonFinite { index: 7 });
    }

    #[test]
    fn test_confidence_mask() {
        let mut rows = hand_rows(3);
        rows[2][2] = 0.1;
        let skeleton = Skeleton::from_rows_inferred(KeypointType::Hand, &rows).unwrap();
        let mask = skeleton.confidence_mask(0.5).unwrap();
        assert!(mask[0]);
        assert!(!mask[2]);
    }

    #[test]
    fn test_map_points_keeps_depth_and_confidence() {
        let skeleton = Skeleton::from_rows_inferred(KeypointType::Hand, &hand_rows(4)).unwrap();
        let shifted = skeleton.map_points(|p| p + Vec2::new(1.0, 0.0));
        assert_eq!(shifted.joints()[1].x, skeleton.joints()[1].x + 1.0);
        assert_eq!(shifted.joints()[1].z, Some(0.9));
        assert_eq!(shifted.confidence(), skeleton.confidence());
    }

    #[test]
    fn test_deserialize_validates() {
        let skeleton = Skeleton::from_rows_inferred(KeypointType::Hand, &hand_rows(3)).unwrap();
        let json = serde_json::to_string(&skeleton).unwrap();
        let back: Skeleton = serde_json::from_str(&json).unwrap();
        assert_eq!(back, skeleton);

        let short = r#"{"keypoint_type":"hand","joints":[{"x":0.0,"y":0.0}],"confidence":{"kind":"without_confidence"}}"#;
        assert!(serde_json::from_str::<Skeleton>(short).is_err());
    }
}
