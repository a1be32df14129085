//! Scoring modes and per-frame results.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Which error signals feed the raw score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScoringMode {
    /// Joint position differences only.
    Positional,
    /// Joint angle differences only.
    Angular,
    /// Weighted blend of positional and angular scores.
    #[default]
    Combined,
}

impl ScoringMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScoringMode::Positional => "positional",
            ScoringMode::Angular => "angular",
            ScoringMode::Combined => "combined",
        }
    }
}

impl fmt::Display for ScoringMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of scoring one frame.
///
/// Only `overall_score` is smoothed across frames; every other field
/// describes the current frame alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ScoringResult {
    /// EMA-smoothed score, 0-100.
    pub overall_score: f64,
    /// Unsmoothed score for this frame, 0-100.
    pub raw_score: f64,
    pub positional_score: f64,
    pub angular_score: f64,
    pub timing_penalty: f64,
    /// Euclidean error per trusted joint index.
    pub per_joint_errors: BTreeMap<usize, f64>,
    /// Worst joints first.
    pub top_error_joints: Vec<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_joint_errors_serialize_as_map() {
        let result = ScoringResult {
            overall_score: 90.0,
            raw_score: 90.0,
            positional_score: 90.0,
            angular_score: 90.0,
            timing_penalty: 0.0,
            per_joint_errors: BTreeMap::from([(0, 0.01), (12, 0.03)]),
            top_error_joints: vec![12, 0],
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["per_joint_errors"]["12"], 0.03);
    }

    #[test]
    fn test_mode_names() {
        assert_eq!(ScoringMode::default(), ScoringMode::Combined);
        assert_eq!(
            serde_json::to_string(&ScoringMode::Positional).unwrap(),
            "\"positional\""
        );
    }
}
