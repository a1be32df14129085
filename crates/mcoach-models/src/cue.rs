//! Coaching cue definitions.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Kind of correction a cue asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum CueCategory {
    /// "Move hand higher"
    Position,
    /// "Rotate wrist left"
    Rotation,
    /// "Open fingers wider"
    Spread,
    /// "Curl fingers more"
    Curl,
    /// "Slow down"
    Timing,
    /// "Good job!"
    Global,
}

impl CueCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            CueCategory::Position => "position",
            CueCategory::Rotation => "rotation",
            CueCategory::Spread => "spread",
            CueCategory::Curl => "curl",
            CueCategory::Timing => "timing",
            CueCategory::Global => "global",
        }
    }
}

impl fmt::Display for CueCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Direction hint attached to a cue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum CueDirection {
    Up,
    Down,
    Left,
    Right,
    /// Clockwise.
    Cw,
    /// Counter-clockwise.
    Ccw,
}

/// A single coaching cue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Cue {
    /// Human-readable text.
    pub text: String,
    pub category: CueCategory,
    /// 0-1, higher = more important.
    pub priority: f64,
    /// Joints this cue addresses.
    pub affected_joints: BTreeSet<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<CueDirection>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cue_serialization() {
        let cue = Cue {
            text: "Rotate wrist clockwise".to_string(),
            category: CueCategory::Rotation,
            priority: 0.8,
            affected_joints: BTreeSet::from([0]),
            direction: Some(CueDirection::Cw),
        };
        let json = serde_json::to_value(&cue).unwrap();
        assert_eq!(json["category"], "rotation");
        assert_eq!(json["direction"], "cw");
        assert_eq!(json["affected_joints"][0], 0);
    }

    #[test]
    fn test_direction_omitted_when_absent() {
        let cue = Cue {
            text: "Slow down a bit".to_string(),
            category: CueCategory::Timing,
            priority: 0.6,
            affected_joints: BTreeSet::new(),
            direction: None,
        };
        let json = serde_json::to_string(&cue).unwrap();
        assert!(!json.contains("direction"));
    }
}
