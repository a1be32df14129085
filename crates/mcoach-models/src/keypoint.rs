//! Keypoint layouts and lesson pack types.
//!
//! Two tracker layouts are supported:
//!
//! - `Hand`: 21 joints (wrist, then four joints per finger from thumb to pinky)
//! - `Body`: 33 joints (full-body pose layout, shoulders at 11/12, hips at 23/24)

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Hand joint indices.
pub mod hand {
    pub const WRIST: usize = 0;
    pub const THUMB_TIP: usize = 4;
    pub const INDEX_MCP: usize = 5;
    pub const INDEX_TIP: usize = 8;
    pub const MIDDLE_MCP: usize = 9;
    pub const MIDDLE_TIP: usize = 12;
    pub const RING_TIP: usize = 16;
    pub const PINKY_TIP: usize = 20;

    /// Fingertips ordered thumb to pinky.
    pub const FINGERTIPS: [usize; 5] = [THUMB_TIP, INDEX_TIP, MIDDLE_TIP, RING_TIP, PINKY_TIP];

    /// Kinematic chain per finger, wrist first.
    pub const FINGER_CHAINS: [[usize; 5]; 5] = [
        [0, 1, 2, 3, 4],
        [0, 5, 6, 7, 8],
        [0, 9, 10, 11, 12],
        [0, 13, 14, 15, 16],
        [0, 17, 18, 19, 20],
    ];

    /// Finger names in chain order.
    pub const FINGER_NAMES: [&str; 5] = ["thumb", "index", "middle", "ring", "pinky"];
}

/// Body joint indices.
pub mod body {
    pub const LEFT_SHOULDER: usize = 11;
    pub const RIGHT_SHOULDER: usize = 12;
    pub const LEFT_ELBOW: usize = 13;
    pub const RIGHT_ELBOW: usize = 14;
    pub const LEFT_WRIST: usize = 15;
    pub const RIGHT_WRIST: usize = 16;
    pub const LEFT_INDEX: usize = 19;
    pub const RIGHT_INDEX: usize = 20;
    pub const LEFT_HIP: usize = 23;
    pub const RIGHT_HIP: usize = 24;
    pub const LEFT_KNEE: usize = 25;
    pub const RIGHT_KNEE: usize = 26;
    pub const LEFT_ANKLE: usize = 27;
    pub const RIGHT_ANKLE: usize = 28;
    pub const LEFT_FOOT_INDEX: usize = 31;
    pub const RIGHT_FOOT_INDEX: usize = 32;

    /// Limb chains used for joint-angle comparison.
    pub const LIMB_CHAINS: [[usize; 4]; 6] = [
        [LEFT_SHOULDER, LEFT_ELBOW, LEFT_WRIST, LEFT_INDEX],
        [RIGHT_SHOULDER, RIGHT_ELBOW, RIGHT_WRIST, RIGHT_INDEX],
        [LEFT_HIP, LEFT_KNEE, LEFT_ANKLE, LEFT_FOOT_INDEX],
        [RIGHT_HIP, RIGHT_KNEE, RIGHT_ANKLE, RIGHT_FOOT_INDEX],
        [LEFT_ELBOW, LEFT_SHOULDER, LEFT_HIP, LEFT_KNEE],
        [RIGHT_ELBOW, RIGHT_SHOULDER, RIGHT_HIP, RIGHT_KNEE],
    ];
}

/// Tracker layout of a skeleton.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum KeypointType {
    /// 21-joint hand.
    #[default]
    Hand,
    /// 33-joint full body.
    #[serde(alias = "pose")]
    Body,
}

impl KeypointType {
    /// All supported layouts.
    pub const ALL: &'static [KeypointType] = &[KeypointType::Hand, KeypointType::Body];

    /// Returns the layout name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            KeypointType::Hand => "hand",
            KeypointType::Body => "body",
        }
    }

    /// Fixed joint count for this layout.
    pub fn joint_count(&self) -> usize {
        match self {
            KeypointType::Hand => 21,
            KeypointType::Body => 33,
        }
    }

    /// Default alignment anchors: wrist + index/middle knuckles, or shoulders + hips.
    pub fn default_anchors(&self) -> &'static [usize] {
        match self {
            KeypointType::Hand => &[hand::WRIST, hand::INDEX_MCP, hand::MIDDLE_MCP],
            KeypointType::Body => &[
                body::LEFT_SHOULDER,
                body::RIGHT_SHOULDER,
                body::LEFT_HIP,
                body::RIGHT_HIP,
            ],
        }
    }

    /// Kinematic chains compared by the angular scorer.
    pub fn chains(&self) -> Vec<&'static [usize]> {
        match self {
            KeypointType::Hand => hand::FINGER_CHAINS.iter().map(|c| c.as_slice()).collect(),
            KeypointType::Body => body::LIMB_CHAINS.iter().map(|c| c.as_slice()).collect(),
        }
    }
}

impl fmt::Display for KeypointType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for KeypointType {
    type Err = KeypointTypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hand" => Ok(KeypointType::Hand),
            "body" | "pose" => Ok(KeypointType::Body),
            _ => Err(KeypointTypeParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown keypoint type: {0}")]
pub struct KeypointTypeParseError(String);

/// Lesson pack a feedback request belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum PackType {
    #[default]
    SignLanguage,
    Cpr,
    Piano,
    Sports,
    Rehab,
}

impl PackType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PackType::SignLanguage => "sign_language",
            PackType::Cpr => "cpr",
            PackType::Piano => "piano",
            PackType::Sports => "sports",
            PackType::Rehab => "rehab",
        }
    }
}

impl fmt::Display for PackType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PackType {
    type Err = PackTypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sign_language" | "asl" => Ok(PackType::SignLanguage),
            "cpr" => Ok(PackType::Cpr),
            "piano" => Ok(PackType::Piano),
            "sports" => Ok(PackType::Sports),
            "rehab" => Ok(PackType::Rehab),
            _ => Err(PackTypeParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown pack type: {0}")]
pub struct PackTypeParseError(String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keypoint_type_parse() {
        assert_eq!("hand".parse::<KeypointType>().unwrap(), KeypointType::Hand);
        assert_eq!("BODY".parse::<KeypointType>().unwrap(), KeypointType::Body);
        assert_eq!("pose".parse::<KeypointType>().unwrap(), KeypointType::Body);
        assert!("foot".parse::<KeypointType>().is_err());
    }

    #[test]
    fn test_joint_counts() {
        assert_eq!(KeypointType::Hand.joint_count(), 21);
        assert_eq!(KeypointType::Body.joint_count(), 33);
    }

    #[test]
    fn test_chains_stay_in_range() {
        for kt in KeypointType::ALL {
            for chain in kt.chains() {
                assert!(chain.iter().all(|&i| i < kt.joint_count()));
            }
            assert!(kt.default_anchors().iter().all(|&i| i < kt.joint_count()));
        }
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(serde_json::to_string(&KeypointType::Body).unwrap(), "\"body\"");
        let parsed: KeypointType = serde_json::from_str("\"pose\"").unwrap();
        assert_eq!(parsed, KeypointType::Body);
        assert_eq!(
            serde_json::to_string(&PackType::SignLanguage).unwrap(),
            "\"sign_language\""
        );
    }

    #[test]
    fn test_pack_type_parse() {
        assert_eq!("asl".parse::<PackType>().unwrap(), PackType::SignLanguage);
        assert_eq!("rehab".parse::<PackType>().unwrap(), PackType::Rehab);
        assert!("yoga".parse::<PackType>().is_err());
    }
}
