//! Feedback request/report envelopes.
//!
//! These are the records the surrounding service layer exchanges with the
//! feedback pipeline: one user frame against one expert frame in, alignment
//! + score + cues out.

use std::borrow::Cow;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    AlignmentSummary, Cue, KeypointType, PackType, RowLayout, ScoringResult, SessionId, Skeleton,
    SkeletonError,
};

fn default_true() -> bool {
    true
}

/// One frame as it arrives on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum SkeletonInput {
    /// Raw tracker rows, `[x, y]`, `[x, y, c]` or `[x, y, z, c]` per joint.
    Rows(Vec<Vec<f64>>),
    Structured(Skeleton),
}

impl SkeletonInput {
    /// Keypoint layout carried by a structured skeleton; rows carry none.
    pub fn keypoint_type(&self) -> Option<KeypointType> {
        match self {
            SkeletonInput::Rows(_) => None,
            SkeletonInput::Structured(skeleton) => Some(skeleton.keypoint_type()),
        }
    }

    /// Validated skeleton. Rows are parsed with `layout`, or with the layout
    /// implied by their width.
    pub fn resolve(
        &self,
        keypoint_type: KeypointType,
        layout: Option<RowLayout>,
    ) -> Result<Cow<'_, Skeleton>, SkeletonError> {
        match self {
            SkeletonInput::Structured(skeleton) => Ok(Cow::Borrowed(skeleton)),
            SkeletonInput::Rows(rows) => {
                let skeleton = match layout {
                    Some(layout) => Skeleton::from_rows(keypoint_type, rows, layout)?,
                    None => Skeleton::from_rows_inferred(keypoint_type, rows)?,
                };
                Ok(Cow::Owned(skeleton))
            }
        }
    }
}

impl From<Skeleton> for SkeletonInput {
    fn from(skeleton: Skeleton) -> Self {
        SkeletonInput::Structured(skeleton)
    }
}

/// One user frame to compare against one expert frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FeedbackRequest {
    pub user: SkeletonInput,
    pub expert: SkeletonInput,

    /// Layout of row input; structured skeletons carry their own (default: hand)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keypoint_type: Option<KeypointType>,

    /// Column layout of row input; inferred from the row width when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_layout: Option<RowLayout>,

    /// Score and cue in canonical space instead of screen space (default: true)
    #[serde(default = "default_true")]
    pub normalize: bool,

    /// Minimum joint confidence to trust a user joint; engine default when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_threshold: Option<f64>,

    /// Signed timing offset measured upstream; positive = ahead of the expert
    #[serde(default)]
    pub timing_offset: f64,

    /// Maximum number of cues to return; engine default when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_cues: Option<usize>,

    #[serde(default)]
    pub pack_type: PackType,

    /// Include the projected expert skeleton in the report (default: true)
    #[serde(default = "default_true")]
    pub return_aligned_expert: bool,

    /// Session whose smoothing state should be used; `None` = stateless call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,

    /// Clear the session's smoothing state before scoring
    #[serde(default)]
    pub reset_ema: bool,
}

impl FeedbackRequest {
    /// Request with default options.
    pub fn new(user: impl Into<SkeletonInput>, expert: impl Into<SkeletonInput>) -> Self {
        Self {
            user: user.into(),
            expert: expert.into(),
            keypoint_type: None,
            row_layout: None,
            normalize: true,
            confidence_threshold: None,
            timing_offset: 0.0,
            max_cues: None,
            pack_type: PackType::default(),
            return_aligned_expert: true,
            session_id: None,
            reset_ema: false,
        }
    }

    /// Attach a session.
    pub fn with_session(mut self, session_id: impl Into<SessionId>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Request over raw tracker rows.
    pub fn from_rows(keypoint_type: KeypointType, user: Vec<Vec<f64>>, expert: Vec<Vec<f64>>) -> Self {
        let mut request = Self::new(SkeletonInput::Rows(user), SkeletonInput::Rows(expert));
        request.keypoint_type = Some(keypoint_type);
        request
    }

    /// Keypoint layout of the request: the declared one, else the user
    /// skeleton's, else the expert's, else hand.
    pub fn keypoint_type(&self) -> KeypointType {
        self.keypoint_type
            .or_else(|| self.user.keypoint_type())
            .or_else(|| self.expert.keypoint_type())
            .unwrap_or_default()
    }

    /// User and expert skeletons, with row input parsed.
    pub fn skeletons(&self) -> Result<(Cow<'_, Skeleton>, Cow<'_, Skeleton>), SkeletonError> {
        let keypoint_type = self.keypoint_type();
        Ok((
            self.user.resolve(keypoint_type, self.row_layout)?,
            self.expert.resolve(keypoint_type, self.row_layout)?,
        ))
    }

    /// Validate the request options.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(threshold) = self.confidence_threshold {
            if !(0.0..=1.0).contains(&threshold) {
                return Err(format!(
                    "confidence_threshold must be within [0, 1], got {threshold}"
                ));
            }
        }

        if !self.timing_offset.is_finite() {
            return Err("timing_offset must be finite".to_string());
        }

        let expected = self.keypoint_type();
        for (side, input) in [("user", &self.user), ("expert", &self.expert)] {
            if let Some(actual) = input.keypoint_type() {
                if actual != expected {
                    return Err(format!(
                        "{side} is a {actual} skeleton but the request is {expected}"
                    ));
                }
            }
        }

        Ok(())
    }
}

/// Alignment, score and cues for one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FeedbackReport {
    pub alignment: AlignmentSummary,
    pub score: ScoringResult,
    /// Deterministic cues, highest priority first.
    pub cues: Vec<Cue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aligned_expert: Option<Skeleton>,
    /// Rephrased cue texts, present only when a polisher succeeded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub polished_cues: Option<Vec<String>>,
}
