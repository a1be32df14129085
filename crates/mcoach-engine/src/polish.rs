//! Optional rephrasing of deterministic cues.
//!
//! A polisher (for example a generative-text client) may turn the template
//! cues into more natural phrasing. It only ever runs after the template
//! tier has produced cues, and any failure falls back to the templates.

use mcoach_models::{Cue, KeypointType, PackType};

use crate::error::PolishError;

/// What the polisher knows about the frame being coached.
#[derive(Debug, Clone, PartialEq)]
pub struct PolishContext {
    pub pack_type: PackType,
    pub keypoint_type: KeypointType,
    /// Smoothed score of the frame, 0-100.
    pub overall_score: f64,
    pub top_error_joints: Vec<usize>,
}

/// Rephrases template cues.
#[cfg_attr(test, mockall::automock)]
pub trait CuePolisher: Send + Sync {
    /// Return one phrasing per input cue, in the same order.
    fn polish(&self, cues: &[Cue], context: &PolishContext) -> Result<Vec<String>, PolishError>;

    /// Polisher name for logging.
    fn name(&self) -> &'static str;
}

/// Polisher that returns the template texts unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughPolisher;

impl CuePolisher for PassthroughPolisher {
    fn polish(&self, cues: &[Cue], _context: &PolishContext) -> Result<Vec<String>, PolishError> {
        Ok(cues.iter().map(|cue| cue.text.clone()).collect())
    }

    fn name(&self) -> &'static str {
        "passthrough"
    }
}
