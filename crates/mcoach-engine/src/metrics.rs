//! Metrics for the feedback engine.
//!
//! Recording is a no-op until the binary installs a recorder.

use metrics::{counter, gauge, histogram};

/// Metric names as constants for consistency.
pub mod names {
    // Alignment metrics
    pub const ALIGNMENTS_TOTAL: &str = "mcoach_alignments_total";
    pub const ALIGNMENTS_DEGRADED_TOTAL: &str = "mcoach_alignments_degraded_total";
    pub const ALIGNMENT_QUALITY: &str = "mcoach_alignment_quality";

    // Scoring metrics
    pub const FRAMES_SCORED_TOTAL: &str = "mcoach_frames_scored_total";
    pub const FRAME_SCORE: &str = "mcoach_frame_score";

    // Cue metrics
    pub const CUES_EMITTED_TOTAL: &str = "mcoach_cues_emitted_total";
    pub const POLISHER_FALLBACKS_TOTAL: &str = "mcoach_polisher_fallbacks_total";

    // Session metrics
    pub const SESSIONS_CREATED_TOTAL: &str = "mcoach_sessions_created_total";
    pub const SESSIONS_EVICTED_TOTAL: &str = "mcoach_sessions_evicted_total";
    pub const SESSIONS_ACTIVE: &str = "mcoach_sessions_active";

    // Pipeline metrics
    pub const ANALYZE_DURATION_SECONDS: &str = "mcoach_analyze_duration_seconds";
    pub const ANALYZE_ERRORS_TOTAL: &str = "mcoach_analyze_errors_total";
}

/// Record one alignment.
pub fn record_alignment(mode: &str, quality: f64, degraded: bool) {
    let labels = [("mode", mode.to_string())];
    counter!(names::ALIGNMENTS_TOTAL, &labels).increment(1);
    histogram!(names::ALIGNMENT_QUALITY, &labels).record(quality);
    if degraded {
        counter!(names::ALIGNMENTS_DEGRADED_TOTAL, &labels).increment(1);
    }
}

/// Record one scored frame.
pub fn record_frame_scored(keypoint_type: &str, mode: &str, raw_score: f64) {
    let labels = [
        ("keypoint_type", keypoint_type.to_string()),
        ("mode", mode.to_string()),
    ];
    counter!(names::FRAMES_SCORED_TOTAL, &labels).increment(1);
    histogram!(names::FRAME_SCORE, &labels).record(raw_score);
}

/// Record a cue returned to the caller.
pub fn record_cue_emitted(category: &str) {
    let labels = [("category", category.to_string())];
    counter!(names::CUES_EMITTED_TOTAL, &labels).increment(1);
}

/// Record a polisher failure that fell back to the deterministic cues.
pub fn record_polisher_fallback(reason: &str) {
    let labels = [("reason", reason.to_string())];
    counter!(names::POLISHER_FALLBACKS_TOTAL, &labels).increment(1);
}

/// Record a new scoring session.
pub fn record_session_created(keypoint_type: &str) {
    let labels = [("keypoint_type", keypoint_type.to_string())];
    counter!(names::SESSIONS_CREATED_TOTAL, &labels).increment(1);
}

/// Record sessions evicted from the registry.
pub fn record_sessions_evicted(reason: &str, count: usize) {
    let labels = [("reason", reason.to_string())];
    counter!(names::SESSIONS_EVICTED_TOTAL, &labels).increment(count as u64);
}

/// Update the active sessions gauge.
pub fn set_active_sessions(count: usize) {
    gauge!(names::SESSIONS_ACTIVE).set(count as f64);
}

/// Record one pipeline run.
pub fn record_analyze(keypoint_type: &str, duration_secs: f64, success: bool) {
    let labels = [("keypoint_type", keypoint_type.to_string())];
    histogram!(names::ANALYZE_DURATION_SECONDS, &labels).record(duration_secs);
    if !success {
        counter!(names::ANALYZE_ERRORS_TOTAL, &labels).increment(1);
    }
}
