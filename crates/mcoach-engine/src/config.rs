//! Engine configuration.

use std::time::Duration;

use mcoach_models::KeypointType;

use crate::alignment::AlignmentMode;
use crate::cues::CueMapperConfig;
use crate::scoring::ScoringConfig;
use crate::session::{SessionRegistry, DEFAULT_SESSION_CAPACITY, DEFAULT_SESSION_IDLE_TTL};

/// Feedback engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Default minimum joint confidence for requests that omit one
    pub confidence_threshold: f64,
    /// EMA smoothing factor for the overall score
    pub ema_alpha: f64,
    /// Error-to-score slope
    pub k_scaling: f64,
    /// Weight of the positional score in combined mode
    pub position_weight: f64,
    /// Weight of the angular score in combined mode
    pub angle_weight: f64,
    /// Number of worst joints reported per frame
    pub top_n: usize,
    /// Default maximum cues per frame
    pub max_cues: usize,
    /// Canonical-space reference length
    pub target_scale: f64,
    pub alignment_mode: AlignmentMode,
    /// Maximum live scoring sessions
    pub session_capacity: usize,
    /// Idle time after which a session may be evicted
    pub session_idle_ttl: Duration,
    /// Phrase horizontal cues for a mirrored preview
    pub mirror_x: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let scoring = ScoringConfig::default();
        Self {
            confidence_threshold: 0.5,
            ema_alpha: scoring.ema_alpha,
            k_scaling: scoring.k_scaling,
            position_weight: scoring.position_weight,
            angle_weight: scoring.angle_weight,
            top_n: scoring.top_n,
            max_cues: 2,
            target_scale: 1.0,
            alignment_mode: AlignmentMode::Anchor,
            session_capacity: DEFAULT_SESSION_CAPACITY,
            session_idle_ttl: DEFAULT_SESSION_IDLE_TTL,
            mirror_x: true,
        }
    }
}

impl EngineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from an arbitrary variable source; unset, unparsable or
    /// out-of-range values keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            confidence_threshold: lookup("MCOACH_CONFIDENCE_THRESHOLD")
                .and_then(|s| s.parse().ok())
                .filter(|v: &f64| (0.0..=1.0).contains(v))
                .unwrap_or(defaults.confidence_threshold),
            ema_alpha: lookup("MCOACH_EMA_ALPHA")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.ema_alpha),
            k_scaling: lookup("MCOACH_K_SCALING")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.k_scaling),
            position_weight: lookup("MCOACH_POSITION_WEIGHT")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.position_weight),
            angle_weight: lookup("MCOACH_ANGLE_WEIGHT")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.angle_weight),
            top_n: lookup("MCOACH_TOP_N")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.top_n),
            max_cues: lookup("MCOACH_MAX_CUES")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_cues),
            target_scale: lookup("MCOACH_TARGET_SCALE")
                .and_then(|s| s.parse().ok())
                .filter(|v: &f64| v.is_finite() && *v > 0.0)
                .unwrap_or(defaults.target_scale),
            alignment_mode: lookup("MCOACH_ALIGNMENT_MODE")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.alignment_mode),
            session_capacity: lookup("MCOACH_SESSION_CAPACITY")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.session_capacity),
            session_idle_ttl: Duration::from_secs(
                lookup("MCOACH_SESSION_IDLE_TTL_SECS")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.session_idle_ttl.as_secs()),
            ),
            mirror_x: lookup("MCOACH_MIRROR_X")
                .map(|s| s != "0" && s.to_lowercase() != "false")
                .unwrap_or(defaults.mirror_x),
        }
    }

    /// Scoring configuration for a keypoint layout, with the shared overrides applied.
    pub fn scoring_config(&self, keypoint_type: KeypointType) -> ScoringConfig {
        ScoringConfig {
            position_weight: self.position_weight,
            angle_weight: self.angle_weight,
            ema_alpha: self.ema_alpha,
            k_scaling: self.k_scaling,
            top_n: self.top_n,
            ..ScoringConfig::for_keypoint_type(keypoint_type)
        }
    }

    pub fn cue_config(&self) -> CueMapperConfig {
        CueMapperConfig {
            k_scaling: self.k_scaling,
            mirror_x: self.mirror_x,
            ..CueMapperConfig::default()
        }
    }

    /// Empty session registry sized and configured from this config.
    pub fn session_registry(&self) -> SessionRegistry {
        SessionRegistry::new(self.session_capacity, self.session_idle_ttl)
            .with_scoring_config(KeypointType::Hand, self.scoring_config(KeypointType::Hand))
            .with_scoring_config(KeypointType::Body, self.scoring_config(KeypointType::Body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcoach_models::ScoringMode;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.confidence_threshold, 0.5);
        assert_eq!(config.k_scaling, 500.0);
        assert_eq!(config.max_cues, 2);
        assert_eq!(config.alignment_mode, AlignmentMode::Anchor);
        assert!(config.mirror_x);
    }

    #[test]
    fn test_from_lookup() {
        let vars = HashMap::from([
            ("MCOACH_K_SCALING", "250"),
            ("MCOACH_ALIGNMENT_MODE", "procrustes"),
            ("MCOACH_SESSION_IDLE_TTL_SECS", "90"),
            ("MCOACH_MIRROR_X", "false"),
            ("MCOACH_TOP_N", "not-a-number"),
        ]);
        let config = EngineConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.k_scaling, 250.0);
        assert_eq!(config.alignment_mode, AlignmentMode::Procrustes);
        assert_eq!(config.session_idle_ttl, Duration::from_secs(90));
        assert!(!config.mirror_x);
        assert_eq!(config.top_n, 3);
    }

    #[test]
    fn test_out_of_range_values_keep_defaults() {
        for scale in ["0", "-2.5", "NaN", "inf"] {
            let config = EngineConfig::from_lookup(|key| {
                (key == "MCOACH_TARGET_SCALE").then(|| scale.to_string())
            });
            assert!((config.target_scale - 1.0).abs() < 1e-12, "scale {scale}");
        }

        let vars = HashMap::from([
            ("MCOACH_TARGET_SCALE", "2.5"),
            ("MCOACH_CONFIDENCE_THRESHOLD", "1.5"),
        ]);
        let config = EngineConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()));
        assert!((config.target_scale - 2.5).abs() < 1e-12);
        assert!((config.confidence_threshold - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_scoring_config_keeps_layout_mode() {
        let config = EngineConfig {
            k_scaling: 300.0,
            ..EngineConfig::default()
        };
        let body = config.scoring_config(KeypointType::Body);
        assert_eq!(body.mode, ScoringMode::Positional);
        assert_eq!(body.k_scaling, 300.0);
        assert_eq!(config.scoring_config(KeypointType::Hand).mode, ScoringMode::Combined);
        assert_eq!(config.cue_config().k_scaling, 300.0);
    }
}
