//! Feedback engine for skeleton-based motion coaching.
//!
//! This crate provides:
//! - Canonical-space normalization of hand and body skeletons
//! - Anchor and Procrustes similarity alignment of an expert onto a user
//! - Positional/angular scoring with per-session EMA smoothing
//! - Deterministic coaching cues with optional polishing
//! - Signal filters (EMA, moving average, One Euro) for landmark streams

pub mod alignment;
pub mod config;
pub mod cues;
pub mod error;
pub mod filters;
#[doc(hidden)]
pub mod fixtures;
pub mod geometry;
pub mod metrics;
pub mod normalizer;
pub mod pipeline;
pub mod polish;
pub mod scoring;
pub mod session;

pub use alignment::{procrustes_fit, AlignmentEngine, AlignmentMode, AlignmentModeParseError, SimilarityFit};
pub use config::EngineConfig;
pub use cues::{deduplicate_cues, CueMapper, CueMapperConfig, CueTemplate};
pub use error::{CoachError, CoachResult, PolishError};
pub use filters::{
    EmaFilter, LowPassFilter, MovingAverageFilter, OneEuroConfig, OneEuroFilter, SkeletonSmoother,
};
pub use normalizer::Normalizer;
pub use pipeline::FeedbackPipeline;
pub use polish::{CuePolisher, PassthroughPolisher, PolishContext};
pub use scoring::{error_to_score, ScoringConfig, ScoringEngine};
pub use session::SessionRegistry;
