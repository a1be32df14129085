//! End-to-end feedback for one frame.
//!
//! Aligns the expert onto the user for display, scores the pair (in
//! canonical space by default), derives cues and optionally polishes them.

use std::time::Instant;

use mcoach_models::{Cue, FeedbackReport, FeedbackRequest, ScoringResult, Skeleton};
use tracing::{debug, instrument, warn};

use crate::alignment::AlignmentEngine;
use crate::config::EngineConfig;
use crate::cues::CueMapper;
use crate::error::{CoachError, CoachResult};
use crate::metrics;
use crate::normalizer::Normalizer;
use crate::polish::{CuePolisher, PolishContext};
use crate::scoring::ScoringEngine;
use crate::session::SessionRegistry;

/// Composes alignment, normalization, scoring and cue generation.
pub struct FeedbackPipeline {
    alignment: AlignmentEngine,
    normalizer: Normalizer,
    cue_mapper: CueMapper,
    polisher: Option<Box<dyn CuePolisher>>,
    target_scale: f64,
    confidence_threshold: f64,
    max_cues: usize,
}

impl FeedbackPipeline {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            alignment: AlignmentEngine::new(config.alignment_mode),
            normalizer: Normalizer::new(),
            cue_mapper: CueMapper::new(config.cue_config()),
            polisher: None,
            target_scale: config.target_scale,
            confidence_threshold: config.confidence_threshold,
            max_cues: config.max_cues,
        }
    }

    /// Rephrase cues with `polisher` after the template tier.
    pub fn with_polisher(mut self, polisher: Box<dyn CuePolisher>) -> Self {
        self.polisher = Some(polisher);
        self
    }

    /// Analyze one frame using the request's session engine.
    ///
    /// Requests without a session id use a throwaway engine, so their
    /// `overall_score` equals `raw_score`.
    pub fn analyze_in(
        &self,
        request: &FeedbackRequest,
        registry: &mut SessionRegistry,
    ) -> CoachResult<FeedbackReport> {
        let keypoint_type = request.keypoint_type();
        match &request.session_id {
            Some(session_id) => {
                let engine = registry.engine_for(session_id, keypoint_type, request.reset_ema);
                self.analyze(request, engine)
            }
            None => {
                let mut engine = ScoringEngine::new(registry.scoring_config_for(keypoint_type));
                self.analyze(request, &mut engine)
            }
        }
    }

    /// Analyze one frame with an explicit scoring engine.
    #[instrument(skip_all, fields(keypoint_type = %request.keypoint_type(), pack_type = %request.pack_type))]
    pub fn analyze(
        &self,
        request: &FeedbackRequest,
        engine: &mut ScoringEngine,
    ) -> CoachResult<FeedbackReport> {
        let start = Instant::now();
        let result = self.run(request, engine);
        metrics::record_analyze(
            request.keypoint_type().as_str(),
            start.elapsed().as_secs_f64(),
            result.is_ok(),
        );
        result
    }

    fn run(&self, request: &FeedbackRequest, engine: &mut ScoringEngine) -> CoachResult<FeedbackReport> {
        request.validate().map_err(CoachError::invalid_request)?;
        let (user, expert) = request.skeletons()?;
        let (user, expert) = (user.as_ref(), expert.as_ref());
        if user.len() != expert.len() {
            return Err(CoachError::shape_mismatch(user.len(), expert.len()));
        }
        if request.reset_ema {
            engine.reset();
        }

        let threshold = request.confidence_threshold.unwrap_or(self.confidence_threshold);
        let alignment = self.alignment.align(expert, user, None, threshold)?;
        let mask = user.confidence_mask(threshold);

        let (score_user, score_expert): (Skeleton, Skeleton) = if request.normalize {
            let (user_norm, _) = self.normalizer.normalize(user, self.target_scale);
            let (expert_norm, _) = self.normalizer.normalize(expert, self.target_scale);
            (user_norm, expert_norm)
        } else {
            (user.clone(), alignment.aligned_expert.clone())
        };

        let score = engine.score_frame(&score_user, &score_expert, mask.as_deref())?;
        let cues = self.cue_mapper.generate_cues(
            &score_user,
            &score_expert,
            &score.per_joint_errors,
            &score.top_error_joints,
            request.timing_offset,
            request.max_cues.unwrap_or(self.max_cues),
        )?;
        for cue in &cues {
            metrics::record_cue_emitted(cue.category.as_str());
        }

        let polished_cues = self.polish(&cues, request, &score);

        debug!(
            overall_score = score.overall_score,
            alignment_quality = alignment.quality,
            cue_count = cues.len(),
            "Feedback analyzed"
        );

        Ok(FeedbackReport {
            alignment: alignment.summary(),
            score,
            cues,
            aligned_expert: request.return_aligned_expert.then_some(alignment.aligned_expert),
            polished_cues,
        })
    }

    /// Polished texts, or `None` when there is no polisher or it failed.
    fn polish(
        &self,
        cues: &[Cue],
        request: &FeedbackRequest,
        score: &ScoringResult,
    ) -> Option<Vec<String>> {
        let polisher = self.polisher.as_ref()?;
        if cues.is_empty() {
            return None;
        }

        let context = PolishContext {
            pack_type: request.pack_type,
            keypoint_type: request.keypoint_type(),
            overall_score: score.overall_score,
            top_error_joints: score.top_error_joints.clone(),
        };

        match polisher.polish(cues, &context) {
            Ok(texts) if texts.len() == cues.len() && texts.iter().all(|t| !t.trim().is_empty()) => {
                Some(texts)
            }
            Ok(texts) => {
                warn!(
                    polisher = polisher.name(),
                    expected = cues.len(),
                    returned = texts.len(),
                    "Polisher returned unusable cues, keeping templates"
                );
                metrics::record_polisher_fallback("invalid_output");
                None
            }
            Err(e) => {
                warn!(
                    polisher = polisher.name(),
                    error = %e,
                    "Cue polishing failed, keeping templates"
                );
                metrics::record_polisher_fallback("error");
                None
            }
        }
    }
}

impl Default for FeedbackPipeline {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}
