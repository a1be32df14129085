//! End-to-end feedback tests across normalizer, alignment, scoring and cues.

use std::collections::HashSet;
use std::time::Duration;

use mcoach_engine::fixtures::{
    bend_finger, body_skeleton, hand_points, hand_skeleton, skeleton_from, with_confidence,
};
use mcoach_engine::{
    error_to_score, AlignmentEngine, CoachError, CueMapper, CueMapperConfig, CuePolisher,
    EngineConfig, FeedbackPipeline, Normalizer, OneEuroConfig, OneEuroFilter, PolishContext,
    PolishError, ScoringConfig, ScoringEngine,
};
use mcoach_models::keypoint::{body, hand};
use mcoach_models::{
    Cue, CueCategory, CueDirection, FeedbackRequest, KeypointType, Skeleton, Vec2, IDENTITY_MATRIX,
};

const EPS: f64 = 1e-4;

fn transformed_hand(scale: f64, rotation: f64, offset: Vec2) -> Skeleton {
    let points: Vec<Vec2> = hand_points()
        .iter()
        .map(|&p| (p * scale).rotated(rotation) + offset)
        .collect();
    skeleton_from(KeypointType::Hand, &points)
}

fn shifted(skeleton: &Skeleton, offset: Vec2) -> Skeleton {
    skeleton.map_points(|p| p + offset)
}

struct FailingPolisher;

impl CuePolisher for FailingPolisher {
    fn polish(&self, _cues: &[Cue], _context: &PolishContext) -> Result<Vec<String>, PolishError> {
        Err(PolishError::Unavailable("connection refused".to_string()))
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

struct BlankPolisher;

impl CuePolisher for BlankPolisher {
    fn polish(&self, cues: &[Cue], _context: &PolishContext) -> Result<Vec<String>, PolishError> {
        Ok(vec!["   ".to_string(); cues.len()])
    }

    fn name(&self) -> &'static str {
        "blank"
    }
}

#[test]
fn test_hand_normalization_puts_wrist_at_origin() {
    let normalizer = Normalizer::new();
    for (scale, rotation, offset) in [
        (1.0, 0.0, Vec2::ZERO),
        (0.5, 0.7, Vec2::new(0.2, -0.1)),
        (2.3, -2.5, Vec2::new(-0.4, 0.9)),
    ] {
        let (normalized, _) = normalizer.normalize(&transformed_hand(scale, rotation, offset), 1.0);
        let wrist = normalized.point(hand::WRIST);
        assert!(wrist.norm() < EPS, "wrist at {wrist:?}");
    }
}

#[test]
fn test_normalization_round_trip() {
    let normalizer = Normalizer::new();
    let original = transformed_hand(0.8, 1.1, Vec2::new(0.1, 0.3));
    let (normalized, params) = normalizer.normalize(&original, 1.0);
    let restored = normalizer.invert_transform(&normalized.points(), &params);

    for (a, b) in original.points().iter().zip(&restored) {
        assert!((*a - *b).norm() < EPS);
    }
}

#[test]
fn test_body_normalization_centers_hips_and_levels_shoulders() {
    let tilted = body_skeleton().map_points(|p| p.rotated(0.4) + Vec2::new(0.3, 0.1));
    let (normalized, _) = Normalizer::new().normalize(&tilted, 1.0);

    let hip_mid = (normalized.point(body::LEFT_HIP) + normalized.point(body::RIGHT_HIP)) * 0.5;
    assert!(hip_mid.norm() < EPS);

    let left = normalized.point(body::LEFT_SHOULDER);
    let right = normalized.point(body::RIGHT_SHOULDER);
    assert!((left.y - right.y).abs() < EPS);
    assert!(((right - left).norm() - 1.0).abs() < EPS);
}

#[test]
fn test_align_degrades_without_enough_anchors() {
    let engine = AlignmentEngine::default();
    let user = with_confidence(&hand_skeleton(), vec![0.1; 21]);
    let expert = shifted(&hand_skeleton(), Vec2::new(0.1, 0.0));

    let result = engine.align(&expert, &user, None, 0.5).unwrap();
    assert_eq!(result.quality, 0.0);
    assert_eq!(result.transform_matrix, IDENTITY_MATRIX);
    assert_eq!(result.aligned_expert, expert);
}

#[test]
fn test_single_trusted_anchor_returns_raw_expert() {
    let mut confidence = vec![0.1; 21];
    confidence[hand::WRIST] = 0.95;
    let user = with_confidence(&hand_skeleton(), confidence);
    let expert = shifted(&hand_skeleton(), Vec2::new(0.05, 0.02));

    let request = FeedbackRequest::new(user, expert.clone());
    let report = FeedbackPipeline::default()
        .analyze(&request, &mut ScoringEngine::default())
        .unwrap();

    assert_eq!(report.alignment.quality, 0.0);
    assert_eq!(report.aligned_expert, Some(expert));
}

#[test]
fn test_shape_mismatch_is_an_error() {
    let mut engine = ScoringEngine::default();
    let err = engine
        .score_frame(&hand_skeleton(), &body_skeleton(), None)
        .unwrap_err();
    assert!(matches!(err, CoachError::ShapeMismatch { user: 21, expert: 33 }));
}

#[test]
fn test_mixed_layouts_rejected_by_pipeline() {
    let request = FeedbackRequest::new(hand_skeleton(), body_skeleton());
    let err = FeedbackPipeline::default()
        .analyze(&request, &mut ScoringEngine::default())
        .unwrap_err();
    assert!(matches!(err, CoachError::InvalidRequest(_)));
}

#[test]
fn test_error_to_score_curve() {
    let k = 500.0;
    assert_eq!(error_to_score(0.0, k), 100.0);

    let mut previous = 100.0;
    for step in 1..=50 {
        let score = error_to_score(step as f64 * 0.005, k);
        assert!(score <= previous);
        previous = score;
    }
    assert_eq!(error_to_score(100.0 / k, k), 0.0);
    assert_eq!(error_to_score(1.0, k), 0.0);
}

#[test]
fn test_first_frame_after_reset_is_unsmoothed() {
    let expert = hand_skeleton();
    let bent = skeleton_from(KeypointType::Hand, &bend_finger(&hand_points(), 1, 0.8));
    let mut engine = ScoringEngine::new(ScoringConfig::for_hand());

    engine.score_frame(&expert, &expert, None).unwrap();
    engine.score_frame(&bent, &expert, None).unwrap();
    engine.reset();

    let result = engine.score_frame(&bent, &expert, None).unwrap();
    assert_eq!(result.overall_score, result.raw_score);
}

#[test]
fn test_cues_bounded_and_unique() {
    let mapper = CueMapper::new(CueMapperConfig::strict());
    let expert = hand_skeleton();
    let mut points = bend_finger(&hand_points(), 2, 0.9);
    points = bend_finger(&points, 3, -0.6);
    let user = skeleton_from(KeypointType::Hand, &points).map_points(|p| p.rotated(0.5) + Vec2::new(0.2, 0.1));

    let mut engine = ScoringEngine::default();
    let score = engine.score_frame(&user, &expert, None).unwrap();

    for max_cues in [0, 1, 2, 5, 20] {
        let cues = mapper
            .generate_cues(&user, &expert, &score.per_joint_errors, &score.top_error_joints, 0.5, max_cues)
            .unwrap();
        assert!(cues.len() <= max_cues);

        let texts: HashSet<&str> = cues.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts.len(), cues.len());
        assert!(cues.windows(2).all(|w| w[0].priority >= w[1].priority));
    }
}

#[test]
fn test_identical_hands_scenario() {
    let hand = hand_skeleton();
    let mut engine = ScoringEngine::default();
    let score = engine.score_frame(&hand, &hand, None).unwrap();
    assert_eq!(score.positional_score, 100.0);
    assert_eq!(score.angular_score, 100.0);

    let cues = CueMapper::default()
        .generate_cues(&hand, &hand, &score.per_joint_errors, &score.top_error_joints, 0.0, 2)
        .unwrap();
    assert_eq!(cues.len(), 1);
    assert_eq!(cues[0].text, "Perfect! Keep it up!");
    assert_eq!(cues[0].category, CueCategory::Global);
}

#[test]
fn test_horizontal_offset_scenario() {
    let expert = hand_skeleton();
    let user = shifted(&expert, Vec2::new(0.15, 0.0));

    let mut engine = ScoringEngine::default();
    let score = engine.score_frame(&user, &expert, None).unwrap();
    assert!(score.positional_score < 100.0);

    let cues = CueMapper::default()
        .generate_cues(&user, &expert, &score.per_joint_errors, &score.top_error_joints, 0.0, 2)
        .unwrap();
    let position: Vec<&Cue> = cues
        .iter()
        .filter(|c| c.category == CueCategory::Position)
        .collect();
    assert_eq!(position.len(), 1);
    assert_eq!(position[0].priority, 0.9);
    assert!(matches!(
        position[0].direction,
        Some(CueDirection::Left) | Some(CueDirection::Right)
    ));
}

#[test]
fn test_pipeline_normalized_scoring_ignores_placement() {
    let expert = hand_skeleton();
    let user = transformed_hand(1.4, 0.6, Vec2::new(0.2, -0.3));

    let report = FeedbackPipeline::default()
        .analyze(&FeedbackRequest::new(user, expert), &mut ScoringEngine::default())
        .unwrap();

    assert!((report.score.positional_score - 100.0).abs() < 1e-3);
    assert!((report.alignment.scale - 1.4).abs() < 1e-6);
    assert!((report.alignment.rotation - 0.6).abs() < 1e-6);
    assert_eq!(report.alignment.quality, 1.0);
}

#[test]
fn test_pipeline_falls_back_when_polisher_fails() {
    let hand = hand_skeleton();
    for polisher in [Box::new(FailingPolisher) as Box<dyn CuePolisher>, Box::new(BlankPolisher)] {
        let pipeline = FeedbackPipeline::default().with_polisher(polisher);
        let report = pipeline
            .analyze(&FeedbackRequest::new(hand.clone(), hand.clone()), &mut ScoringEngine::default())
            .unwrap();
        assert!(report.polished_cues.is_none());
        assert_eq!(report.cues[0].text, "Perfect! Keep it up!");
    }
}

#[test]
fn test_registry_capacity_through_pipeline() {
    let config = EngineConfig {
        session_capacity: 2,
        session_idle_ttl: Duration::from_secs(3600),
        ..EngineConfig::default()
    };
    let pipeline = FeedbackPipeline::new(&config);
    let mut registry = config.session_registry();
    let hand = hand_skeleton();

    for session in ["a", "b", "c"] {
        let request = FeedbackRequest::new(hand.clone(), hand.clone()).with_session(session);
        pipeline.analyze_in(&request, &mut registry).unwrap();
    }

    assert_eq!(registry.len(), 2);
    assert!(!registry.contains(&"a".into()));
    assert!(registry.contains(&"c".into()));
}

#[test]
fn test_sessions_smooth_independently() {
    let pipeline = FeedbackPipeline::default();
    let mut registry = EngineConfig::default().session_registry();
    let expert = hand_skeleton();
    let bent = skeleton_from(KeypointType::Hand, &bend_finger(&hand_points(), 1, 1.0));

    let good = FeedbackRequest::new(expert.clone(), expert.clone()).with_session("steady");
    pipeline.analyze_in(&good, &mut registry).unwrap();

    let first_bad = FeedbackRequest::new(bent.clone(), expert.clone()).with_session("fresh");
    let fresh = pipeline.analyze_in(&first_bad, &mut registry).unwrap();
    assert_eq!(fresh.score.overall_score, fresh.score.raw_score);

    let bad = FeedbackRequest::new(bent, expert).with_session("steady");
    let steady = pipeline.analyze_in(&bad, &mut registry).unwrap();
    assert!(steady.score.overall_score > steady.score.raw_score);
}

#[test]
fn test_one_euro_passes_first_sample_through() {
    let mut filter = OneEuroFilter::new(OneEuroConfig::default());
    assert_eq!(filter.update(0.42, 0.0), 0.42);
    let second = filter.update(0.60, 1.0 / 30.0);
    assert!(second > 0.42 && second < 0.60);
}

#[test]
fn test_report_serializes_lowercase() {
    let hand = hand_skeleton();
    let report = FeedbackPipeline::default()
        .analyze(&FeedbackRequest::new(hand.clone(), hand), &mut ScoringEngine::default())
        .unwrap();
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["cues"][0]["category"], "global");
    assert!(json["score"]["per_joint_errors"].is_object());
}
