//! Per-session scoring state.
//!
//! Each coaching session owns one [`ScoringEngine`] so its score smoothing
//! is independent of other sessions. The registry is bounded: entries idle
//! longer than the TTL are dropped first, then the least recently used.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use mcoach_models::{KeypointType, SessionId};
use tracing::{debug, info, warn};

use crate::metrics;
use crate::scoring::{ScoringConfig, ScoringEngine};

/// Default maximum number of live sessions.
pub const DEFAULT_SESSION_CAPACITY: usize = 1024;

/// Default idle time after which a session may be evicted.
pub const DEFAULT_SESSION_IDLE_TTL: Duration = Duration::from_secs(30 * 60);

#[derive(Debug)]
struct SessionEntry {
    engine: ScoringEngine,
    keypoint_type: KeypointType,
    last_used: Instant,
    /// Monotonic use counter; orders entries for LRU eviction.
    last_tick: u64,
}

/// Bounded map from session id to scoring engine.
#[derive(Debug)]
pub struct SessionRegistry {
    sessions: HashMap<SessionId, SessionEntry>,
    capacity: usize,
    idle_ttl: Duration,
    hand_config: ScoringConfig,
    body_config: ScoringConfig,
    tick: u64,
}

impl SessionRegistry {
    pub fn new(capacity: usize, idle_ttl: Duration) -> Self {
        Self {
            sessions: HashMap::new(),
            capacity: capacity.max(1),
            idle_ttl,
            hand_config: ScoringConfig::for_hand(),
            body_config: ScoringConfig::for_body(),
            tick: 0,
        }
    }

    /// Override the scoring configuration used for new sessions of a layout.
    pub fn with_scoring_config(mut self, keypoint_type: KeypointType, config: ScoringConfig) -> Self {
        match keypoint_type {
            KeypointType::Hand => self.hand_config = config,
            KeypointType::Body => self.body_config = config,
        }
        self
    }

    /// Scoring configuration for new engines of a layout.
    pub fn scoring_config_for(&self, keypoint_type: KeypointType) -> ScoringConfig {
        match keypoint_type {
            KeypointType::Hand => self.hand_config,
            KeypointType::Body => self.body_config,
        }
    }

    /// Engine of `session_id`, created on first use.
    ///
    /// `reset` clears the engine's smoothing state. A session reused with a
    /// different keypoint type gets a fresh engine.
    pub fn engine_for(
        &mut self,
        session_id: &SessionId,
        keypoint_type: KeypointType,
        reset: bool,
    ) -> &mut ScoringEngine {
        self.engine_for_at(session_id, keypoint_type, reset, Instant::now())
    }

    /// [`SessionRegistry::engine_for`] with an explicit clock reading.
    pub fn engine_for_at(
        &mut self,
        session_id: &SessionId,
        keypoint_type: KeypointType,
        reset: bool,
        now: Instant,
    ) -> &mut ScoringEngine {
        self.tick += 1;
        let tick = self.tick;

        let stale = self
            .sessions
            .get(session_id)
            .is_some_and(|entry| entry.keypoint_type != keypoint_type);
        if stale {
            info!(
                session_id = %session_id,
                keypoint_type = %keypoint_type,
                "Session switched keypoint type, starting a new engine"
            );
            self.sessions.remove(session_id);
        }

        if !self.sessions.contains_key(session_id) {
            if self.sessions.len() >= self.capacity {
                self.make_room(now);
            }
            info!(
                session_id = %session_id,
                keypoint_type = %keypoint_type,
                "Scoring session created"
            );
            metrics::record_session_created(keypoint_type.as_str());
            metrics::set_active_sessions(self.sessions.len() + 1);
        }

        let config = self.scoring_config_for(keypoint_type);
        let entry = self
            .sessions
            .entry(session_id.clone())
            .or_insert_with(|| SessionEntry {
                engine: ScoringEngine::new(config),
                keypoint_type,
                last_used: now,
                last_tick: tick,
            });
        entry.last_used = now;
        entry.last_tick = tick;
        if reset {
            debug!(session_id = %session_id, "Resetting session smoothing");
            entry.engine.reset();
        }
        &mut entry.engine
    }

    /// Drop a session. Returns whether it existed.
    pub fn remove(&mut self, session_id: &SessionId) -> bool {
        let removed = self.sessions.remove(session_id).is_some();
        if removed {
            metrics::set_active_sessions(self.sessions.len());
        }
        removed
    }

    pub fn contains(&self, session_id: &SessionId) -> bool {
        self.sessions.contains_key(session_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop sessions idle for at least the TTL. Returns how many were dropped.
    pub fn evict_idle(&mut self, now: Instant) -> usize {
        let before = self.sessions.len();
        let ttl = self.idle_ttl;
        self.sessions
            .retain(|_, entry| now.saturating_duration_since(entry.last_used) < ttl);
        let evicted = before - self.sessions.len();

        if evicted > 0 {
            debug!(evicted, "Evicted idle scoring sessions");
            metrics::record_sessions_evicted("idle", evicted);
            metrics::set_active_sessions(self.sessions.len());
        }
        evicted
    }

    /// Free at least one slot: idle sessions first, then least recently used.
    fn make_room(&mut self, now: Instant) {
        self.evict_idle(now);
        if self.sessions.len() < self.capacity {
            return;
        }

        let mut entries: Vec<(SessionId, u64)> = self
            .sessions
            .iter()
            .map(|(id, entry)| (id.clone(), entry.last_tick))
            .collect();
        entries.sort_by_key(|(_, tick)| *tick);

        let to_remove = self.sessions.len() + 1 - self.capacity;
        for (id, _) in entries.into_iter().take(to_remove) {
            self.sessions.remove(&id);
        }
        warn!(
            removed = to_remove,
            capacity = self.capacity,
            "Session registry at capacity, evicted least recently used sessions"
        );
        metrics::record_sessions_evicted("capacity", to_remove);
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_CAPACITY, DEFAULT_SESSION_IDLE_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::hand_skeleton;
    use mcoach_models::ScoringMode;

    fn id(s: &str) -> SessionId {
        SessionId::from(s)
    }

    #[test]
    fn test_engine_created_once() {
        let mut registry = SessionRegistry::default();
        let hand = hand_skeleton();
        registry
            .engine_for(&id("a"), KeypointType::Hand, false)
            .score_frame(&hand, &hand, None)
            .unwrap();

        let engine = registry.engine_for(&id("a"), KeypointType::Hand, false);
        assert!(engine.smoothed_score().is_some());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_reset_clears_smoothing() {
        let mut registry = SessionRegistry::default();
        let hand = hand_skeleton();
        registry
            .engine_for(&id("a"), KeypointType::Hand, false)
            .score_frame(&hand, &hand, None)
            .unwrap();

        let engine = registry.engine_for(&id("a"), KeypointType::Hand, true);
        assert!(engine.smoothed_score().is_none());
    }

    #[test]
    fn test_default_modes_per_layout() {
        let mut registry = SessionRegistry::default();
        let hand_mode = registry.engine_for(&id("h"), KeypointType::Hand, false).config().mode;
        let body_mode = registry.engine_for(&id("b"), KeypointType::Body, false).config().mode;
        assert_eq!(hand_mode, ScoringMode::Combined);
        assert_eq!(body_mode, ScoringMode::Positional);
    }

    #[test]
    fn test_keypoint_switch_replaces_engine() {
        let mut registry = SessionRegistry::default();
        let hand = hand_skeleton();
        registry
            .engine_for(&id("a"), KeypointType::Hand, false)
            .score_frame(&hand, &hand, None)
            .unwrap();

        let engine = registry.engine_for(&id("a"), KeypointType::Body, false);
        assert!(engine.smoothed_score().is_none());
        assert_eq!(engine.config().mode, ScoringMode::Positional);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_capacity_evicts_least_recently_used() {
        let mut registry = SessionRegistry::new(2, Duration::from_secs(3600));
        let now = Instant::now();
        registry.engine_for_at(&id("a"), KeypointType::Hand, false, now);
        registry.engine_for_at(&id("b"), KeypointType::Hand, false, now);
        // Touch "a" so "b" becomes the oldest.
        registry.engine_for_at(&id("a"), KeypointType::Hand, false, now);
        registry.engine_for_at(&id("c"), KeypointType::Hand, false, now);

        assert_eq!(registry.len(), 2);
        assert!(registry.contains(&id("a")));
        assert!(!registry.contains(&id("b")));
        assert!(registry.contains(&id("c")));
    }

    #[test]
    fn test_idle_sessions_evicted_first() {
        let mut registry = SessionRegistry::new(2, Duration::from_secs(60));
        let start = Instant::now();
        registry.engine_for_at(&id("old"), KeypointType::Hand, false, start);
        registry.engine_for_at(&id("fresh"), KeypointType::Hand, false, start + Duration::from_secs(100));

        let later = start + Duration::from_secs(120);
        assert_eq!(registry.evict_idle(later), 1);
        assert!(registry.contains(&id("fresh")));

        registry.engine_for_at(&id("x"), KeypointType::Hand, false, later);
        registry.engine_for_at(&id("y"), KeypointType::Hand, false, later + Duration::from_secs(300));
        // "fresh" and "x" were idle past the TTL, so both go before LRU kicks in.
        assert_eq!(registry.len(), 1);
        assert!(registry.contains(&id("y")));
    }

    #[test]
    fn test_remove() {
        let mut registry = SessionRegistry::default();
        registry.engine_for(&id("a"), KeypointType::Hand, false);
        assert!(registry.remove(&id("a")));
        assert!(!registry.remove(&id("a")));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_zero_capacity_still_holds_one() {
        let mut registry = SessionRegistry::new(0, DEFAULT_SESSION_IDLE_TTL);
        assert_eq!(registry.capacity(), 1);
        registry.engine_for(&id("a"), KeypointType::Hand, false);
        registry.engine_for(&id("b"), KeypointType::Hand, false);
        assert_eq!(registry.len(), 1);
        assert!(registry.contains(&id("b")));
    }
}
