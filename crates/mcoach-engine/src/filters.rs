//! Temporal smoothing filters.
//!
//! This module contains the filters used to reduce tracker jitter and to
//! smooth scores across frames:
//! - Batch helpers over a finished series (mean, symmetric moving average)
//! - Streaming scalar filters (EMA, moving average, low-pass, One Euro)
//! - A per-joint One Euro smoother for whole skeletons

use std::collections::VecDeque;
use std::f64::consts::PI;

use mcoach_models::{Skeleton, Vec2};
use serde::{Deserialize, Serialize};

/// Smallest time step accepted by the One Euro filter, in seconds.
const MIN_DT: f64 = 1e-4;

/// Nominal frame interval used to derive the initial low-pass alphas.
const NOMINAL_DT: f64 = 1.0 / 30.0;

// === Batch Functions ===

/// Calculate the arithmetic mean of a slice of values.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Apply a moving average filter to a finished data series.
///
/// The window shrinks at the boundaries so the output keeps the input length.
/// Series shorter than `window` are returned unchanged.
pub fn moving_average(data: &[f64], window: usize) -> Vec<f64> {
    if window <= 1 || data.len() < window {
        return data.to_vec();
    }

    let pad = window / 2;
    (0..data.len())
        .map(|i| {
            let start = i.saturating_sub(pad);
            let end = (i + pad + 1).min(data.len());
            mean(&data[start..end])
        })
        .collect()
}

// === Streaming Filters ===

/// Exponential moving average: `state = alpha * value + (1 - alpha) * state`.
///
/// The first value after construction or [`EmaFilter::reset`] seeds the
/// state exactly.
#[derive(Debug, Clone)]
pub struct EmaFilter {
    alpha: f64,
    state: Option<f64>,
}

impl EmaFilter {
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha: alpha.clamp(0.0, 1.0),
            state: None,
        }
    }

    pub fn update(&mut self, value: f64) -> f64 {
        let next = match self.state {
            None => value,
            Some(prev) => self.alpha * value + (1.0 - self.alpha) * prev,
        };
        self.state = Some(next);
        next
    }

    /// Current smoothed value, if any sample has been seen.
    pub fn value(&self) -> Option<f64> {
        self.state
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn reset(&mut self) {
        self.state = None;
    }
}

impl Default for EmaFilter {
    fn default() -> Self {
        Self::new(0.3)
    }
}

/// Mean of the last `window_size` samples.
#[derive(Debug, Clone)]
pub struct MovingAverageFilter {
    window_size: usize,
    buffer: VecDeque<f64>,
}

impl MovingAverageFilter {
    pub fn new(window_size: usize) -> Self {
        let window_size = window_size.max(1);
        Self {
            window_size,
            buffer: VecDeque::with_capacity(window_size),
        }
    }

    pub fn update(&mut self, value: f64) -> f64 {
        if self.buffer.len() == self.window_size {
            self.buffer.pop_front();
        }
        self.buffer.push_back(value);
        self.buffer.iter().sum::<f64>() / self.buffer.len() as f64
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
    }
}

impl Default for MovingAverageFilter {
    fn default() -> Self {
        Self::new(5)
    }
}

/// First-order low-pass filter with an optional per-sample alpha.
#[derive(Debug, Clone)]
pub struct LowPassFilter {
    alpha: f64,
    state: Option<f64>,
}

impl LowPassFilter {
    pub fn new(alpha: f64) -> Self {
        Self { alpha, state: None }
    }

    pub fn update(&mut self, value: f64, alpha_override: Option<f64>) -> f64 {
        let alpha = alpha_override.unwrap_or(self.alpha);
        let next = match self.state {
            None => value,
            Some(prev) => alpha * value + (1.0 - alpha) * prev,
        };
        self.state = Some(next);
        next
    }

    pub fn state(&self) -> Option<f64> {
        self.state
    }

    fn seed(&mut self, value: f64) {
        self.state = Some(value);
    }

    pub fn reset(&mut self) {
        self.state = None;
    }
}

/// One Euro filter parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OneEuroConfig {
    /// Minimum cutoff frequency (Hz); lower = smoother at rest
    pub min_cutoff: f64,
    /// Speed coefficient; higher = less lag during fast motion
    pub beta: f64,
    /// Derivative cutoff frequency (Hz)
    pub d_cutoff: f64,
}

impl Default for OneEuroConfig {
    fn default() -> Self {
        Self {
            min_cutoff: 1.0,
            beta: 0.007,
            d_cutoff: 1.0,
        }
    }
}

/// Adaptive low-pass filter: smooth at rest, responsive during motion.
///
/// The first sample passes through unchanged and seeds the state.
#[derive(Debug, Clone)]
pub struct OneEuroFilter {
    config: OneEuroConfig,
    x_filter: LowPassFilter,
    dx_filter: LowPassFilter,
    last_time: Option<f64>,
}

impl OneEuroFilter {
    pub fn new(config: OneEuroConfig) -> Self {
        Self {
            x_filter: LowPassFilter::new(smoothing_alpha(config.min_cutoff, NOMINAL_DT)),
            dx_filter: LowPassFilter::new(smoothing_alpha(config.d_cutoff, NOMINAL_DT)),
            config,
            last_time: None,
        }
    }

    /// Filter `value` observed at `timestamp` (seconds).
    pub fn update(&mut self, value: f64, timestamp: f64) -> f64 {
        let Some(last_time) = self.last_time else {
            self.last_time = Some(timestamp);
            self.x_filter.seed(value);
            self.dx_filter.seed(0.0);
            return value;
        };

        let dt = (timestamp - last_time).max(MIN_DT);
        self.last_time = Some(timestamp);

        // Estimate derivative
        let prev_x = self.x_filter.state().unwrap_or(value);
        let dx = (value - prev_x) / dt;
        let alpha_d = smoothing_alpha(self.config.d_cutoff, dt);
        let dx_hat = self.dx_filter.update(dx, Some(alpha_d));

        // Adjust cutoff based on speed
        let cutoff = self.config.min_cutoff + self.config.beta * dx_hat.abs();
        let alpha = smoothing_alpha(cutoff, dt);

        self.x_filter.update(value, Some(alpha))
    }

    pub fn reset(&mut self) {
        self.x_filter.reset();
        self.dx_filter.reset();
        self.last_time = None;
    }
}

impl Default for OneEuroFilter {
    fn default() -> Self {
        Self::new(OneEuroConfig::default())
    }
}

/// Alpha of a first-order low-pass with the given cutoff at time step `dt`.
fn smoothing_alpha(cutoff: f64, dt: f64) -> f64 {
    let tau = 1.0 / (2.0 * PI * cutoff);
    1.0 / (1.0 + tau / dt)
}

/// One Euro filter per joint coordinate, for smoothing raw tracker output.
#[derive(Debug, Clone)]
pub struct SkeletonSmoother {
    config: OneEuroConfig,
    filters: Vec<(OneEuroFilter, OneEuroFilter)>,
}

impl SkeletonSmoother {
    pub fn new(config: OneEuroConfig) -> Self {
        Self {
            config,
            filters: Vec::new(),
        }
    }

    /// Smooth every joint of `skeleton` observed at `timestamp` (seconds).
    ///
    /// A skeleton with a different joint count than the previous one restarts
    /// the filters.
    pub fn smooth(&mut self, skeleton: &Skeleton, timestamp: f64) -> Skeleton {
        if self.filters.len() != skeleton.len() {
            self.filters = (0..skeleton.len())
                .map(|_| (OneEuroFilter::new(self.config), OneEuroFilter::new(self.config)))
                .collect();
        }

        let points: Vec<Vec2> = skeleton
            .points()
            .into_iter()
            .zip(self.filters.iter_mut())
            .map(|(p, (fx, fy))| Vec2::new(fx.update(p.x, timestamp), fy.update(p.y, timestamp)))
            .collect();

        skeleton.with_points(&points)
    }

    pub fn reset(&mut self) {
        self.filters.clear();
    }
}

impl Default for SkeletonSmoother {
    fn default() -> Self {
        Self::new(OneEuroConfig::default())
    }
}
