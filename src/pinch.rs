//! Per-hand pinch debouncing and position smoothing.
//!
//! A pinch is raw thumb-tip/index-tip proximity. It only counts for display
//! once it has been held continuously for the validity duration, and the
//! reported position is an exponentially smoothed thumb/index midpoint.

use glam::Vec3;
use log::debug;
use serde::Serialize;

use crate::joints::Chirality;

/// Thumb/index distance below which a hand is pinching, in meters.
pub const PINCH_DISTANCE_THRESHOLD: f32 = 0.03;
/// Continuous pinch time before it is considered valid, in seconds.
pub const PINCH_VALIDITY_DURATION: f64 = 0.25;
/// Weight of the newest sample in the smoothed position.
pub const SMOOTHING_FACTOR: f32 = 0.3;
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PinchConfig {
    pub distance_threshold: f32,
    pub validity_duration: f64,
    pub smoothing: f32,
    /// Drop the pinch timer on any frame the hand is reported absent.
    /// Off by default: a regained pinch keeps its original start time.
    pub reset_on_absence: bool,
}

impl Default for PinchConfig {
    fn default() -> Self {
        Self {
            distance_threshold: PINCH_DISTANCE_THRESHOLD,
            validity_duration: PINCH_VALIDITY_DURATION,
            smoothing: SMOOTHING_FACTOR,
            reset_on_absence: false,
        }
    }
}

// ── State ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PinchPhase {
    Idle,
    /// Pinching since `since`, not yet held long enough.
    Candidate { since: f64 },
    Valid { since: f64 },
}

impl PinchPhase {
    fn started_at(&self) -> Option<f64> {
        match self {
            Self::Idle => None,
            Self::Candidate { since } | Self::Valid { since } => Some(*since),
        }
    }
}

/// Externally visible pinch state for one hand.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PinchState {
    pub is_pinching: bool,
    pub pinch_start: Option<f64>,
    pub is_valid: bool,
    pub smoothed_position: Vec3,
}

impl PinchState {
    /// Whether consumers should show this pinch.
    pub fn active(&self) -> bool {
        self.is_pinching && self.is_valid
    }
}

#[derive(Debug, Clone)]
pub struct PinchTracker {
    chirality: Chirality,
    config: PinchConfig,
    phase: PinchPhase,
    smoothed: Option<Vec3>,
}

impl PinchTracker {
    pub fn new(chirality: Chirality, config: PinchConfig) -> Self {
        Self {
            chirality,
            config,
            phase: PinchPhase::Idle,
            smoothed: None,
        }
    }

    pub fn phase(&self) -> PinchPhase {
        self.phase
    }

    pub fn config(&self) -> &PinchConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: PinchConfig) {
        self.config = config;
    }

    pub fn state(&self) -> PinchState {
        PinchState {
            is_pinching: self.phase != PinchPhase::Idle,
            pinch_start: self.phase.started_at(),
            is_valid: matches!(self.phase, PinchPhase::Valid { .. }),
            smoothed_position: self.smoothed.unwrap_or(Vec3::ZERO),
        }
    }

    /// Advance one frame with world-space thumb and index tip positions.
    pub fn update(&mut self, thumb: Vec3, index: Vec3, now: f64) -> PinchState {
        let raw = (thumb + index) * 0.5;
        self.smoothed = Some(match self.smoothed {
            Some(prev) => prev.lerp(raw, self.config.smoothing),
            None => raw,
        });

        if thumb.distance(index) < self.config.distance_threshold {
            self.hold(now);
        } else {
            self.release();
        }
        self.state()
    }

    /// Advance one frame for a tracked hand whose thumb or index tip is
    /// unavailable. The raw pinch test fails and the position is kept.
    pub fn update_without_tips(&mut self) -> PinchState {
        self.release();
        self.state()
    }

    /// The hand had no sensor data this frame. Only acts when
    /// `reset_on_absence` is set; the smoothed position is kept either way.
    pub fn mark_absent(&mut self) {
        if self.config.reset_on_absence && self.phase != PinchPhase::Idle {
            debug!("{} hand absent, dropping pinch timer", self.chirality.as_str());
            self.phase = PinchPhase::Idle;
        }
    }

    /// Forget everything, including the smoothed position.
    pub fn reset(&mut self) {
        self.phase = PinchPhase::Idle;
        self.smoothed = None;
    }

    fn hold(&mut self, now: f64) {
        let since = match self.phase {
            PinchPhase::Valid { .. } => return,
            PinchPhase::Candidate { since } => since,
            PinchPhase::Idle => {
                debug!("{} pinch candidate at {now:.3}", self.chirality.as_str());
                now
            }
        };
        self.phase = if now - since >= self.config.validity_duration {
            debug!(
                "{} pinch valid after {:.3}s",
                self.chirality.as_str(),
                now - since
            );
            PinchPhase::Valid { since }
        } else {
            PinchPhase::Candidate { since }
        };
    }

    fn release(&mut self) {
        if self.phase != PinchPhase::Idle {
            debug!("{} pinch released", self.chirality.as_str());
        }
        self.phase = PinchPhase::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME: f64 = 1.0 / 90.0;

    fn tracker() -> PinchTracker {
        PinchTracker::new(Chirality::Left, PinchConfig::default())
    }

    /// Thumb and index `gap` meters apart around `center`.
    fn tips(center: Vec3, gap: f32) -> (Vec3, Vec3) {
        let half = Vec3::new(gap * 0.5, 0.0, 0.0);
        (center - half, center + half)
    }

    #[test]
    fn test_new_tracker_idle() {
        let t = tracker();
        assert_eq!(t.phase(), PinchPhase::Idle);
        let s = t.state();
        assert!(!s.is_pinching && !s.is_valid);
        assert_eq!(s.pinch_start, None);
    }

    #[test]
    fn test_far_apart_stays_idle() {
        let mut t = tracker();
        let (a, b) = tips(Vec3::ZERO, 0.05);
        let s = t.update(a, b, 0.0);
        assert!(!s.is_pinching);
        assert_eq!(t.phase(), PinchPhase::Idle);
    }

    #[test]
    fn test_debounce_sustained_pinch() {
        let mut t = tracker();
        let (a, b) = tips(Vec3::ZERO, 0.01);
        let t0 = 10.0;

        let mut frame = 0;
        loop {
            let now = t0 + frame as f64 * FRAME;
            let s = t.update(a, b, now);
            assert!(s.is_pinching, "pinching from the first frame");
            assert_eq!(s.pinch_start, Some(t0));
            if now - t0 < PINCH_VALIDITY_DURATION {
                assert!(!s.is_valid, "valid too early at dt={}", now - t0);
            } else {
                assert!(s.is_valid, "not valid at dt={}", now - t0);
                break;
            }
            frame += 1;
        }
        // 0.25s at 90 Hz is reached on frame 23
        assert_eq!(frame, 23);
    }

    /// Feed `frames` frames at 90 Hz starting at `from`; returns the last state.
    fn run(t: &mut PinchTracker, gap: f32, from: f64, frames: usize) -> PinchState {
        let (a, b) = tips(Vec3::ZERO, gap);
        let mut last = t.state();
        for i in 0..frames {
            last = t.update(a, b, from + i as f64 * FRAME);
        }
        last
    }

    #[test]
    fn test_valid_at_exact_threshold() {
        let mut t = tracker();
        let (a, b) = tips(Vec3::ZERO, 0.01);
        assert!(!t.update(a, b, 1.0).is_valid);
        assert!(!t.update(a, b, 1.0625).is_valid);
        assert!(!t.update(a, b, 1.125).is_valid);
        assert!(!t.update(a, b, 1.1875).is_valid);
        assert!(t.update(a, b, 1.25).is_valid);
        assert!(t.update(a, b, 1.3).is_valid);
    }

    #[test]
    fn test_release_resets_validity_same_frame() {
        let mut t = tracker();
        assert!(run(&mut t, 0.01, 0.0, 30).active());

        let s = run(&mut t, 0.05, 30.0 * FRAME, 1);
        assert!(!s.is_pinching);
        assert!(!s.is_valid);
        assert_eq!(s.pinch_start, None);
    }

    #[test]
    fn test_candidate_release_restarts_timer() {
        let mut t = tracker();
        run(&mut t, 0.01, 0.0, 20);
        run(&mut t, 0.05, 20.0 * FRAME, 1);
        let s = run(&mut t, 0.01, 21.0 * FRAME, 1);
        assert!(s.is_pinching);
        assert_eq!(s.pinch_start, Some(21.0 * FRAME));
        assert!(!run(&mut t, 0.01, 22.0 * FRAME, 10).is_valid);
        assert!(run(&mut t, 0.01, 32.0 * FRAME, 20).is_valid);
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let mut t = tracker();
        let s = t.update(Vec3::ZERO, Vec3::new(0.0301, 0.0, 0.0), 0.0);
        assert!(!s.is_pinching);
        let s = t.update(Vec3::ZERO, Vec3::new(0.0299, 0.0, 0.0), FRAME);
        assert!(s.is_pinching);
    }

    #[test]
    fn test_first_frame_is_raw_midpoint() {
        let mut t = tracker();
        let (a, b) = tips(Vec3::new(0.2, 1.1, -0.3), 0.05);
        let s = t.update(a, b, 0.0);
        assert!(s.smoothed_position.distance(Vec3::new(0.2, 1.1, -0.3)) < 1e-6);
    }

    #[test]
    fn test_smoothing_convergence() {
        let mut t = tracker();
        let (a, b) = tips(Vec3::ZERO, 0.05);
        t.update(a, b, 0.0);

        let target = Vec3::new(1.0, 0.0, 0.0);
        let (a, b) = tips(target, 0.05);
        let mut prev_err = 1.0f32;
        for n in 1..=20 {
            let s = t.update(a, b, n as f64 * FRAME);
            let err = s.smoothed_position.distance(target);
            let expected = (1.0 - SMOOTHING_FACTOR).powi(n);
            assert!((err - expected).abs() < 1e-4, "n={n} err={err} expected={expected}");
            assert!(err < prev_err);
            prev_err = err;
        }
    }

    #[test]
    fn test_smoothing_survives_release() {
        let mut t = tracker();
        let near = tips(Vec3::ZERO, 0.01);
        t.update(near.0, near.1, 0.0);
        let far = tips(Vec3::new(1.0, 0.0, 0.0), 0.05);
        let s = t.update(far.0, far.1, FRAME);
        assert!(!s.is_pinching);
        assert!((s.smoothed_position.x - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_missing_tips_release_and_keep_position() {
        let mut t = tracker();
        let (a, b) = tips(Vec3::new(0.5, 0.0, 0.0), 0.01);
        t.update(a, b, 0.0);
        let s = t.update_without_tips();
        assert!(!s.is_pinching);
        assert!((s.smoothed_position.x - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_validity_independent_of_frame_rate() {
        // 8 Hz: 125 ms between updates
        let mut t = tracker();
        let (a, b) = tips(Vec3::ZERO, 0.01);
        let states: Vec<_> = (0..16).map(|i| t.update(a, b, i as f64 * 0.125)).collect();
        assert!(!states[1].is_valid);
        assert!(states[2].is_valid, "valid at dt=0.25");
        assert!(states.iter().all(|s| s.pinch_start == Some(0.0)));

        // two samples exactly the validity duration apart
        let mut t = tracker();
        t.update(a, b, 0.0);
        assert!(t.update(a, b, 0.25).is_valid);
    }

    #[test]
    fn test_long_pause_keeps_timer() {
        let mut t = tracker();
        let (a, b) = tips(Vec3::ZERO, 0.01);
        t.update(a, b, 0.0);
        t.update(a, b, 0.1);
        // nothing for half a second, still pinching on return
        let s = t.update(a, b, 0.6);
        assert!(s.is_valid);
        assert_eq!(s.pinch_start, Some(0.0));
    }

    #[test]
    fn test_mark_absent_is_opt_in() {
        let (a, b) = tips(Vec3::new(0.4, 0.0, 0.0), 0.01);

        let mut t = tracker();
        t.update(a, b, 0.0);
        t.mark_absent();
        assert_eq!(t.phase(), PinchPhase::Candidate { since: 0.0 });

        let mut t = PinchTracker::new(
            Chirality::Right,
            PinchConfig {
                reset_on_absence: true,
                ..PinchConfig::default()
            },
        );
        t.update(a, b, 0.0);
        t.mark_absent();
        assert_eq!(t.phase(), PinchPhase::Idle);
        assert!((t.state().smoothed_position.x - 0.4).abs() < 1e-6);
        let s = t.update(a, b, 0.3);
        assert_eq!(s.pinch_start, Some(0.3));
        assert!(!s.is_valid);
    }

    #[test]
    fn test_reset() {
        let mut t = tracker();
        let (a, b) = tips(Vec3::ONE, 0.01);
        t.update(a, b, 0.0);
        t.reset();
        assert_eq!(t.phase(), PinchPhase::Idle);
        assert_eq!(t.state().smoothed_position, Vec3::ZERO);
    }
}
