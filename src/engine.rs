//! Per-frame orchestration: snapshots, pose classification and pinch
//! tracking for both hands, aggregated into one result.

use std::collections::BTreeSet;

use glam::Vec3;
use log::{debug, trace};
use serde::Serialize;

use crate::classifier::{MissingJointPolicy, Pose, TwoHandPose};
use crate::config::EngineSettings;
use crate::joints::{Chirality, JointId};
use crate::pinch::{PinchState, PinchTracker};
use crate::sensor::{HandAnchorSource, SensorFrame};
use crate::skeleton::{HandAnchor, HandSnapshot};

// ── Results ────────────────────────────────────────────────

/// Per-hand output for one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HandResult {
    /// Pinching and held long enough to count.
    pub pinch_active: bool,
    /// Smoothed thumb/index midpoint.
    pub position: Vec3,
    pub poses: BTreeSet<Pose>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GestureFrameResult {
    pub timestamp: f64,
    /// `None` when the hand had no sensor data this frame.
    pub left: Option<HandResult>,
    pub right: Option<HandResult>,
    pub two_hand_poses: BTreeSet<TwoHandPose>,
}

impl GestureFrameResult {
    pub fn hand(&self, chirality: Chirality) -> Option<&HandResult> {
        match chirality {
            Chirality::Left => self.left.as_ref(),
            Chirality::Right => self.right.as_ref(),
        }
    }
}

/// Flags a UI layer polls between frames.
///
/// Positions only move while that hand's pinch is active; otherwise the flag
/// drops and the last position is kept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PinchObservables {
    pub is_pinching_left_hand: bool,
    pub is_pinching_right_hand: bool,
    pub left_pinch_position: Vec3,
    pub right_pinch_position: Vec3,
}

impl PinchObservables {
    fn record(&mut self, chirality: Chirality, pinch: Option<&PinchState>) {
        let (flag, position) = match chirality {
            Chirality::Left => (
                &mut self.is_pinching_left_hand,
                &mut self.left_pinch_position,
            ),
            Chirality::Right => (
                &mut self.is_pinching_right_hand,
                &mut self.right_pinch_position,
            ),
        };
        match pinch {
            Some(p) if p.active() => {
                *flag = true;
                *position = p.smoothed_position;
            }
            _ => *flag = false,
        }
    }
}

// ── Engine ─────────────────────────────────────────────────

pub struct GestureFrameEngine {
    settings: EngineSettings,
    left: PinchTracker,
    right: PinchTracker,
    observables: PinchObservables,
}

impl Default for GestureFrameEngine {
    fn default() -> Self {
        Self::new(EngineSettings::default())
    }
}

impl GestureFrameEngine {
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            settings,
            left: PinchTracker::new(Chirality::Left, settings.pinch),
            right: PinchTracker::new(Chirality::Right, settings.pinch),
            observables: PinchObservables::default(),
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Apply new thresholds. Pinch timers and smoothing carry over.
    pub fn set_settings(&mut self, settings: EngineSettings) {
        self.settings = settings;
        self.left.set_config(settings.pinch);
        self.right.set_config(settings.pinch);
    }

    pub fn observables(&self) -> &PinchObservables {
        &self.observables
    }

    pub fn tracker(&self, chirality: Chirality) -> &PinchTracker {
        match chirality {
            Chirality::Left => &self.left,
            Chirality::Right => &self.right,
        }
    }

    fn tracker_mut(&mut self, chirality: Chirality) -> &mut PinchTracker {
        match chirality {
            Chirality::Left => &mut self.left,
            Chirality::Right => &mut self.right,
        }
    }

    pub fn reset(&mut self) {
        self.left.reset();
        self.right.reset();
        self.observables = PinchObservables::default();
    }

    /// Read the latest anchor for each hand once and evaluate the frame.
    pub fn tick<S: HandAnchorSource + ?Sized>(&mut self, source: &S, now: f64) -> GestureFrameResult {
        let left = source.latest(Chirality::Left);
        let right = source.latest(Chirality::Right);
        self.process_hands(now, left.as_deref(), right.as_deref())
    }

    pub fn process(&mut self, frame: &SensorFrame) -> GestureFrameResult {
        self.process_hands(frame.timestamp, frame.left.as_ref(), frame.right.as_ref())
    }

    pub fn process_hands(
        &mut self,
        now: f64,
        left: Option<&HandAnchor>,
        right: Option<&HandAnchor>,
    ) -> GestureFrameResult {
        let snaps = [
            left.map(|a| self.snapshot(Chirality::Left, a)),
            right.map(|a| self.snapshot(Chirality::Right, a)),
        ];

        let mut results: [Option<HandResult>; 2] = [None, None];
        for (i, chirality) in Chirality::BOTH.into_iter().enumerate() {
            results[i] = match &snaps[i] {
                Some(snap) => Some(self.evaluate_hand(snap, now)),
                None => {
                    // no stale reuse: the tracker is not advanced this frame
                    self.tracker_mut(chirality).mark_absent();
                    self.observables.record(chirality, None);
                    None
                }
            };
        }

        let [left_snap, right_snap] = snaps;
        let two_hand_poses = self
            .settings
            .classifier
            .classify_two_hand(left_snap.as_ref(), right_snap.as_ref());

        let [left, right] = results;
        trace!(
            "frame {now:.3}: left={} right={} two-hand={:?}",
            left.is_some(),
            right.is_some(),
            two_hand_poses
        );

        GestureFrameResult {
            timestamp: now,
            left,
            right,
            two_hand_poses,
        }
    }

    fn snapshot(&self, slot: Chirality, anchor: &HandAnchor) -> HandSnapshot {
        if anchor.chirality != slot {
            debug!(
                "{} anchor delivered in the {} slot",
                anchor.chirality.as_str(),
                slot.as_str()
            );
        }
        HandSnapshot::build(slot, anchor)
    }

    fn evaluate_hand(&mut self, snap: &HandSnapshot, now: f64) -> HandResult {
        let poses = self.settings.classifier.classify_single_hand(snap);
        let pinch = self.advance_pinch(snap, now);
        self.observables.record(snap.chirality, Some(&pinch));
        HandResult {
            pinch_active: pinch.active(),
            position: pinch.smoothed_position,
            poses,
        }
    }

    fn advance_pinch(&mut self, snap: &HandSnapshot, now: f64) -> PinchState {
        let policy = self.settings.classifier.missing_joints;
        let tip = |id: JointId| match policy {
            MissingJointPolicy::FailClosed => snap.joint(id),
            MissingJointPolicy::ZeroDefault => Some(snap.joint(id).unwrap_or(Vec3::ZERO)),
        };
        let tips = (tip(JointId::ThumbTip), tip(JointId::IndexFingerTip));
        let tracker = self.tracker_mut(snap.chirality);
        match tips {
            (Some(thumb), Some(index)) => tracker.update(thumb, index, now),
            _ => tracker.update_without_tips(),
        }
    }
}
