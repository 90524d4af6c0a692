//! Static pose classification from hand snapshots.
//!
//! Every predicate is re-evaluated from scratch each frame. A hand may match
//! any number of single-hand poses at once; two-hand poses are only checked
//! when both hands are present.

use std::collections::BTreeSet;
use std::f32::consts::FRAC_PI_2;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::geometry::{FORWARD, angle_between, angle_from_vertical, within};
use crate::joints::{Finger, JointId};
use crate::skeleton::HandSnapshot;

pub const ANGLE_TOLERANCE_DEG: f32 = 15.0;
/// Default angular tolerance in radians.
pub const ANGLE_TOLERANCE: f32 = ANGLE_TOLERANCE_DEG * std::f32::consts::PI / 180.0;
/// Default positional tolerance in meters.
pub const DISTANCE_TOLERANCE: f32 = 0.02;

// ── Labels ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Pose {
    /// Every fingertip curled onto its knuckle.
    Fist,
    /// Every fingertip well away from the palm.
    OpenHand,
    /// Index extended, middle and ring curled.
    PointIndex,
    /// Thumb tip touching little fingertip.
    Custom1,
    /// Palm facing forward.
    Custom2,
}

impl Pose {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fist => "fist",
            Self::OpenHand => "open-hand",
            Self::PointIndex => "point-index",
            Self::Custom1 => "custom1",
            Self::Custom2 => "custom2",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TwoHandPose {
    PalmsTogetherArmsHorizontal,
    RightFistAboveLeftOpenHand,
    FingersBent90,
    TShapeFingertipsTouch,
}

impl TwoHandPose {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PalmsTogetherArmsHorizontal => "palms-together-arms-horizontal",
            Self::RightFistAboveLeftOpenHand => "right-fist-above-left-open-hand",
            Self::FingersBent90 => "fingers-bent90",
            Self::TShapeFingertipsTouch => "t-shape-fingertips-touch",
        }
    }
}

// ── Missing joints ─────────────────────────────────────────

/// How predicates treat a joint the provider did not report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MissingJointPolicy {
    /// Any predicate reading a missing joint is not matched.
    #[default]
    FailClosed,
    /// Missing joints read as the world origin.
    ZeroDefault,
}

/// Snapshot lookups filtered through a [`MissingJointPolicy`].
struct Reader<'a> {
    snap: &'a HandSnapshot,
    policy: MissingJointPolicy,
}

impl Reader<'_> {
    fn joint(&self, id: JointId) -> Option<Vec3> {
        match self.policy {
            MissingJointPolicy::FailClosed => self.snap.joint(id),
            MissingJointPolicy::ZeroDefault => Some(self.snap.joint(id).unwrap_or(Vec3::ZERO)),
        }
    }

    fn palm(&self) -> Option<Vec3> {
        match self.policy {
            MissingJointPolicy::FailClosed => self.snap.palm(),
            MissingJointPolicy::ZeroDefault => Some(self.snap.palm_position),
        }
    }

    fn normal(&self) -> Option<Vec3> {
        match self.policy {
            MissingJointPolicy::FailClosed => self.snap.normal(),
            MissingJointPolicy::ZeroDefault => Some(self.snap.palm_normal),
        }
    }

    fn forearm_direction(&self) -> Option<Vec3> {
        Some(self.joint(JointId::ForearmArm)? - self.joint(JointId::Wrist)?)
    }

    fn distance(&self, a: JointId, b: JointId) -> Option<f32> {
        Some(self.joint(a)?.distance(self.joint(b)?))
    }
}

// ── Classifier ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseClassifier {
    /// Radians.
    pub angle_tolerance: f32,
    /// Meters.
    pub distance_tolerance: f32,
    pub missing_joints: MissingJointPolicy,
}

impl Default for PoseClassifier {
    fn default() -> Self {
        Self {
            angle_tolerance: ANGLE_TOLERANCE,
            distance_tolerance: DISTANCE_TOLERANCE,
            missing_joints: MissingJointPolicy::default(),
        }
    }
}

impl PoseClassifier {
    fn reader<'a>(&self, snap: &'a HandSnapshot) -> Reader<'a> {
        Reader {
            snap,
            policy: self.missing_joints,
        }
    }

    /// All single-hand poses the snapshot satisfies.
    pub fn classify_single_hand(&self, snap: &HandSnapshot) -> BTreeSet<Pose> {
        let r = self.reader(snap);
        let checks = [
            (Pose::Fist, self.is_fist(&r)),
            (Pose::OpenHand, self.is_open_hand(&r)),
            (Pose::PointIndex, self.is_point_index(&r)),
            (Pose::Custom1, self.is_custom1(&r)),
            (Pose::Custom2, self.is_custom2(&r)),
        ];
        checks
            .into_iter()
            .filter_map(|(pose, hit)| hit.then_some(pose))
            .collect()
    }

    /// All two-hand poses. Empty unless both snapshots are present.
    pub fn classify_two_hand(
        &self,
        left: Option<&HandSnapshot>,
        right: Option<&HandSnapshot>,
    ) -> BTreeSet<TwoHandPose> {
        let (Some(left), Some(right)) = (left, right) else {
            return BTreeSet::new();
        };
        let l = self.reader(left);
        let r = self.reader(right);
        let checks = [
            (
                TwoHandPose::PalmsTogetherArmsHorizontal,
                self.is_palms_together(&l, &r),
            ),
            (
                TwoHandPose::RightFistAboveLeftOpenHand,
                self.is_fist_above_open(&l, &r),
            ),
            (TwoHandPose::FingersBent90, self.is_fingers_bent(&r)),
            (TwoHandPose::TShapeFingertipsTouch, self.is_t_shape(&l, &r)),
        ];
        checks
            .into_iter()
            .filter_map(|(pose, hit)| hit.then_some(pose))
            .collect()
    }

    // ── single-hand predicates ─────────────────────────────

    fn tip_to_knuckle(&self, r: &Reader, finger: Finger) -> Option<f32> {
        r.distance(finger.tip(), finger.knuckle())
    }

    fn curled(&self, r: &Reader, finger: Finger) -> bool {
        self.tip_to_knuckle(r, finger)
            .is_some_and(|d| d <= self.distance_tolerance)
    }

    fn is_fist(&self, r: &Reader) -> bool {
        Finger::ALL.iter().all(|f| self.curled(r, *f))
    }

    fn is_open_hand(&self, r: &Reader) -> bool {
        let Some(palm) = r.palm() else {
            return false;
        };
        let reach = 5.0 * self.distance_tolerance;
        JointId::fingertips()
            .iter()
            .all(|tip| r.joint(*tip).is_some_and(|p| p.distance(palm) >= reach))
    }

    fn is_point_index(&self, r: &Reader) -> bool {
        let extended = self
            .tip_to_knuckle(r, Finger::Index)
            .is_some_and(|d| d >= 3.0 * self.distance_tolerance);
        extended && self.curled(r, Finger::Middle) && self.curled(r, Finger::Ring)
    }

    fn is_custom1(&self, r: &Reader) -> bool {
        r.distance(JointId::ThumbTip, JointId::LittleFingerTip)
            .is_some_and(|d| d <= 2.0 * self.distance_tolerance)
    }

    fn is_custom2(&self, r: &Reader) -> bool {
        r.normal()
            .is_some_and(|n| angle_between(n, FORWARD) <= self.angle_tolerance)
    }

    // ── two-hand predicates ────────────────────────────────

    fn forearm_level(&self, r: &Reader) -> bool {
        r.forearm_direction()
            .is_some_and(|d| within(d.y, 0.0, self.distance_tolerance))
    }

    fn is_palms_together(&self, l: &Reader, r: &Reader) -> bool {
        let touching = match (l.palm(), r.palm()) {
            (Some(a), Some(b)) => a.distance(b) <= self.distance_tolerance,
            _ => false,
        };
        let right_palm_vertical = r
            .normal()
            .is_some_and(|n| angle_from_vertical(n) <= self.angle_tolerance);
        touching && self.forearm_level(l) && right_palm_vertical
    }

    fn is_fist_above_open(&self, l: &Reader, r: &Reader) -> bool {
        let above = match (l.palm(), r.palm()) {
            (Some(left), Some(right)) => right.y > left.y,
            _ => false,
        };
        self.is_fist(r)
            && self.is_open_hand(l)
            && self.forearm_level(l)
            && self.forearm_level(r)
            && above
    }

    fn is_fingers_bent(&self, r: &Reader) -> bool {
        JointId::intermediate_bases().iter().all(|joint| {
            let (Some(parent), Some(child)) = (joint.parent(), joint.child()) else {
                return false;
            };
            match (r.joint(parent), r.joint(*joint), r.joint(child)) {
                (Some(p), Some(j), Some(c)) => {
                    within(angle_between(p - j, c - j), FRAC_PI_2, self.angle_tolerance)
                }
                _ => false,
            }
        })
    }

    fn is_t_shape(&self, l: &Reader, r: &Reader) -> bool {
        let d = self.distance_tolerance;
        let right_upright = r
            .forearm_direction()
            .is_some_and(|v| within(v.x, 0.0, d) && within(v.z, 0.0, d) && v.y > 0.0);
        let tips_touch = JointId::fingertips()
            .iter()
            .all(|tip| match (l.joint(*tip), r.joint(*tip)) {
                (Some(a), Some(b)) => a.distance(b) <= d,
                _ => false,
            });
        right_upright
            && self.is_open_hand(r)
            && self.forearm_level(l)
            && self.is_open_hand(l)
            && tips_touch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::joints::Chirality;
    use std::collections::HashMap;

    // ── Test hands ─────────────────────────────────────────

    fn snapshot(chirality: Chirality, joints: &[(JointId, Vec3)]) -> HandSnapshot {
        HandSnapshot::from_world(chirality, joints.iter().copied().collect::<HashMap<_, _>>())
    }

    fn set(joints: &mut Vec<(JointId, Vec3)>, id: JointId, p: Vec3) {
        joints.retain(|(j, _)| *j != id);
        joints.push((id, p));
    }

    /// Palm at `origin`, forearm level behind the wrist, palm facing up.
    fn base_hand(origin: Vec3) -> Vec<(JointId, Vec3)> {
        let mut j = vec![
            (JointId::Wrist, origin),
            (JointId::ForearmArm, origin + Vec3::new(0.0, 0.0, 0.25)),
            (JointId::IndexFingerMetacarpal, origin + Vec3::new(0.03, 0.0, -0.04)),
            (JointId::MiddleFingerMetacarpal, origin + Vec3::new(0.0, 0.0, -0.04)),
            (JointId::RingFingerMetacarpal, origin + Vec3::new(-0.02, 0.0, -0.04)),
            (JointId::LittleFingerMetacarpal, origin + Vec3::new(-0.04, 0.0, -0.035)),
        ];
        for (i, f) in Finger::ALL.iter().enumerate() {
            let x = 0.04 - 0.02 * i as f32;
            j.push((f.knuckle(), origin + Vec3::new(x, 0.0, -0.07)));
        }
        j
    }

    /// Fingertips resting on their knuckles.
    fn fist(origin: Vec3) -> Vec<(JointId, Vec3)> {
        let mut j = base_hand(origin);
        for f in Finger::ALL {
            let knuckle = j.iter().find(|(id, _)| *id == f.knuckle()).unwrap().1;
            set(&mut j, f.tip(), knuckle + Vec3::new(0.0, 0.01, 0.0));
        }
        j
    }

    /// Fingertips spread well beyond the palm.
    fn open(origin: Vec3) -> Vec<(JointId, Vec3)> {
        let mut j = base_hand(origin);
        for (i, f) in Finger::ALL.iter().enumerate() {
            let x = 0.08 - 0.04 * i as f32;
            set(&mut j, f.tip(), origin + Vec3::new(x, 0.0, -0.17));
        }
        j
    }

    fn single(joints: &[(JointId, Vec3)]) -> BTreeSet<Pose> {
        PoseClassifier::default().classify_single_hand(&snapshot(Chirality::Left, joints))
    }

    // ── Single-hand ────────────────────────────────────────

    #[test]
    fn test_fist_detection() {
        let poses = single(&fist(Vec3::ZERO));
        assert!(poses.contains(&Pose::Fist), "got {poses:?}");
        assert!(!poses.contains(&Pose::OpenHand));
    }

    #[test]
    fn test_fist_rejected_by_one_finger() {
        let mut j = fist(Vec3::ZERO);
        let knuckle = Vec3::new(0.0, 0.0, -0.07);
        set(&mut j, JointId::MiddleFingerTip, knuckle + Vec3::new(0.0, 0.021, 0.0));
        assert!(!single(&j).contains(&Pose::Fist));
    }

    #[test]
    fn test_fist_boundary_inclusive() {
        let mut j = fist(Vec3::ZERO);
        let knuckle = Vec3::new(0.0, 0.0, -0.07);
        set(&mut j, JointId::MiddleFingerTip, knuckle + Vec3::new(0.0, 0.0199, 0.0));
        assert!(single(&j).contains(&Pose::Fist));
    }

    #[test]
    fn test_open_hand_detection() {
        let poses = single(&open(Vec3::new(0.3, 1.2, -0.4)));
        assert!(poses.contains(&Pose::OpenHand), "got {poses:?}");
        assert!(!poses.contains(&Pose::Fist));
    }

    #[test]
    fn test_open_hand_rejected_by_one_finger() {
        let mut j = open(Vec3::ZERO);
        let palm = snapshot(Chirality::Left, &j).palm().unwrap();
        set(&mut j, JointId::RingFingerTip, palm + Vec3::new(0.0, 0.0, -0.09));
        assert!(!single(&j).contains(&Pose::OpenHand));
    }

    #[test]
    fn test_point_index() {
        let mut j = fist(Vec3::ZERO);
        set(&mut j, JointId::IndexFingerTip, Vec3::new(0.02, 0.0, -0.15));
        let poses = single(&j);
        assert!(poses.contains(&Pose::PointIndex), "got {poses:?}");
        assert!(!poses.contains(&Pose::Fist));
    }

    #[test]
    fn test_point_index_needs_middle_curled() {
        let mut j = fist(Vec3::ZERO);
        set(&mut j, JointId::IndexFingerTip, Vec3::new(0.02, 0.0, -0.15));
        set(&mut j, JointId::MiddleFingerTip, Vec3::new(0.0, 0.0, -0.15));
        assert!(!single(&j).contains(&Pose::PointIndex));
    }

    #[test]
    fn test_custom1_thumb_to_little() {
        let mut j = open(Vec3::ZERO);
        set(&mut j, JointId::ThumbTip, Vec3::new(-0.05, 0.02, -0.1));
        set(&mut j, JointId::LittleFingerTip, Vec3::new(-0.05, 0.0, -0.1));
        assert!(single(&j).contains(&Pose::Custom1));
        assert!(!single(&open(Vec3::ZERO)).contains(&Pose::Custom1));
    }

    #[test]
    fn test_custom2_palm_forward() {
        // base_hand normal is up; tip the palm to face -Z.
        let j = [
            (JointId::Wrist, Vec3::ZERO),
            (JointId::IndexFingerMetacarpal, Vec3::new(0.0, 0.04, 0.0)),
            (JointId::MiddleFingerMetacarpal, Vec3::new(0.03, 0.04, 0.0)),
        ];
        assert!(single(&j).contains(&Pose::Custom2));
        assert!(!single(&base_hand(Vec3::ZERO)).contains(&Pose::Custom2));
    }

    #[test]
    fn test_missing_joints_fail_closed() {
        let mut j = fist(Vec3::ZERO);
        j.retain(|(id, _)| *id != JointId::ThumbTip);
        assert!(!single(&j).contains(&Pose::Fist));
        assert!(single(&[]).is_empty());
    }

    #[test]
    fn test_zero_default_policy() {
        let classifier = PoseClassifier {
            missing_joints: MissingJointPolicy::ZeroDefault,
            ..PoseClassifier::default()
        };
        // Thumb tip and knuckle both missing read as the origin: curled.
        let mut j = fist(Vec3::new(1.0, 1.0, 1.0));
        j.retain(|(id, _)| *id != JointId::ThumbTip && *id != JointId::ThumbKnuckle);
        let snap = snapshot(Chirality::Left, &j);
        assert!(classifier.classify_single_hand(&snap).contains(&Pose::Fist));
        assert!(!PoseClassifier::default().classify_single_hand(&snap).contains(&Pose::Fist));
    }

    // ── Two-hand ───────────────────────────────────────────

    #[test]
    fn test_two_hand_gating() {
        let c = PoseClassifier::default();
        let left = snapshot(Chirality::Left, &open(Vec3::ZERO));
        let right = snapshot(Chirality::Right, &fist(Vec3::new(0.0, 0.1, 0.0)));
        assert!(c.classify_two_hand(Some(&left), None).is_empty());
        assert!(c.classify_two_hand(None, Some(&right)).is_empty());
        assert!(c.classify_two_hand(None, None).is_empty());
    }

    #[test]
    fn test_right_fist_above_left_open_hand() {
        let c = PoseClassifier::default();
        let left = snapshot(Chirality::Left, &open(Vec3::new(-0.05, 1.0, -0.3)));
        let right = snapshot(Chirality::Right, &fist(Vec3::new(-0.05, 1.1, -0.3)));
        let poses = c.classify_two_hand(Some(&left), Some(&right));
        assert_eq!(
            poses,
            BTreeSet::from([TwoHandPose::RightFistAboveLeftOpenHand])
        );
    }

    #[test]
    fn test_right_fist_below_is_rejected() {
        let c = PoseClassifier::default();
        let left = snapshot(Chirality::Left, &open(Vec3::new(0.0, 1.1, 0.0)));
        let right = snapshot(Chirality::Right, &fist(Vec3::new(0.0, 1.0, 0.0)));
        assert!(c.classify_two_hand(Some(&left), Some(&right)).is_empty());
    }

    #[test]
    fn test_palms_together() {
        let c = PoseClassifier::default();
        let left = snapshot(Chirality::Left, &base_hand(Vec3::ZERO));
        let right = snapshot(Chirality::Right, &base_hand(Vec3::new(0.0, 0.01, 0.0)));
        let poses = c.classify_two_hand(Some(&left), Some(&right));
        assert!(poses.contains(&TwoHandPose::PalmsTogetherArmsHorizontal), "got {poses:?}");

        let right = snapshot(Chirality::Right, &base_hand(Vec3::new(0.0, 0.05, 0.0)));
        let poses = c.classify_two_hand(Some(&left), Some(&right));
        assert!(!poses.contains(&TwoHandPose::PalmsTogetherArmsHorizontal));
    }

    #[test]
    fn test_palms_together_needs_vertical_right_normal() {
        let c = PoseClassifier::default();
        let left = snapshot(Chirality::Left, &base_hand(Vec3::ZERO));
        let origin = Vec3::new(0.0, 0.01, 0.0);
        let mut r = base_hand(origin);
        // raise the index metacarpal: normal tilts ~27 degrees, palm moves 3 mm
        set(&mut r, JointId::IndexFingerMetacarpal, origin + Vec3::new(0.03, 0.015, -0.04));
        let right = snapshot(Chirality::Right, &r);
        assert!(right.palm().unwrap().distance(left.palm().unwrap()) <= DISTANCE_TOLERANCE);
        let poses = c.classify_two_hand(Some(&left), Some(&right));
        assert!(!poses.contains(&TwoHandPose::PalmsTogetherArmsHorizontal), "got {poses:?}");
    }

    #[test]
    fn test_palms_together_needs_level_left_arm() {
        let c = PoseClassifier::default();
        let mut l = base_hand(Vec3::ZERO);
        set(&mut l, JointId::ForearmArm, Vec3::new(0.0, -0.2, 0.15));
        let left = snapshot(Chirality::Left, &l);
        let right = snapshot(Chirality::Right, &base_hand(Vec3::ZERO));
        let poses = c.classify_two_hand(Some(&left), Some(&right));
        assert!(!poses.contains(&TwoHandPose::PalmsTogetherArmsHorizontal));
    }

    /// Every finger bent at its intermediate-base joint by `degrees`.
    fn bent(degrees: f32) -> Vec<(JointId, Vec3)> {
        let mut j = base_hand(Vec3::ZERO);
        let rad = degrees.to_radians();
        for (i, f) in Finger::ALL.iter().enumerate() {
            let x = 0.04 - 0.02 * i as f32;
            let joint = Vec3::new(x, 0.0, -0.1);
            // parent sits straight back towards the wrist
            let parent = f.intermediate_base().parent().unwrap();
            set(&mut j, parent, joint + Vec3::new(0.0, 0.0, 0.03));
            set(&mut j, f.intermediate_base(), joint);
            let child = f.intermediate_base().child().unwrap();
            let dir = Vec3::new(0.0, -rad.sin(), rad.cos());
            set(&mut j, child, joint + dir * 0.025);
        }
        j
    }

    #[test]
    fn test_fingers_bent_90() {
        let c = PoseClassifier::default();
        let left = snapshot(Chirality::Left, &[]);
        let right = snapshot(Chirality::Right, &bent(90.0));
        assert!(
            c.classify_two_hand(Some(&left), Some(&right))
                .contains(&TwoHandPose::FingersBent90)
        );
        let right = snapshot(Chirality::Right, &bent(100.0));
        assert!(
            c.classify_two_hand(Some(&left), Some(&right))
                .contains(&TwoHandPose::FingersBent90)
        );
        let right = snapshot(Chirality::Right, &bent(120.0));
        assert!(
            !c.classify_two_hand(Some(&left), Some(&right))
                .contains(&TwoHandPose::FingersBent90)
        );
    }

    #[test]
    fn test_t_shape() {
        let c = PoseClassifier::default();
        let left = open(Vec3::ZERO);
        // Right hand: same fingertips, forearm hanging straight up from the wrist.
        let mut right = left.clone();
        set(&mut right, JointId::ForearmArm, Vec3::new(0.0, 0.25, 0.0));
        let poses = c.classify_two_hand(
            Some(&snapshot(Chirality::Left, &left)),
            Some(&snapshot(Chirality::Right, &right)),
        );
        assert!(poses.contains(&TwoHandPose::TShapeFingertipsTouch), "got {poses:?}");

        // one fingertip pair 3 cm apart, everything else unchanged
        let mut apart = right.clone();
        set(&mut apart, JointId::LittleFingerTip, Vec3::new(-0.08, 0.03, -0.17));
        let poses = c.classify_two_hand(
            Some(&snapshot(Chirality::Left, &left)),
            Some(&snapshot(Chirality::Right, &apart)),
        );
        assert!(!poses.contains(&TwoHandPose::TShapeFingertipsTouch), "got {poses:?}");
        assert!(
            c.classify_single_hand(&snapshot(Chirality::Right, &apart))
                .contains(&Pose::OpenHand)
        );

        set(&mut right, JointId::ForearmArm, Vec3::new(0.0, -0.25, 0.0));
        let poses = c.classify_two_hand(
            Some(&snapshot(Chirality::Left, &left)),
            Some(&snapshot(Chirality::Right, &right)),
        );
        assert!(!poses.contains(&TwoHandPose::TShapeFingertipsTouch));
    }

    #[test]
    fn test_labels_as_str() {
        assert_eq!(Pose::OpenHand.as_str(), "open-hand");
        assert_eq!(
            serde_json::to_string(&TwoHandPose::RightFistAboveLeftOpenHand).unwrap(),
            "\"right-fist-above-left-open-hand\""
        );
    }
}
