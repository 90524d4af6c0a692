//! World-space hand snapshots built from raw anchor data.
//!
//! The tracking provider reports every joint relative to the hand anchor,
//! and the anchor relative to the world origin. A [`HandSnapshot`] flattens
//! that into world positions plus the derived palm and forearm landmarks the
//! classifiers read. Snapshots are rebuilt every frame and never retained.

use std::collections::HashMap;

use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

use crate::joints::{Chirality, JointId};

// ── Raw sensor data ────────────────────────────────────────

fn default_tracked() -> bool {
    true
}

/// One joint as reported by the provider, relative to the hand anchor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointTransform {
    pub transform: Mat4,
    /// Providers keep reporting occluded joints with a stale pose.
    #[serde(default = "default_tracked")]
    pub tracked: bool,
}

impl JointTransform {
    pub fn at(position: Vec3) -> Self {
        Self {
            transform: Mat4::from_translation(position),
            tracked: true,
        }
    }
}

/// Latest raw data for one hand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandAnchor {
    pub chirality: Chirality,
    pub origin_from_anchor: Mat4,
    #[serde(default)]
    pub joints: HashMap<JointId, JointTransform>,
}

impl HandAnchor {
    pub fn new(chirality: Chirality, origin_from_anchor: Mat4) -> Self {
        Self {
            chirality,
            origin_from_anchor,
            joints: HashMap::new(),
        }
    }

    /// Builder helper: place a joint at a translation relative to the anchor.
    pub fn with_joint(mut self, joint: JointId, position: Vec3) -> Self {
        self.joints.insert(joint, JointTransform::at(position));
        self
    }
}

// ── Snapshot ───────────────────────────────────────────────

/// World-space joint positions and derived landmarks for one hand.
///
/// The public derived fields are zero when their inputs are missing. Use the
/// `Option` accessors to tell an honest zero from an unavailable value.
#[derive(Debug, Clone, PartialEq)]
pub struct HandSnapshot {
    pub chirality: Chirality,
    pub joints: HashMap<JointId, Vec3>,
    /// Mean of the wrist and the four metacarpals.
    pub palm_position: Vec3,
    /// Unit normal of the plane through wrist, index and middle metacarpals.
    pub palm_normal: Vec3,
    pub wrist_position: Vec3,
    pub forearm_position: Vec3,
}

impl HandSnapshot {
    /// Convert an anchor's local joint transforms into world space.
    ///
    /// Untracked joints are dropped; nothing is substituted for them.
    pub fn build(chirality: Chirality, anchor: &HandAnchor) -> Self {
        let joints: HashMap<JointId, Vec3> = anchor
            .joints
            .iter()
            .filter(|(_, jt)| jt.tracked)
            .map(|(id, jt)| {
                let world = anchor.origin_from_anchor * jt.transform;
                (*id, world.w_axis.truncate())
            })
            .collect();
        Self::from_world(chirality, joints)
    }

    /// Build from positions that are already in world space.
    pub fn from_world(chirality: Chirality, joints: HashMap<JointId, Vec3>) -> Self {
        let at = |id: JointId| joints.get(&id).copied().unwrap_or(Vec3::ZERO);

        let wrist = at(JointId::Wrist);
        let palm_position = JointId::METACARPALS
            .iter()
            .fold(wrist, |acc, id| acc + at(*id))
            / (JointId::METACARPALS.len() + 1) as f32;
        let palm_normal = (at(JointId::IndexFingerMetacarpal) - wrist)
            .cross(at(JointId::MiddleFingerMetacarpal) - wrist)
            .normalize_or_zero();

        Self {
            chirality,
            palm_position,
            palm_normal,
            wrist_position: wrist,
            forearm_position: at(JointId::ForearmArm),
            joints,
        }
    }

    pub fn joint(&self, id: JointId) -> Option<Vec3> {
        self.joints.get(&id).copied()
    }

    fn has_all(&self, ids: &[JointId]) -> bool {
        ids.iter().all(|id| self.joints.contains_key(id))
    }

    /// Palm center, only when the wrist and all metacarpals are present.
    pub fn palm(&self) -> Option<Vec3> {
        (self.has_all(&[JointId::Wrist]) && self.has_all(&JointId::METACARPALS))
            .then_some(self.palm_position)
    }

    /// Palm normal, only when its three inputs are present and not collinear.
    pub fn normal(&self) -> Option<Vec3> {
        let inputs = [
            JointId::Wrist,
            JointId::IndexFingerMetacarpal,
            JointId::MiddleFingerMetacarpal,
        ];
        (self.has_all(&inputs) && self.palm_normal != Vec3::ZERO).then_some(self.palm_normal)
    }

    /// Vector from the wrist to the forearm joint.
    pub fn forearm_direction(&self) -> Option<Vec3> {
        Some(self.joint(JointId::ForearmArm)? - self.joint(JointId::Wrist)?)
    }

    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }
}
