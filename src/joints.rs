//! Skeletal joint identifiers and finger topology.
//!
//! Models the 27 joints reported per hand by the tracking provider: wrist,
//! two forearm joints, four thumb joints and five joints for each of the
//! remaining fingers. Every finger chain is rooted at the wrist.

use serde::{Deserialize, Serialize};

// ── Hand ───────────────────────────────────────────────────

/// Which hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Chirality {
    Left,
    Right,
}

impl Chirality {
    pub const BOTH: [Chirality; 2] = [Chirality::Left, Chirality::Right];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            _ => None,
        }
    }
}

// ── Fingers ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Finger {
    Thumb,
    Index,
    Middle,
    Ring,
    Little,
}

impl Finger {
    pub const ALL: [Finger; 5] = [
        Finger::Thumb,
        Finger::Index,
        Finger::Middle,
        Finger::Ring,
        Finger::Little,
    ];

    /// Joints of this finger ordered from the palm outwards.
    pub fn chain(&self) -> &'static [JointId] {
        use JointId::*;
        match self {
            Self::Thumb => &[
                ThumbKnuckle,
                ThumbIntermediateBase,
                ThumbIntermediateTip,
                ThumbTip,
            ],
            Self::Index => &[
                IndexFingerMetacarpal,
                IndexFingerKnuckle,
                IndexFingerIntermediateBase,
                IndexFingerIntermediateTip,
                IndexFingerTip,
            ],
            Self::Middle => &[
                MiddleFingerMetacarpal,
                MiddleFingerKnuckle,
                MiddleFingerIntermediateBase,
                MiddleFingerIntermediateTip,
                MiddleFingerTip,
            ],
            Self::Ring => &[
                RingFingerMetacarpal,
                RingFingerKnuckle,
                RingFingerIntermediateBase,
                RingFingerIntermediateTip,
                RingFingerTip,
            ],
            Self::Little => &[
                LittleFingerMetacarpal,
                LittleFingerKnuckle,
                LittleFingerIntermediateBase,
                LittleFingerIntermediateTip,
                LittleFingerTip,
            ],
        }
    }

    pub fn tip(&self) -> JointId {
        let chain = self.chain();
        chain[chain.len() - 1]
    }

    /// Base joint a fingertip is measured against when judging curl.
    pub fn knuckle(&self) -> JointId {
        match self {
            Self::Thumb => JointId::ThumbKnuckle,
            Self::Index => JointId::IndexFingerKnuckle,
            Self::Middle => JointId::MiddleFingerKnuckle,
            Self::Ring => JointId::RingFingerKnuckle,
            Self::Little => JointId::LittleFingerKnuckle,
        }
    }

    pub fn intermediate_base(&self) -> JointId {
        let chain = self.chain();
        chain[chain.len() - 3]
    }
}

// ── Joints ─────────────────────────────────────────────────

/// The joints reported for one hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JointId {
    Wrist,
    ForearmWrist,
    ForearmArm,
    ThumbKnuckle,
    ThumbIntermediateBase,
    ThumbIntermediateTip,
    ThumbTip,
    IndexFingerMetacarpal,
    IndexFingerKnuckle,
    IndexFingerIntermediateBase,
    IndexFingerIntermediateTip,
    IndexFingerTip,
    MiddleFingerMetacarpal,
    MiddleFingerKnuckle,
    MiddleFingerIntermediateBase,
    MiddleFingerIntermediateTip,
    MiddleFingerTip,
    RingFingerMetacarpal,
    RingFingerKnuckle,
    RingFingerIntermediateBase,
    RingFingerIntermediateTip,
    RingFingerTip,
    LittleFingerMetacarpal,
    LittleFingerKnuckle,
    LittleFingerIntermediateBase,
    LittleFingerIntermediateTip,
    LittleFingerTip,
}

/// Total number of joints per hand.
pub const JOINT_COUNT: usize = 27;

impl JointId {
    pub const ALL: [JointId; JOINT_COUNT] = {
        use JointId::*;
        [
            Wrist,
            ForearmWrist,
            ForearmArm,
            ThumbKnuckle,
            ThumbIntermediateBase,
            ThumbIntermediateTip,
            ThumbTip,
            IndexFingerMetacarpal,
            IndexFingerKnuckle,
            IndexFingerIntermediateBase,
            IndexFingerIntermediateTip,
            IndexFingerTip,
            MiddleFingerMetacarpal,
            MiddleFingerKnuckle,
            MiddleFingerIntermediateBase,
            MiddleFingerIntermediateTip,
            MiddleFingerTip,
            RingFingerMetacarpal,
            RingFingerKnuckle,
            RingFingerIntermediateBase,
            RingFingerIntermediateTip,
            RingFingerTip,
            LittleFingerMetacarpal,
            LittleFingerKnuckle,
            LittleFingerIntermediateBase,
            LittleFingerIntermediateTip,
            LittleFingerTip,
        ]
    };

    /// The four metacarpals averaged with the wrist to locate the palm.
    pub const METACARPALS: [JointId; 4] = [
        JointId::IndexFingerMetacarpal,
        JointId::MiddleFingerMetacarpal,
        JointId::RingFingerMetacarpal,
        JointId::LittleFingerMetacarpal,
    ];

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn finger(&self) -> Option<Finger> {
        Finger::ALL
            .into_iter()
            .find(|f| f.chain().contains(self))
    }

    /// Next joint towards the body. `None` only for the forearm root.
    pub fn parent(&self) -> Option<JointId> {
        match self {
            Self::ForearmArm => None,
            Self::ForearmWrist => Some(Self::ForearmArm),
            Self::Wrist => Some(Self::ForearmWrist),
            _ => {
                let chain = self.finger()?.chain();
                let pos = chain.iter().position(|j| j == self)?;
                Some(if pos == 0 { Self::Wrist } else { chain[pos - 1] })
            }
        }
    }

    /// Next joint away from the body along a finger. Tips have none, and
    /// the wrist has five so it reports none as well.
    pub fn child(&self) -> Option<JointId> {
        match self {
            Self::ForearmArm => Some(Self::ForearmWrist),
            Self::ForearmWrist => Some(Self::Wrist),
            Self::Wrist => None,
            _ => {
                let chain = self.finger()?.chain();
                let pos = chain.iter().position(|j| j == self)?;
                chain.get(pos + 1).copied()
            }
        }
    }

    /// Wire name, e.g. `index-finger-tip`.
    pub fn as_str(&self) -> &'static str {
        use JointId::*;
        match self {
            Wrist => "wrist",
            ForearmWrist => "forearm-wrist",
            ForearmArm => "forearm-arm",
            ThumbKnuckle => "thumb-knuckle",
            ThumbIntermediateBase => "thumb-intermediate-base",
            ThumbIntermediateTip => "thumb-intermediate-tip",
            ThumbTip => "thumb-tip",
            IndexFingerMetacarpal => "index-finger-metacarpal",
            IndexFingerKnuckle => "index-finger-knuckle",
            IndexFingerIntermediateBase => "index-finger-intermediate-base",
            IndexFingerIntermediateTip => "index-finger-intermediate-tip",
            IndexFingerTip => "index-finger-tip",
            MiddleFingerMetacarpal => "middle-finger-metacarpal",
            MiddleFingerKnuckle => "middle-finger-knuckle",
            MiddleFingerIntermediateBase => "middle-finger-intermediate-base",
            MiddleFingerIntermediateTip => "middle-finger-intermediate-tip",
            MiddleFingerTip => "middle-finger-tip",
            RingFingerMetacarpal => "ring-finger-metacarpal",
            RingFingerKnuckle => "ring-finger-knuckle",
            RingFingerIntermediateBase => "ring-finger-intermediate-base",
            RingFingerIntermediateTip => "ring-finger-intermediate-tip",
            RingFingerTip => "ring-finger-tip",
            LittleFingerMetacarpal => "little-finger-metacarpal",
            LittleFingerKnuckle => "little-finger-knuckle",
            LittleFingerIntermediateBase => "little-finger-intermediate-base",
            LittleFingerIntermediateTip => "little-finger-intermediate-tip",
            LittleFingerTip => "little-finger-tip",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|j| j.as_str() == s)
    }

    pub fn fingertips() -> [JointId; 5] {
        Finger::ALL.map(|f| f.tip())
    }

    pub fn intermediate_bases() -> [JointId; 5] {
        Finger::ALL.map(|f| f.intermediate_base())
    }
}
