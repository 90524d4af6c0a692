//! Hand pose classification and pinch tracking over skeletal hand data.
//!
//! Feed [`HandAnchor`]s (per-joint transforms relative to a hand anchor)
//! into a [`GestureFrameEngine`] once per frame and read back the matched
//! poses, the debounced pinch state for each hand and the
//! [`PinchObservables`] a UI layer polls.

pub mod classifier;
pub mod config;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod joints;
pub mod pinch;
pub mod sensor;
pub mod skeleton;

pub use classifier::{MissingJointPolicy, Pose, PoseClassifier, TwoHandPose};
pub use config::{EngineSettings, Profile, ProfileStore};
pub use engine::{GestureFrameEngine, GestureFrameResult, HandResult, PinchObservables};
pub use error::{Error, Result};
pub use joints::{Chirality, Finger, JointId};
pub use pinch::{PinchConfig, PinchState, PinchTracker};
pub use sensor::{AnchorCells, HandAnchorSource, LatestValue, SensorFrame, read_frames};
pub use skeleton::{HandAnchor, HandSnapshot, JointTransform};
