//! Small vector helpers shared by the classifiers.

use glam::Vec3;

/// Direction the wearer faces in world space.
pub const FORWARD: Vec3 = Vec3::NEG_Z;

/// Angle in radians between two vectors.
///
/// The cosine is clamped to `[-1, 1]` so rounding just outside the domain of
/// `acos` cannot yield NaN. A zero-length operand gives 0.
pub fn angle_between(a: Vec3, b: Vec3) -> f32 {
    let denom = a.length() * b.length();
    let cos = a.dot(b) / denom;
    if denom == 0.0 || !cos.is_finite() {
        return 0.0;
    }
    cos.clamp(-1.0, 1.0).acos()
}

/// Angle between `v` and the vertical axis, ignoring which way it points.
pub fn angle_from_vertical(v: Vec3) -> f32 {
    angle_between(v, Vec3::Y).min(angle_between(v, Vec3::NEG_Y))
}

pub fn within(value: f32, target: f32, tolerance: f32) -> bool {
    (value - target).abs() <= tolerance
}
