//! Core shared types for `drift_core` (engine-agnostic).
// drift_core/types.rs
use nalgebra::{Point3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

pub type Vec3 = Vector3<f32>;
pub type Quat = UnitQuaternion<f32>;

/// Speed below which the vehicle counts as stationary (no steering, no yaw).
pub const MOVING_THRESHOLD: f32 = 0.1;

// ----- tiny angle helpers (degrees, +Y up, +Z forward) -----

/// Yaw about +Y in degrees; positive yaw turns +Z toward +X.
#[inline]
pub fn yaw_of(rot: &Quat) -> f32 {
    let fwd = rot * Vec3::z();
    wrap_degrees(fwd.x.atan2(fwd.z).to_degrees())
}

/// Rotation of `degrees` about world up.
#[inline]
pub fn yaw_rotation(degrees: f32) -> Quat {
    Quat::from_axis_angle(&Vec3::y_axis(), degrees.to_radians())
}

/// Flat forward direction for a yaw in degrees.
#[inline]
pub fn forward_from_yaw(degrees: f32) -> Vec3 {
    let r = degrees.to_radians();
    Vec3::new(r.sin(), 0.0, r.cos())
}

/// Wraps into [0, 360).
#[inline]
pub fn wrap_degrees(a: f32) -> f32 {
    let w = a.rem_euclid(360.0);
    if w >= 360.0 { 0.0 } else { w }
}

/// Shortest signed difference `target - current` in (-180, 180].
#[inline]
pub fn delta_angle(current: f32, target: f32) -> f32 {
    let mut d = (target - current).rem_euclid(360.0);
    if d > 180.0 {
        d -= 360.0;
    }
    d
}

#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

// ============================================
// ----- inputs -------------------------------
// ============================================

/// One tick of driver intent. Values outside their ranges are clamped by
/// [`InputFrame::clamped`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct InputFrame {
    pub steer: f32,    // -1..1
    pub throttle: f32, // 0..1
    pub brake: f32,    // 0..1
}

impl InputFrame {
    pub fn new(steer: f32, throttle: f32, brake: f32) -> Self {
        Self { steer, throttle, brake }.clamped()
    }

    pub fn clamped(self) -> Self {
        let finite = |v: f32| if v.is_finite() { v } else { 0.0 };
        Self {
            steer: finite(self.steer).clamp(-1.0, 1.0),
            throttle: finite(self.throttle).clamp(0.0, 1.0),
            brake: finite(self.brake).clamp(0.0, 1.0),
        }
    }
}

// ============================================
// ----- ground sensing -----------------------
// ============================================

/// Outcome of a downward ground query. `surface_normal` and `distance`
/// only mean something when `grounded` is true.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundProbeResult {
    pub grounded: bool,
    pub surface_normal: Vec3,
    pub distance: f32, // along the ray, from its origin to the contact
}

impl GroundProbeResult {
    pub fn miss() -> Self {
        Self { grounded: false, surface_normal: Vec3::y(), distance: f32::INFINITY }
    }

    pub fn hit(normal: Vec3, distance: f32) -> Self {
        let n = normal.try_normalize(1e-6).unwrap_or_else(Vec3::y);
        Self { grounded: true, surface_normal: n, distance: distance.max(0.0) }
    }
}

/// Synchronous, bounded-cost ground raycast.
pub trait GroundProbe {
    fn probe_ground(
        &self,
        origin: Point3<f32>,
        direction: Vec3,
        max_distance: f32,
        layer_mask: u32,
    ) -> GroundProbeResult;
}

/// Adapts a plain closure into a [`GroundProbe`].
pub struct ProbeFn<F>(pub F);

impl<F> GroundProbe for ProbeFn<F>
where
    F: Fn(Point3<f32>, Vec3, f32, u32) -> GroundProbeResult,
{
    fn probe_ground(&self, origin: Point3<f32>, direction: Vec3, max_distance: f32, layer_mask: u32) -> GroundProbeResult {
        (self.0)(origin, direction, max_distance, layer_mask)
    }
}

impl<T: GroundProbe + ?Sized> GroundProbe for std::sync::Arc<T> {
    fn probe_ground(&self, origin: Point3<f32>, direction: Vec3, max_distance: f32, layer_mask: u32) -> GroundProbeResult {
        (**self).probe_ground(origin, direction, max_distance, layer_mask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaw_matches_rotation() {
        let r = yaw_rotation(30.0);
        assert!((yaw_of(&r) - 30.0).abs() < 1e-3);
        let f = forward_from_yaw(90.0);
        assert!((f - Vec3::x()).norm() < 1e-5);
        assert!((r * Vec3::z() - forward_from_yaw(30.0)).norm() < 1e-5);
    }

    #[test]
    fn delta_angle_takes_short_way() {
        assert!((delta_angle(350.0, 10.0) - 20.0).abs() < 1e-4);
        assert!((delta_angle(10.0, 350.0) + 20.0).abs() < 1e-4);
        assert!((delta_angle(0.0, 180.0) - 180.0).abs() < 1e-4);
    }

    #[test]
    fn input_is_clamped() {
        let i = InputFrame::new(-3.0, 2.0, f32::NAN);
        assert_eq!(i, InputFrame { steer: -1.0, throttle: 1.0, brake: 0.0 });
    }
}
