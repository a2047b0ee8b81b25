// ==============================================================================
// alignment.rs - GROUND ALIGNMENT (RATE-LIMITED UP-VECTOR CORRECTION)
// ==============================================================================
// target = from_to(current_up, ground_normal) * rotation
// rotation steps toward target by at most `max_degrees` per call; no contact
// leaves the rotation untouched.
// ==============================================================================

use crate::drift_core::types::{GroundProbeResult, Quat, Vec3};

/// Degrees per second of alignment for a given smoothing-time constant.
pub const ALIGN_RATE_SCALE: f32 = 100.0;

/// Rotates `from` toward `to` by at most `max_degrees`.
pub fn rotate_towards(from: &Quat, to: &Quat, max_degrees: f32) -> Quat {
    let angle = from.angle_to(to).to_degrees();
    if angle <= f32::EPSILON || angle <= max_degrees {
        return *to;
    }
    let t = (max_degrees / angle).clamp(0.0, 1.0);
    from.try_slerp(to, t, 1e-6).unwrap_or(*to)
}

/// Target attitude whose up axis matches `normal`, keeping heading.
pub fn ground_target(rotation: &Quat, normal: &Vec3) -> Quat {
    let up = rotation * Vec3::y();
    match Quat::rotation_between(&up, normal) {
        Some(delta) => delta * rotation,
        None => *rotation,
    }
}

pub fn align_to_ground(rotation: &Quat, probe: &GroundProbeResult, smooth_time: f32, dt: f32) -> Quat {
    if !probe.grounded {
        return *rotation;
    }
    let target = ground_target(rotation, &probe.surface_normal);
    rotate_towards(rotation, &target, smooth_time * ALIGN_RATE_SCALE * dt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drift_core::types::{yaw_of, yaw_rotation};

    fn slope(deg: f32) -> Vec3 {
        // normal of a plane tilted about +X
        let r = deg.to_radians();
        Vec3::new(0.0, r.cos(), -r.sin())
    }

    #[test]
    fn airborne_keeps_rotation() {
        let rot = yaw_rotation(30.0);
        let out = align_to_ground(&rot, &GroundProbeResult::miss(), 0.2, 1.0);
        assert_eq!(out, rot);
    }

    #[test]
    fn alignment_is_rate_limited() {
        let rot = Quat::identity();
        let probe = GroundProbeResult::hit(slope(30.0), 1.0);
        // 0.2 * 100 * 0.1 = 2 degrees this tick
        let out = align_to_ground(&rot, &probe, 0.2, 0.1);
        assert!((rot.angle_to(&out).to_degrees() - 2.0).abs() < 1e-2);
    }

    #[test]
    fn alignment_reaches_normal_and_keeps_heading() {
        let mut rot = yaw_rotation(40.0);
        let probe = GroundProbeResult::hit(slope(20.0), 1.0);
        for _ in 0..120 {
            rot = align_to_ground(&rot, &probe, 0.2, 1.0 / 60.0);
        }
        let up = rot * Vec3::y();
        assert!((up - probe.surface_normal).norm() < 1e-3);
        assert!((yaw_of(&rot) - 40.0).abs() < 5.0);
    }

    #[test]
    fn rotate_towards_snaps_when_close() {
        let a = Quat::identity();
        let b = yaw_rotation(1.0);
        assert_eq!(rotate_towards(&a, &b, 5.0), b);
    }
}
