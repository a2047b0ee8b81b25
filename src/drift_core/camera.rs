// ==============================================================================
// camera.rs - DRIFT CAMERA OFFSET MODEL (FOLLOW-TARGET RIG)
// ==============================================================================
// Per tick:
// 1) window:  yaw rate inside [min_eval, max_eval] (or its mirror) -> w in [-1, 1]
// 2) target:  lerp(-max_offset, +max_offset, (w + 1) / 2)
// 3) offset:  critically damped toward target; |offset| < epsilon snaps to 0
// 4) rig yaw: critically damped (angular) toward vehicle yaw + offset
// 5) rig pos: vehicle pos + rot_y(offset) * vehicle forward * follow distance
//
// The rig is what a trailing camera looks at; it never feeds back into the
// yaw-rate model. The only feedback into the vehicle is neutralize_heading()
// (Grip) and the camera-relative movement direction, both in vehicle.rs.
// ==============================================================================

use nalgebra::Point3;
use tracing::warn;

use crate::drift_core::smoothing::{SmoothDamp, SmoothDampAngle};
use crate::drift_core::tuning::StateParameters;
use crate::drift_core::types::{Quat, Vec3, delta_angle, lerp, yaw_of, yaw_rotation};

/// Where `value` sits between `min` and `max`, clamped to [0, 1].
/// Equal bounds are reported and yield 0.
pub fn percentage_between(value: f32, min: f32, max: f32) -> f32 {
    if (max - min).abs() <= f32::EPSILON {
        warn!(min, max, "percentage_between called with equal bounds");
        return 0.0;
    }
    ((value - min) / (max - min)).clamp(0.0, 1.0)
}

/// Signed position of `yaw_rate` in the state's evaluation window; 0 outside.
pub fn evaluation_window(yaw_rate: f32, params: &StateParameters) -> f32 {
    let (min, max) = (params.min_eval_angle, params.max_eval_angle);
    if yaw_rate > min && yaw_rate <= max {
        percentage_between(yaw_rate, min, max)
    } else if yaw_rate < -min && yaw_rate >= -max {
        -percentage_between(yaw_rate, -min, -max)
    } else {
        0.0
    }
}

/// Yaw offset (degrees) the camera should settle at for this yaw rate.
pub fn target_yaw_offset(yaw_rate: f32, params: &StateParameters) -> f32 {
    let normalized = (evaluation_window(yaw_rate, params) + 1.0) * 0.5;
    lerp(-params.camera_max_offset_angle, params.camera_max_offset_angle, normalized)
}

#[derive(Debug, Clone)]
pub struct CameraRig {
    target_position: Point3<f32>,
    offset: SmoothDamp,
    yaw: SmoothDampAngle,
}

impl CameraRig {
    /// Rig starting straight ahead of the vehicle at `follow_distance`, zero offset.
    pub fn new(position: &Point3<f32>, rotation: &Quat, follow_distance: f32) -> Self {
        let mut rig = Self {
            target_position: *position,
            offset: SmoothDamp::default(),
            yaw: SmoothDampAngle::default(),
        };
        rig.reset(position, rotation, follow_distance);
        rig
    }

    pub fn reset(&mut self, position: &Point3<f32>, rotation: &Quat, follow_distance: f32) {
        self.offset.reset(0.0);
        self.yaw.reset(yaw_of(rotation));
        self.target_position = position + (rotation * Vec3::z()) * follow_distance;
    }

    pub fn yaw_offset(&self) -> f32 {
        self.offset.value()
    }

    pub fn target_yaw(&self) -> f32 {
        self.yaw.value()
    }

    pub fn target_position(&self) -> Point3<f32> {
        self.target_position
    }

    #[allow(clippy::too_many_arguments)]
    pub fn update(
        &mut self,
        yaw_rate: f32,
        params: &StateParameters,
        position: &Point3<f32>,
        rotation: &Quat,
        follow_distance: f32,
        epsilon: f32,
        dt: f32,
    ) {
        let target = target_yaw_offset(yaw_rate, params);
        let offset = self.offset.update(target, params.camera_smooth_time, dt);
        if offset.abs() < epsilon {
            self.offset.set_value(0.0);
        }
        let offset = self.offset.value();

        self.yaw.update(yaw_of(rotation) + offset, params.camera_smooth_time, dt);

        let forward = rotation * Vec3::z();
        self.target_position = position + (yaw_rotation(offset) * forward) * follow_distance;
    }
}

/// Turns `rotation` about world up toward the flat direction from `position`
/// to `target`, covering `rate * dt` (clamped to 1) of the remaining angle.
pub fn neutralize_heading(rotation: &Quat, position: &Point3<f32>, target: &Point3<f32>, rate: f32, dt: f32) -> Quat {
    let to_target = target - position;
    if to_target.x.abs() < 1e-6 && to_target.z.abs() < 1e-6 {
        return *rotation;
    }
    let target_yaw = to_target.x.atan2(to_target.z).to_degrees();
    let t = (rate * dt).clamp(0.0, 1.0);
    let step = delta_angle(yaw_of(rotation), target_yaw) * t;
    yaw_rotation(step) * rotation
}
