// ==============================================================================
// steering.rs - YAW-RATE MODEL (ARCADE STEERING)
// ==============================================================================
// Steering input integrates into a signed yaw rate (deg/s):
//
//   steering (steer != 0, speed > MOVING_THRESHOLD):
//     yaw += sign(steer) * |steer| * k * yaw_accel * dt
//     k = opposite_dir_multiplier when steer opposes the current yaw rate
//         (snap back through zero), 1 otherwise
//
//   released / stationary:
//     |yaw| -= yaw_decel * dt, never crossing zero in one step
//
// Then clamp to ±max_yaw_rate of the active drive state.
// ==============================================================================

use crate::drift_core::tuning::StateParameters;
use crate::drift_core::types::MOVING_THRESHOLD;

pub fn update_yaw_rate(yaw_rate: f32, steer: f32, speed: f32, params: &StateParameters, dt: f32) -> f32 {
    if steer != 0.0 && speed > MOVING_THRESHOLD {
        let opposing = (steer > 0.0 && yaw_rate < 0.0) || (steer < 0.0 && yaw_rate > 0.0);
        let k = if opposing { params.opposite_dir_multiplier } else { 1.0 };
        yaw_rate + steer.signum() * steer.abs() * k * params.yaw_accel * dt
    } else {
        decay_toward_zero(yaw_rate, params.yaw_decel * dt)
    }
}

fn decay_toward_zero(value: f32, step: f32) -> f32 {
    if value > 0.0 {
        (value - step).max(0.0)
    } else if value < 0.0 {
        (value + step).min(0.0)
    } else {
        0.0
    }
}

pub fn clamp_yaw_rate(yaw_rate: f32, params: &StateParameters) -> f32 {
    yaw_rate.clamp(-params.max_yaw_rate, params.max_yaw_rate)
}

/// Yaw rate the driver is asking for, shaped by the response curve.
pub fn target_steering_angle(steer: f32, params: &StateParameters) -> f32 {
    if steer == 0.0 {
        return 0.0;
    }
    steer.signum() * params.steering_response_curve.evaluate(steer.abs()) * params.max_yaw_rate
}
