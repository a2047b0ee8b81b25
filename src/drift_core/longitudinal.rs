// ==============================================================================
// longitudinal.rs - ARCADE SPEED MODEL (THROTTLE / COAST / BRAKE)
// ==============================================================================
// - throttle > 0: speed += acceleration * throttle * dt
// - otherwise:    speed -= deceleration * dt (coasting)
// - brake > 0:    speed -= brake_deceleration * brake * dt (in addition)
// - result clamped to [0, max_speed]; no reverse gear
// ==============================================================================

use crate::drift_core::tuning::VehicleTuning;

pub fn update_speed(speed: f32, throttle: f32, brake: f32, tuning: &VehicleTuning, dt: f32) -> f32 {
    let mut next = speed;

    if throttle > 0.0 {
        next += tuning.acceleration * throttle * dt;
    } else {
        next -= tuning.deceleration * dt;
    }

    if brake > 0.0 {
        next -= tuning.brake_deceleration * brake * dt;
    }

    next.clamp(0.0, tuning.max_speed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_throttle_ramps_then_clamps() {
        let t = VehicleTuning::default(); // accel 5, decel 10, max 20
        let mut speed = 0.0;
        let mut seen = Vec::new();
        for _ in 0..5 {
            speed = update_speed(speed, 1.0, 0.0, &t, 1.0);
            seen.push(speed);
        }
        assert_eq!(seen, vec![5.0, 10.0, 15.0, 20.0, 20.0]);
    }

    #[test]
    fn monotonic_under_throttle_for_small_dt() {
        let t = VehicleTuning::default();
        let mut speed = 0.0;
        for _ in 0..2000 {
            let next = update_speed(speed, 1.0, 0.0, &t, 1.0 / 60.0);
            assert!(next >= speed);
            assert!(next <= t.max_speed);
            speed = next;
        }
        assert_eq!(speed, t.max_speed);
    }

    #[test]
    fn coasting_and_braking_never_go_negative() {
        let t = VehicleTuning::default();
        assert_eq!(update_speed(12.0, 0.0, 0.0, &t, 0.5), 7.0);
        assert_eq!(update_speed(12.0, 0.0, 1.0, &t, 0.5), 0.0);
        assert_eq!(update_speed(0.0, 0.0, 1.0, &t, 1.0), 0.0);
    }

    #[test]
    fn braking_while_on_throttle_stacks() {
        let t = VehicleTuning::default();
        // +5*1*1 then -15*0.5*1
        assert!((update_speed(10.0, 1.0, 0.5, &t, 1.0) - 7.5).abs() < 1e-6);
    }
}
