// ==============================================================================
// smoothing.rs - CRITICALLY DAMPED SMOOTHING (STATEFUL)
// ==============================================================================
// Spring-damper follower with damping ratio 1 and a characteristic time
// `smooth_time`. The closed form uses omega = 2 / smooth_time and a cubic
// approximation of exp(-omega * dt); the velocity term is carried across
// calls so the motion stays continuous when the target moves.
//
// A final clamp prevents stepping past the target within one call.
// ==============================================================================

use crate::drift_core::types::{delta_angle, wrap_degrees};

const MIN_SMOOTH_TIME: f32 = 1e-4;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SmoothDamp {
    value: f32,
    velocity: f32,
}

impl SmoothDamp {
    pub fn new(value: f32) -> Self {
        Self { value, velocity: 0.0 }
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    /// Overrides the value, keeping the velocity.
    pub fn set_value(&mut self, value: f32) {
        self.value = value;
    }

    pub fn reset(&mut self, value: f32) {
        self.value = value;
        self.velocity = 0.0;
    }

    pub fn update(&mut self, target: f32, smooth_time: f32, dt: f32) -> f32 {
        if dt <= 0.0 {
            return self.value;
        }
        let (value, velocity) = smooth_damp(self.value, target, self.velocity, smooth_time, dt);
        self.value = value;
        self.velocity = velocity;
        value
    }
}

/// Angular variant in degrees; always travels the short way round.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SmoothDampAngle {
    inner: SmoothDamp,
}

impl SmoothDampAngle {
    pub fn new(degrees: f32) -> Self {
        Self { inner: SmoothDamp::new(degrees) }
    }

    pub fn value(&self) -> f32 {
        self.inner.value
    }

    pub fn reset(&mut self, degrees: f32) {
        self.inner.reset(wrap_degrees(degrees));
    }

    /// Steps toward `target` and returns the new angle in [0, 360).
    pub fn update(&mut self, target: f32, smooth_time: f32, dt: f32) -> f32 {
        let current = self.inner.value;
        let unwrapped = current + delta_angle(current, target);
        let stepped = self.inner.update(unwrapped, smooth_time, dt);
        self.inner.value = wrap_degrees(stepped);
        self.inner.value
    }
}

fn smooth_damp(current: f32, target: f32, velocity: f32, smooth_time: f32, dt: f32) -> (f32, f32) {
    let smooth_time = smooth_time.max(MIN_SMOOTH_TIME);
    let omega = 2.0 / smooth_time;
    let x = omega * dt;
    let decay = 1.0 / (1.0 + x + 0.48 * x * x + 0.235 * x * x * x);

    let change = current - target;
    let temp = (velocity + omega * change) * dt;
    let mut next_velocity = (velocity - omega * temp) * decay;
    let mut output = target + (change + temp) * decay;

    // do not overshoot
    if (target - current > 0.0) == (output > target) {
        output = target;
        next_velocity = (output - target) / dt;
    }

    (output, next_velocity)
}
