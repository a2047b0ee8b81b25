// ==============================================================================
// tuning.rs - IMMUTABLE VEHICLE TUNING (SPEED + PER-STATE YAW / CAMERA DATA)
// ==============================================================================
// Two layers:
// - VehicleTuning: speed limits, accel/decel rates, drift hysteresis ratios,
//   neutralize speeds, plus one StateParameters block per drive state.
// - StateParameters: yaw-rate limits and camera window for one drive state.
//
// Loaded once (Default or JSON) and validated before the first tick; the
// simulation only ever reads it.
//
// Units: speeds in units/s, yaw rates in degrees/s, camera angles in degrees,
// smoothing times in seconds.
// ==============================================================================

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::drift_core::drive_state::DriveStateKind;
use crate::error::TuningError;

// ============================================
// Steering response curve
// ============================================

/// Piecewise-linear curve over [0, 1] -> [0, 1], keys sorted by input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResponseCurve {
    keys: Vec<[f32; 2]>,
}

impl Default for ResponseCurve {
    fn default() -> Self {
        Self::linear()
    }
}

impl ResponseCurve {
    pub fn linear() -> Self {
        Self { keys: vec![[0.0, 0.0], [1.0, 1.0]] }
    }

    pub fn from_keys(keys: Vec<[f32; 2]>) -> Result<Self, TuningError> {
        let curve = Self { keys };
        curve.validate()?;
        Ok(curve)
    }

    pub fn keys(&self) -> &[[f32; 2]] {
        &self.keys
    }

    pub fn validate(&self) -> Result<(), TuningError> {
        if self.keys.is_empty() {
            return Err(TuningError::EmptyCurve);
        }
        for k in &self.keys {
            if !k[0].is_finite() || !k[1].is_finite() {
                return Err(TuningError::NonFinite("steering_response_curve"));
            }
        }
        if self.keys.windows(2).any(|w| w[1][0] < w[0][0]) {
            return Err(TuningError::UnsortedCurve);
        }
        Ok(())
    }

    /// Evaluates at `x` (clamped to [0, 1]); output clamped to [0, 1].
    pub fn evaluate(&self, x: f32) -> f32 {
        let x = x.clamp(0.0, 1.0);
        let Some(first) = self.keys.first() else { return x };
        let last = self.keys[self.keys.len() - 1];

        if x <= first[0] {
            return first[1].clamp(0.0, 1.0);
        }
        if x >= last[0] {
            return last[1].clamp(0.0, 1.0);
        }

        for w in self.keys.windows(2) {
            let (a, b) = (w[0], w[1]);
            if x >= a[0] && x <= b[0] {
                let span = b[0] - a[0];
                let t = if span > 1e-6 { (x - a[0]) / span } else { 1.0 };
                return (a[1] + (b[1] - a[1]) * t).clamp(0.0, 1.0);
            }
        }
        last[1].clamp(0.0, 1.0)
    }
}

// ============================================
// Per-state parameters
// ============================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateParameters {
    pub max_yaw_rate: f32,           // deg/s
    pub yaw_accel: f32,              // deg/s²
    pub yaw_decel: f32,              // deg/s²
    pub opposite_dir_multiplier: f32,
    pub steering_response_curve: ResponseCurve,

    // --- Camera ---
    pub camera_max_offset_angle: f32, // deg
    pub min_eval_angle: f32,          // deg/s of yaw rate
    pub max_eval_angle: f32,          // deg/s of yaw rate
    pub camera_smooth_time: f32,      // s
}

impl Default for StateParameters {
    fn default() -> Self {
        Self::grip()
    }
}

impl StateParameters {
    pub fn grip() -> Self {
        Self {
            max_yaw_rate: 100.0,
            yaw_accel: 50.0,
            yaw_decel: 70.0,
            opposite_dir_multiplier: 2.5,
            steering_response_curve: ResponseCurve::linear(),
            camera_max_offset_angle: 10.0,
            min_eval_angle: 0.0,
            max_eval_angle: 100.0,
            camera_smooth_time: 0.3,
        }
    }

    pub fn drift() -> Self {
        Self {
            max_yaw_rate: 140.0,
            yaw_accel: 80.0,
            yaw_decel: 60.0,
            opposite_dir_multiplier: 3.0,
            steering_response_curve: ResponseCurve::linear(),
            camera_max_offset_angle: 25.0,
            min_eval_angle: 20.0,
            max_eval_angle: 140.0,
            camera_smooth_time: 0.5,
        }
    }

    fn validate(&self, state: DriveStateKind) -> Result<(), TuningError> {
        let fields = [
            ("max_yaw_rate", self.max_yaw_rate),
            ("yaw_accel", self.yaw_accel),
            ("yaw_decel", self.yaw_decel),
            ("opposite_dir_multiplier", self.opposite_dir_multiplier),
            ("camera_max_offset_angle", self.camera_max_offset_angle),
            ("min_eval_angle", self.min_eval_angle),
            ("max_eval_angle", self.max_eval_angle),
            ("camera_smooth_time", self.camera_smooth_time),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(TuningError::NonFinite(name));
            }
            if value < 0.0 {
                return Err(TuningError::Negative { state: Some(state), field: name, value });
            }
        }
        self.steering_response_curve.validate()?;

        if (self.max_eval_angle - self.min_eval_angle).abs() <= f32::EPSILON {
            warn!(?state, "camera evaluation window is empty; camera offset will stay at zero");
        }
        Ok(())
    }
}

// ============================================
// Vehicle tuning
// ============================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleTuning {
    pub max_speed: f32,          // units/s
    pub acceleration: f32,       // units/s²
    pub deceleration: f32,       // units/s² (coasting)
    pub brake_deceleration: f32, // units/s²

    pub enter_drift_threshold_ratio: f32,
    pub exit_drift_threshold_ratio: f32,

    pub camera_neutralize_speed: f32,  // 1/s blend rate
    pub heading_neutralize_speed: f32, // 1/s blend rate

    pub grip: StateParameters,
    pub drift: StateParameters,
}

impl Default for VehicleTuning {
    fn default() -> Self {
        Self {
            max_speed: 20.0,
            acceleration: 5.0,
            deceleration: 10.0,
            brake_deceleration: 15.0,
            enter_drift_threshold_ratio: 0.8,
            exit_drift_threshold_ratio: 0.5,
            camera_neutralize_speed: 1.0,
            heading_neutralize_speed: 1.0,
            grip: StateParameters::grip(),
            drift: StateParameters::drift(),
        }
    }
}

impl VehicleTuning {
    /// Parameter block for a drive state. Total over [`DriveStateKind`].
    pub fn params(&self, kind: DriveStateKind) -> &StateParameters {
        match kind {
            DriveStateKind::Grip => &self.grip,
            DriveStateKind::Drift => &self.drift,
        }
    }

    pub fn from_json(text: &str) -> Result<Self, TuningError> {
        let tuning: Self = serde_json::from_str(text)?;
        tuning.validate()?;
        Ok(tuning)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, TuningError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| TuningError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Rejects values the models cannot run with. A missing hysteresis band
    /// is reported but allowed.
    pub fn validate(&self) -> Result<(), TuningError> {
        let fields = [
            ("max_speed", self.max_speed),
            ("acceleration", self.acceleration),
            ("deceleration", self.deceleration),
            ("brake_deceleration", self.brake_deceleration),
            ("enter_drift_threshold_ratio", self.enter_drift_threshold_ratio),
            ("exit_drift_threshold_ratio", self.exit_drift_threshold_ratio),
            ("camera_neutralize_speed", self.camera_neutralize_speed),
            ("heading_neutralize_speed", self.heading_neutralize_speed),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(TuningError::NonFinite(name));
            }
            if value < 0.0 {
                return Err(TuningError::Negative { state: None, field: name, value });
            }
        }

        self.grip.validate(DriveStateKind::Grip)?;
        self.drift.validate(DriveStateKind::Drift)?;

        let enter = self.grip.max_yaw_rate * self.enter_drift_threshold_ratio;
        let exit = self.drift.max_yaw_rate * self.exit_drift_threshold_ratio;
        if self.enter_drift_threshold_ratio <= self.exit_drift_threshold_ratio || enter <= exit {
            warn!(
                enter_ratio = self.enter_drift_threshold_ratio,
                exit_ratio = self.exit_drift_threshold_ratio,
                enter_threshold = enter,
                exit_threshold = exit,
                "drift hysteresis band is missing; grip/drift may toggle rapidly"
            );
        }
        Ok(())
    }
}
