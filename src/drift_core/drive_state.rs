use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::drift_core::state_machine::{State, StateKey};
use crate::drift_core::tuning::VehicleTuning;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriveStateKind {
    Grip,
    Drift,
}

impl DriveStateKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DriveStateKind::Grip => "grip",
            DriveStateKind::Drift => "drift",
        }
    }
}

impl fmt::Display for DriveStateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl StateKey for DriveStateKind {
    const COUNT: usize = 2;

    fn index(self) -> usize {
        match self {
            DriveStateKind::Grip => 0,
            DriveStateKind::Drift => 1,
        }
    }
}

/// Hysteresis on |yaw rate|:
/// - Grip -> Drift above max_yaw_rate(Grip) * enter ratio
/// - Drift -> Grip below max_yaw_rate(Drift) * exit ratio
/// - anything in between keeps the current state
pub fn next_drive_state(current: DriveStateKind, yaw_rate: f32, tuning: &VehicleTuning) -> DriveStateKind {
    let magnitude = yaw_rate.abs();
    match current {
        DriveStateKind::Grip => {
            if magnitude > tuning.grip.max_yaw_rate * tuning.enter_drift_threshold_ratio {
                DriveStateKind::Drift
            } else {
                DriveStateKind::Grip
            }
        }
        DriveStateKind::Drift => {
            if magnitude < tuning.drift.max_yaw_rate * tuning.exit_drift_threshold_ratio {
                DriveStateKind::Grip
            } else {
                DriveStateKind::Drift
            }
        }
    }
}

// ============================================
// Concrete states (identity + time in state)
// ============================================

#[derive(Debug, Default, Clone)]
pub struct GripState {
    elapsed: f32,
}

#[derive(Debug, Default, Clone)]
pub struct DriftState {
    elapsed: f32,
}

#[derive(Debug, Clone)]
pub enum DriveState {
    Grip(GripState),
    Drift(DriftState),
}

impl DriveState {
    pub fn grip() -> Self {
        DriveState::Grip(GripState::default())
    }

    pub fn drift() -> Self {
        DriveState::Drift(DriftState::default())
    }

    /// Seconds since this state was last entered.
    pub fn time_in_state(&self) -> f32 {
        match self {
            DriveState::Grip(s) => s.elapsed,
            DriveState::Drift(s) => s.elapsed,
        }
    }

    fn elapsed_mut(&mut self) -> &mut f32 {
        match self {
            DriveState::Grip(s) => &mut s.elapsed,
            DriveState::Drift(s) => &mut s.elapsed,
        }
    }
}

impl State for DriveState {
    type Key = DriveStateKind;

    fn key(&self) -> DriveStateKind {
        match self {
            DriveState::Grip(_) => DriveStateKind::Grip,
            DriveState::Drift(_) => DriveStateKind::Drift,
        }
    }

    fn on_enter(&mut self) {
        *self.elapsed_mut() = 0.0;
        debug!(state = %self.key(), "drive state entered");
    }

    fn on_update(&mut self, dt: f32) {
        *self.elapsed_mut() += dt;
    }

    fn on_exit(&mut self) {
        debug!(state = %self.key(), held_for = self.time_in_state(), "drive state exited");
    }
}
