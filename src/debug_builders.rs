// ==============================================================================
// debug_builders.rs - TELEMETRY SNAPSHOTS (SERVER -> DEBUG OVERLAY)
// ------------------------------------------------------------------------------
// Plain, serializable copies of controller state:
// - DriftSnapshot: one vehicle (speed, yaw rate, drive state, camera rig, pose)
// - TelemetryFrame: every vehicle for one server tick
//
// This file is read-only scaffolding and must not have simulation side
// effects.
// ==============================================================================

use nalgebra::Point3;
use serde::Serialize;

use crate::drift_core::{DriveStateKind, InputFrame, Quat};
use crate::vehicle::DriftController;

#[inline] fn p3(p: &Point3<f32>) -> [f32; 3] { [p.x, p.y, p.z] }
#[inline] fn q4(q: &Quat) -> [f32; 4] { [q.i, q.j, q.k, q.w] }

#[derive(Debug, Clone, Serialize)]
pub struct DebugCamera {
    pub yaw_offset: f32,         // deg
    pub target_yaw: f32,         // deg
    pub target_position: [f32; 3],
}

#[derive(Debug, Clone, Serialize)]
pub struct DriftSnapshot {
    pub id: String,
    pub tick: u64,

    pub position: [f32; 3],
    pub rotation: [f32; 4], // quaternion (x, y, z, w)

    pub speed: f32,
    pub yaw_rate: f32,                // deg/s
    pub target_steering_angle: f32,   // deg/s
    pub drive_state: DriveStateKind,
    pub time_in_state: f32,           // s
    pub grounded: bool,

    pub camera: DebugCamera,
    pub input: InputFrame,
}

#[derive(Debug, Clone, Serialize)]
pub struct TelemetryFrame {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub tick: u64,
    pub vehicles: Vec<DriftSnapshot>,
}

impl TelemetryFrame {
    pub fn new(tick: u64, vehicles: Vec<DriftSnapshot>) -> Self {
        Self { kind: "telemetry", tick, vehicles }
    }
}

pub fn build_snapshot(id: &str, controller: &DriftController) -> DriftSnapshot {
    let state = controller.state();
    let camera = controller.camera();

    DriftSnapshot {
        id: id.to_string(),
        tick: controller.ticks(),
        position: p3(&state.position),
        rotation: q4(&state.orientation),
        speed: state.speed,
        yaw_rate: state.yaw_rate,
        target_steering_angle: controller.target_steering_angle(),
        drive_state: controller.drive_state(),
        time_in_state: controller.time_in_state(),
        grounded: controller.grounded(),
        camera: DebugCamera {
            yaw_offset: camera.yaw_offset(),
            target_yaw: camera.target_yaw(),
            target_position: p3(&camera.target_position()),
        },
        input: controller.last_input(),
    }
}
