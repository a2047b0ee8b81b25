//! Arcade drift controller: grip/drift states, speed and yaw models, ground
//! alignment and a drift camera rig, plus a small headless websocket server
//! that runs one controller per connected driver.

pub mod config;
pub mod debug_builders;
pub mod drift_core;
pub mod error;
pub mod net;
pub mod physics;
pub mod spawn;
pub mod state;
pub mod vehicle;

pub use drift_core::{DriveStateKind, GroundProbe, GroundProbeResult, InputFrame, ProbeFn, VehicleTuning};
pub use error::{ControllerError, ServerError, StateMachineError, TuningError};
pub use vehicle::{ControllerConfig, DriftController, DriftControllerBuilder, VehicleState};
