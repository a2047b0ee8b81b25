//! drift_core - engine-agnostic drift controller helpers (pure types + models)

pub mod types;
pub mod tuning;
pub mod state_machine;
pub mod drive_state;
pub mod longitudinal;
pub mod steering;
pub mod smoothing;
pub mod camera;
pub mod alignment;

pub use types::*;
pub use tuning::{ResponseCurve, StateParameters, VehicleTuning};
pub use drive_state::{DriveState, DriveStateKind};
pub use state_machine::{State, StateKey, StateMachine};
