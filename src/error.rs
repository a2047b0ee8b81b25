use thiserror::Error;

use crate::drift_core::drive_state::DriveStateKind;

#[derive(Debug, Error)]
pub enum TuningError {
    #[error("tuning value `{0}` is not finite")]
    NonFinite(&'static str),

    #[error("tuning value `{field}` must not be negative (got {value}, state {state:?})")]
    Negative {
        state: Option<DriveStateKind>,
        field: &'static str,
        value: f32,
    },

    #[error("steering response curve has no keys")]
    EmptyCurve,

    #[error("steering response curve keys must be sorted by input")]
    UnsortedCurve,

    #[error("invalid tuning json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to read tuning file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateMachineError<K: std::fmt::Debug> {
    #[error("no state registered for {0:?}")]
    UnregisteredState(K),

    #[error("cannot deregister the active state {0:?}")]
    StateActive(K),
}

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("drift controller needs a ground probe")]
    MissingGroundProbe,

    #[error(transparent)]
    Tuning(#[from] TuningError),
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid server setting {name}={value}")]
    InvalidSetting { name: &'static str, value: String },

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Tuning(#[from] TuningError),
}
