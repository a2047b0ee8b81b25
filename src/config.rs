use std::{env, path::PathBuf, time::Duration};

use crate::drift_core::VehicleTuning;
use crate::error::{ServerError, TuningError};

// Runtime/server settings (not vehicle tuning).

pub const DEFAULT_ADDR: &str = "0.0.0.0:9001";
pub const DEFAULT_TICK_HZ: u32 = 60;

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub addr: String,
    pub tick_hz: u32,
    pub tuning_path: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            tick_hz: DEFAULT_TICK_HZ,
            tuning_path: None,
        }
    }
}

impl ServerConfig {
    /// Reads DRIFT_SERVER_ADDR, DRIFT_TICK_HZ and DRIFT_TUNING_PATH.
    pub fn from_env() -> Result<Self, ServerError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ServerError> {
        let mut config = Self::default();

        if let Some(addr) = lookup("DRIFT_SERVER_ADDR").filter(|v| !v.trim().is_empty()) {
            config.addr = addr.trim().to_string();
        }

        if let Some(raw) = lookup("DRIFT_TICK_HZ") {
            config.tick_hz = match raw.trim().parse::<u32>() {
                Ok(hz) if hz > 0 => hz,
                _ => return Err(ServerError::InvalidSetting { name: "DRIFT_TICK_HZ", value: raw }),
            };
        }

        config.tuning_path = lookup("DRIFT_TUNING_PATH")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        Ok(config)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.tick_hz))
    }

    /// Fixed simulation step in seconds.
    pub fn dt(&self) -> f32 {
        1.0 / self.tick_hz as f32
    }

    /// Tuning from DRIFT_TUNING_PATH, or the built-in defaults.
    pub fn load_tuning(&self) -> Result<VehicleTuning, TuningError> {
        match &self.tuning_path {
            Some(path) => VehicleTuning::load(path),
            None => {
                let tuning = VehicleTuning::default();
                tuning.validate()?;
                Ok(tuning)
            }
        }
    }
}
