use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error};
use uuid::Uuid;

use crate::debug_builders::{TelemetryFrame, build_snapshot};
use crate::drift_core::{GroundProbe, InputFrame, VehicleTuning};
use crate::error::ControllerError;
use crate::spawn::SpawnManager;
use crate::vehicle::DriftController;

/// One connected driver: their controller plus the latest input they sent.
pub struct Session {
    pub id: String,
    pub slot: usize,
    pub controller: DriftController,
    pub input: InputFrame,
    pub reset_held: bool,
    reset_pulse: bool,
}

impl Session {
    /// Reset level seen by the controller this tick. A one-shot reset request
    /// shows up as a single high tick followed by a low one.
    fn reset_level(&mut self) -> bool {
        let pulse = std::mem::take(&mut self.reset_pulse);
        self.reset_held || pulse
    }
}

pub struct SharedSimState<P> {
    pub tick: u64,
    pub clients: Vec<UnboundedSender<String>>,
    pub sessions: HashMap<String, Session>,
    tuning: Arc<VehicleTuning>,
    ground: Arc<P>,
    spawns: SpawnManager,
}

impl<P> SharedSimState<P>
where
    P: GroundProbe + Send + Sync + 'static,
{
    pub fn new(tuning: Arc<VehicleTuning>, ground: Arc<P>) -> Self {
        Self {
            tick: 0,
            clients: Vec::new(),
            sessions: HashMap::new(),
            tuning,
            ground,
            spawns: SpawnManager::default(),
        }
    }

    pub fn register_client(&mut self, tx: UnboundedSender<String>) {
        self.clients.push(tx);
    }

    /// Spawns a vehicle for a new connection and returns its id.
    pub fn add_session(&mut self) -> Result<String, ControllerError> {
        let id = Uuid::new_v4().to_string();
        let spawn = self.spawns.allocate_spawn(id.clone());

        let controller = match DriftController::builder(Arc::clone(&self.tuning))
            .ground_probe(Arc::clone(&self.ground))
            .origin(spawn.position, spawn.orientation)
            .build()
        {
            Ok(c) => c,
            Err(e) => {
                self.spawns.release(spawn.slot);
                return Err(e);
            }
        };

        debug!(vehicle = %id, slot = spawn.slot, "session added");
        self.sessions.insert(
            id.clone(),
            Session {
                id: id.clone(),
                slot: spawn.slot,
                controller,
                input: InputFrame::default(),
                reset_held: false,
                reset_pulse: false,
            },
        );
        Ok(id)
    }

    pub fn remove_session(&mut self, id: &str) -> bool {
        match self.sessions.remove(id) {
            Some(session) => {
                self.spawns.release(session.slot);
                debug!(vehicle = %id, "session removed");
                true
            }
            None => false,
        }
    }

    pub fn update_input(&mut self, id: &str, input: InputFrame, reset: bool) {
        if let Some(session) = self.sessions.get_mut(id) {
            session.input = input.clamped();
            session.reset_held = reset;
        }
    }

    pub fn request_reset(&mut self, id: &str) {
        if let Some(session) = self.sessions.get_mut(id) {
            session.reset_pulse = true;
        }
    }

    /// Advances every vehicle by `dt` seconds and bumps the server tick.
    pub fn tick_all(&mut self, dt: f32) {
        for session in self.sessions.values_mut() {
            let reset = session.reset_level();
            session.controller.tick(session.input, reset, dt);
        }
        self.tick += 1;
    }

    pub fn frame(&self) -> TelemetryFrame {
        let mut vehicles: Vec<_> = self
            .sessions
            .values()
            .map(|s| build_snapshot(&s.id, &s.controller))
            .collect();
        vehicles.sort_by(|a, b| a.id.cmp(&b.id));
        TelemetryFrame::new(self.tick, vehicles)
    }

    /// Build and send a telemetry frame of all vehicles to all clients.
    pub fn broadcast_snapshot(&mut self) {
        let json = match serde_json::to_string(&self.frame()) {
            Ok(json) => json,
            Err(e) => {
                error!(error = %e, "failed to encode telemetry frame");
                return;
            }
        };

        self.clients.retain(|tx| tx.send(json.clone()).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::GroundWorld;
    use tokio::sync::mpsc;

    fn sim() -> SharedSimState<GroundWorld> {
        SharedSimState::new(Arc::new(VehicleTuning::default()), Arc::new(GroundWorld::flat()))
    }

    #[test]
    fn sessions_are_added_and_removed() {
        let mut sim = sim();
        let a = sim.add_session().unwrap();
        let b = sim.add_session().unwrap();
        assert_ne!(a, b);
        assert_eq!(sim.sessions.len(), 2);
        assert!(sim.remove_session(&a));
        assert!(!sim.remove_session(&a));
        assert_eq!(sim.sessions.len(), 1);
    }

    #[test]
    fn input_is_clamped_and_drives_vehicle() {
        let mut sim = sim();
        let id = sim.add_session().unwrap();
        sim.update_input(&id, InputFrame::new(0.0, 3.0, 0.0), false);
        assert_eq!(sim.sessions[&id].input.throttle, 1.0);

        for _ in 0..30 {
            sim.tick_all(1.0 / 60.0);
        }
        assert_eq!(sim.tick, 30);
        assert!(sim.sessions[&id].controller.state().speed > 0.0);
    }

    #[test]
    fn reset_request_fires_once() {
        let mut sim = sim();
        let id = sim.add_session().unwrap();
        sim.update_input(&id, InputFrame::new(0.0, 1.0, 0.0), false);
        for _ in 0..30 {
            sim.tick_all(1.0 / 60.0);
        }

        sim.request_reset(&id);
        sim.tick_all(1.0 / 60.0);
        assert_eq!(sim.sessions[&id].controller.state().speed, 0.0);

        sim.tick_all(1.0 / 60.0);
        assert!(sim.sessions[&id].controller.state().speed > 0.0);
    }

    #[test]
    fn broadcast_drops_closed_clients() {
        let mut sim = sim();
        sim.add_session().unwrap();

        let (tx_open, mut rx_open) = mpsc::unbounded_channel();
        let (tx_closed, rx_closed) = mpsc::unbounded_channel();
        sim.register_client(tx_open);
        sim.register_client(tx_closed);
        drop(rx_closed);

        sim.tick_all(1.0 / 60.0);
        sim.broadcast_snapshot();

        assert_eq!(sim.clients.len(), 1);
        let msg = rx_open.try_recv().unwrap();
        let json: serde_json::Value = serde_json::from_str(&msg).unwrap();
        assert_eq!(json["type"], "telemetry");
        assert_eq!(json["tick"], 1);
        assert_eq!(json["vehicles"].as_array().unwrap().len(), 1);
    }
}
