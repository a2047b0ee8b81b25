// ==============================================================================
// vehicle.rs - DRIFT CONTROLLER (ONE VEHICLE, ONE CALL PER TICK)
// ==============================================================================
// Tick order:
//   input -> yaw rate (+clamp) -> grip/drift hysteresis -> speed
//   -> gravity (ground check) -> movement direction -> integrate position
//   -> snap to ground contact -> yaw rotate (moving only) -> ground alignment -> camera rig
//   -> heading neutralize (Grip, moving only) -> reset (rising edge)
//
// Everything the tick needs comes in as arguments (input, reset, dt) or was
// injected at build time (tuning, ground probe). No clocks, no globals.
// ==============================================================================

use std::sync::Arc;

use nalgebra::Point3;
use tracing::{debug, warn};

use crate::drift_core::alignment::align_to_ground;
use crate::drift_core::camera::{CameraRig, neutralize_heading};
use crate::drift_core::drive_state::next_drive_state;
use crate::drift_core::longitudinal::update_speed;
use crate::drift_core::steering::{clamp_yaw_rate, target_steering_angle, update_yaw_rate};
use crate::drift_core::{
    DriveState, DriveStateKind, GroundProbe, GroundProbeResult, InputFrame, MOVING_THRESHOLD, Quat, StateMachine, Vec3, VehicleTuning,
    forward_from_yaw, yaw_rotation,
};
use crate::error::ControllerError;

/// Controller geometry and constants that are not per-state tuning.
#[derive(Debug, Clone, Copy)]
pub struct ControllerConfig {
    pub gravity: f32,                  // units/s²
    pub align_probe_offset: f32,       // ray starts this far above the vehicle
    pub align_probe_distance: f32,     // max ray length for alignment
    pub ground_check_distance: f32,    // grounded test below the vehicle
    pub ground_check_skin: f32,        // added to ground_check_distance
    pub ground_align_smooth_time: f32, // alignment rate = smooth_time * 100 deg/s
    pub follow_distance: f32,          // camera target distance ahead of the vehicle
    pub camera_offset_epsilon: f32,    // deg, below this the offset snaps to 0
    pub ground_layer_mask: u32,
}

pub const DEFAULT_CONTROLLER: ControllerConfig = ControllerConfig {
    gravity: 9.8,
    align_probe_offset: 1.0,
    align_probe_distance: 2.0,
    ground_check_distance: 0.1,
    ground_check_skin: 0.1,
    ground_align_smooth_time: 0.2,
    follow_distance: 5.0,
    camera_offset_epsilon: 0.01,
    ground_layer_mask: crate::physics::GROUND_LAYER,
};

impl Default for ControllerConfig {
    fn default() -> Self {
        DEFAULT_CONTROLLER
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleState {
    pub position: Point3<f32>,
    pub orientation: Quat,
    pub speed: f32,             // >= 0
    pub yaw_rate: f32,          // deg/s, signed
    pub vertical_velocity: f32, // gravity accumulator
}

impl VehicleState {
    fn at(position: Point3<f32>, orientation: Quat) -> Self {
        Self { position, orientation, speed: 0.0, yaw_rate: 0.0, vertical_velocity: 0.0 }
    }
}

type SharedProbe = Box<dyn GroundProbe + Send + Sync>;

pub struct DriftControllerBuilder {
    tuning: Arc<VehicleTuning>,
    config: ControllerConfig,
    probe: Option<SharedProbe>,
    position: Point3<f32>,
    orientation: Quat,
}

impl DriftControllerBuilder {
    pub fn config(mut self, config: ControllerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn ground_probe(mut self, probe: impl GroundProbe + Send + Sync + 'static) -> Self {
        self.probe = Some(Box::new(probe));
        self
    }

    pub fn origin(mut self, position: Point3<f32>, orientation: Quat) -> Self {
        self.position = position;
        self.orientation = orientation;
        self
    }

    pub fn build(self) -> Result<DriftController, ControllerError> {
        self.tuning.validate()?;
        let probe = self.probe.ok_or(ControllerError::MissingGroundProbe)?;

        let mut machine = StateMachine::new();
        machine.register_state(DriveState::grip());
        machine.register_state(DriveState::drift());
        // both kinds were registered just above
        let _ = machine.set_state(DriveStateKind::Grip);

        Ok(DriftController {
            camera: CameraRig::new(&self.position, &self.orientation, self.config.follow_distance),
            state: VehicleState::at(self.position, self.orientation),
            origin: (self.position, self.orientation),
            tuning: self.tuning,
            config: self.config,
            probe,
            machine,
            grounded: false,
            reset_held: false,
            last_input: InputFrame::default(),
            target_steering_angle: 0.0,
            ticks: 0,
        })
    }
}

pub struct DriftController {
    tuning: Arc<VehicleTuning>,
    config: ControllerConfig,
    probe: SharedProbe,
    machine: StateMachine<DriveState>,
    state: VehicleState,
    camera: CameraRig,
    origin: (Point3<f32>, Quat),
    grounded: bool,
    reset_held: bool,
    last_input: InputFrame,
    target_steering_angle: f32,
    ticks: u64,
}

impl DriftController {
    pub fn builder(tuning: Arc<VehicleTuning>) -> DriftControllerBuilder {
        DriftControllerBuilder {
            tuning,
            config: DEFAULT_CONTROLLER,
            probe: None,
            position: Point3::origin(),
            orientation: Quat::identity(),
        }
    }

    // ---------------- read-only views ----------------

    pub fn state(&self) -> &VehicleState {
        &self.state
    }

    pub fn camera(&self) -> &CameraRig {
        &self.camera
    }

    pub fn tuning(&self) -> &VehicleTuning {
        &self.tuning
    }

    pub fn drive_state(&self) -> DriveStateKind {
        self.machine.current_state().unwrap_or(DriveStateKind::Grip)
    }

    pub fn previous_drive_state(&self) -> Option<DriveStateKind> {
        self.machine.previous_state()
    }

    pub fn time_in_state(&self) -> f32 {
        self.machine.current().map(|s| s.time_in_state()).unwrap_or(0.0)
    }

    pub fn grounded(&self) -> bool {
        self.grounded
    }

    pub fn last_input(&self) -> InputFrame {
        self.last_input
    }

    pub fn target_steering_angle(&self) -> f32 {
        self.target_steering_angle
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Makes the current pose the one restored by reset.
    pub fn record_origin(&mut self) {
        self.origin = (self.state.position, self.state.orientation);
    }

    /// Observer fired with `(previous, current)` whenever grip/drift switches.
    pub fn on_drive_state_changed(&mut self, f: impl FnMut(Option<DriveStateKind>, DriveStateKind) + Send + 'static) {
        self.machine.on_state_changed(f);
    }

    // ---------------- simulation ----------------

    pub fn tick(&mut self, input: InputFrame, reset: bool, dt: f32) {
        let input = input.clamped();
        self.last_input = input;

        if !(dt.is_finite() && dt > 0.0) {
            warn!(dt, "skipping tick with non-positive dt");
            self.handle_reset(reset);
            return;
        }

        let tuning = Arc::clone(&self.tuning);

        // 1) steering -> yaw rate
        let kind = self.drive_state();
        let params = tuning.params(kind);
        let yaw = update_yaw_rate(self.state.yaw_rate, input.steer, self.state.speed, params, dt);
        self.state.yaw_rate = clamp_yaw_rate(yaw, params);
        self.target_steering_angle = target_steering_angle(input.steer, params);

        // 2) grip <-> drift
        let next = next_drive_state(kind, self.state.yaw_rate, &tuning);
        if next != kind {
            match self.machine.set_state(next) {
                Ok(_) => debug!(from = %kind, to = %next, yaw_rate = self.state.yaw_rate, "drive state changed"),
                Err(e) => warn!(error = %e, "drive state change rejected"),
            }
        }
        self.machine.update(dt);
        let active = self.drive_state();
        let params = tuning.params(active);
        self.state.yaw_rate = clamp_yaw_rate(self.state.yaw_rate, params);

        // 3) speed
        self.state.speed = update_speed(self.state.speed, input.throttle, input.brake, &tuning, dt);

        // 4) gravity
        self.update_gravity(dt);

        // 5) move, then settle onto whatever ground is under the new position
        let direction = self.movement_direction(active, dt);
        let velocity = Vec3::new(
            direction.x * self.state.speed,
            self.state.vertical_velocity,
            direction.z * self.state.speed,
        );
        let previous_y = self.state.position.y;
        self.state.position += velocity * dt;
        self.snap_to_ground(previous_y);

        // 6) yaw (only while moving)
        if self.state.speed > MOVING_THRESHOLD {
            self.state.orientation *= yaw_rotation(self.state.yaw_rate * dt);
        }

        // 7) ground alignment
        let origin = self.state.position + Vec3::y() * self.config.align_probe_offset;
        let hit = self.probe.probe_ground(
            origin,
            -Vec3::y(),
            self.config.align_probe_distance,
            self.config.ground_layer_mask,
        );
        self.state.orientation =
            align_to_ground(&self.state.orientation, &hit, self.config.ground_align_smooth_time, dt);

        // 8) camera rig
        self.camera.update(
            self.state.yaw_rate,
            params,
            &self.state.position,
            &self.state.orientation,
            self.config.follow_distance,
            self.config.camera_offset_epsilon,
            dt,
        );

        // 9) grip: let the follow camera pull the heading
        if active == DriveStateKind::Grip && self.state.speed > MOVING_THRESHOLD {
            self.state.orientation = neutralize_heading(
                &self.state.orientation,
                &self.state.position,
                &self.camera.target_position(),
                tuning.heading_neutralize_speed,
                dt,
            );
        }

        // 10) reset
        self.handle_reset(reset);
        self.ticks += 1;
    }

    /// Band below the vehicle that still counts as standing on the ground.
    fn contact_band(&self) -> f32 {
        self.config.ground_check_distance + self.config.ground_check_skin
    }

    /// Casts down from `align_probe_offset` above `top_y`, far enough to
    /// reach `contact_band` below `bottom_y`. Starting above the vehicle
    /// keeps the ray origin out of sloped ground it is climbing.
    fn probe_below(&self, top_y: f32, bottom_y: f32) -> (f32, GroundProbeResult) {
        let lift = self.config.align_probe_offset;
        let origin = Point3::new(self.state.position.x, top_y + lift, self.state.position.z);
        let reach = lift + (top_y - bottom_y).max(0.0) + self.contact_band();
        let hit = self.probe.probe_ground(origin, -Vec3::y(), reach, self.config.ground_layer_mask);
        (origin.y, hit)
    }

    fn update_gravity(&mut self, dt: f32) {
        let y = self.state.position.y;
        let (_, check) = self.probe_below(y, y);
        self.grounded = check.grounded;

        if self.grounded {
            self.state.vertical_velocity = 0.0;
        } else {
            self.state.vertical_velocity -= self.config.gravity * dt;
        }
    }

    /// Places the vehicle on the ground contact found between its previous
    /// height and the band below its new position. Covers slopes in both
    /// directions and falls longer than the band in a single tick.
    fn snap_to_ground(&mut self, previous_y: f32) {
        let y = self.state.position.y;
        let (origin_y, hit) = self.probe_below(previous_y.max(y), y);
        if !hit.grounded {
            return;
        }
        let contact_y = origin_y - hit.distance;
        if y <= contact_y + self.contact_band() {
            self.state.position.y = contact_y;
            self.state.vertical_velocity = 0.0;
            self.grounded = true;
        }
    }

    /// Grip blends the vehicle forward toward the camera forward; Drift
    /// drives straight along the vehicle forward.
    fn movement_direction(&self, active: DriveStateKind, dt: f32) -> Vec3 {
        let forward = self.state.orientation * Vec3::z();
        let flat = Vec3::new(forward.x, 0.0, forward.z).try_normalize(1e-6).unwrap_or_else(Vec3::z);

        match active {
            DriveStateKind::Drift => flat,
            DriveStateKind::Grip => {
                let camera_forward = forward_from_yaw(self.camera.target_yaw());
                let t = (self.tuning.camera_neutralize_speed * dt).clamp(0.0, 1.0);
                flat.lerp(&camera_forward, t).try_normalize(1e-6).unwrap_or(flat)
            }
        }
    }

    fn handle_reset(&mut self, reset: bool) {
        if reset && !self.reset_held {
            self.reset_to_origin();
        }
        self.reset_held = reset;
    }

    /// Restores the recorded origin pose and zeroes all motion.
    pub fn reset_to_origin(&mut self) {
        let (position, orientation) = self.origin;
        self.state = VehicleState::at(position, orientation);
        self.camera.reset(&position, &orientation, self.config.follow_distance);
        debug!(?position, "vehicle reset to origin");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drift_core::ProbeFn;

    fn flat_ground() -> ProbeFn<impl Fn(Point3<f32>, Vec3, f32, u32) -> GroundProbeResult> {
        // plane y = 0
        ProbeFn(|origin: Point3<f32>, _dir: Vec3, max: f32, _mask: u32| {
            if origin.y >= -1e-4 && origin.y <= max + 1e-4 {
                GroundProbeResult::hit(Vec3::y(), origin.y)
            } else {
                GroundProbeResult::miss()
            }
        })
    }

    fn controller() -> DriftController {
        DriftController::builder(Arc::new(VehicleTuning::default()))
            .ground_probe(flat_ground())
            .build()
            .expect("controller")
    }

    #[test]
    fn missing_probe_fails_at_build() {
        let err = DriftController::builder(Arc::new(VehicleTuning::default())).build().err();
        assert!(matches!(err, Some(ControllerError::MissingGroundProbe)));
    }

    #[test]
    fn invalid_tuning_fails_at_build() {
        let tuning = VehicleTuning { max_speed: f32::NAN, ..VehicleTuning::default() };
        let err = DriftController::builder(Arc::new(tuning)).ground_probe(flat_ground()).build().err();
        assert!(matches!(err, Some(ControllerError::Tuning(_))));
    }

    #[test]
    fn starts_in_grip_at_rest() {
        let c = controller();
        assert_eq!(c.drive_state(), DriveStateKind::Grip);
        assert_eq!(c.state().speed, 0.0);
        assert_eq!(c.state().yaw_rate, 0.0);
    }

    #[test]
    fn throttle_moves_forward_on_flat_ground() {
        let mut c = controller();
        for _ in 0..60 {
            c.tick(InputFrame::new(0.0, 1.0, 0.0), false, 1.0 / 60.0);
        }
        assert!(c.grounded());
        assert!((c.state().speed - 5.0).abs() < 1e-3);
        assert!(c.state().position.z > 2.0);
        assert!(c.state().position.x.abs() < 1e-3);
        assert_eq!(c.state().position.y, 0.0);
    }

    #[test]
    fn no_steering_while_stopped() {
        let mut c = controller();
        for _ in 0..30 {
            c.tick(InputFrame::new(1.0, 0.0, 0.0), false, 1.0 / 60.0);
        }
        assert_eq!(c.state().yaw_rate, 0.0);
        assert!(c.state().orientation.angle_to(&Quat::identity()) < 1e-5);
    }

    #[test]
    fn falls_when_nothing_below() {
        let mut c = DriftController::builder(Arc::new(VehicleTuning::default()))
            .ground_probe(ProbeFn(|_: Point3<f32>, _: Vec3, _: f32, _: u32| GroundProbeResult::miss()))
            .build()
            .unwrap();
        c.tick(InputFrame::default(), false, 0.5);
        assert!(!c.grounded());
        assert!((c.state().vertical_velocity + 4.9).abs() < 1e-4);
        assert!(c.state().position.y < 0.0);
    }

    #[test]
    fn hard_steering_enters_drift_and_stays_bounded() {
        let mut c = controller();
        let dt = 1.0 / 60.0;
        for _ in 0..120 {
            c.tick(InputFrame::new(0.0, 1.0, 0.0), false, dt);
        }
        let mut drifted = false;
        for _ in 0..240 {
            c.tick(InputFrame::new(1.0, 1.0, 0.0), false, dt);
            let max = c.tuning().params(c.drive_state()).max_yaw_rate;
            assert!(c.state().yaw_rate.abs() <= max);
            drifted |= c.drive_state() == DriveStateKind::Drift;
        }
        assert!(drifted);
        assert_eq!(c.previous_drive_state(), Some(DriveStateKind::Grip));
    }

    #[test]
    fn reset_restores_origin_once_per_press() {
        let origin = Point3::new(3.0, 0.0, -2.0);
        let mut c = DriftController::builder(Arc::new(VehicleTuning::default()))
            .ground_probe(flat_ground())
            .origin(origin, yaw_rotation(90.0))
            .build()
            .unwrap();

        for _ in 0..90 {
            c.tick(InputFrame::new(0.6, 1.0, 0.0), false, 1.0 / 60.0);
        }
        assert!(c.state().speed > 0.0);

        c.tick(InputFrame::new(0.6, 1.0, 0.0), true, 1.0 / 60.0);
        assert_eq!(c.state().position, origin);
        assert_eq!(c.state().orientation, yaw_rotation(90.0));
        assert_eq!(c.state().speed, 0.0);
        assert_eq!(c.state().yaw_rate, 0.0);

        // held: only the rising edge resets
        c.tick(InputFrame::new(0.0, 1.0, 0.0), true, 1.0 / 60.0);
        assert!(c.state().speed > 0.0);
    }

    #[test]
    fn long_fall_lands_on_the_surface() {
        // last step before contact is wider than the contact band
        let mut c = DriftController::builder(Arc::new(VehicleTuning::default()))
            .ground_probe(flat_ground())
            .origin(Point3::new(0.0, 20.0, 0.0), Quat::identity())
            .build()
            .unwrap();
        for _ in 0..300 {
            c.tick(InputFrame::default(), false, 1.0 / 60.0);
            assert!(c.state().position.y >= 0.0, "below ground at {}", c.state().position.y);
        }
        assert!(c.grounded());
        assert_eq!(c.state().position.y, 0.0);
        assert_eq!(c.state().vertical_velocity, 0.0);
    }

    fn flat_forward(rot: &Quat) -> Vec3 {
        let f = rot * Vec3::z();
        Vec3::new(f.x, 0.0, f.z).normalize()
    }

    /// Runs one tick and returns (vehicle flat forward before it, horizontal travel direction).
    fn step_direction(c: &mut DriftController, input: InputFrame) -> (Vec3, Vec3) {
        let before = c.state().position;
        let forward = flat_forward(&c.state().orientation);
        c.tick(input, false, 1.0 / 60.0);
        let d = c.state().position - before;
        (forward, Vec3::new(d.x, 0.0, d.z).normalize())
    }

    #[test]
    fn drift_travels_along_vehicle_forward() {
        let mut c = controller();
        let dt = 1.0 / 60.0;
        for _ in 0..120 {
            c.tick(InputFrame::new(0.0, 1.0, 0.0), false, dt);
        }
        for _ in 0..240 {
            c.tick(InputFrame::new(1.0, 1.0, 0.0), false, dt);
            if c.drive_state() == DriveStateKind::Drift {
                break;
            }
        }
        assert_eq!(c.drive_state(), DriveStateKind::Drift);

        let camera_forward = forward_from_yaw(c.camera().target_yaw());
        let (forward, moved) = step_direction(&mut c, InputFrame::new(1.0, 1.0, 0.0));
        assert_eq!(c.drive_state(), DriveStateKind::Drift);
        assert!(forward.angle(&camera_forward) > 1f32.to_radians());
        assert!(moved.angle(&forward) < 1e-3);
    }

    #[test]
    fn grip_travel_leans_toward_camera() {
        // t = 30 * dt = 0.5: halfway between vehicle and camera forward
        let tuning = VehicleTuning { camera_neutralize_speed: 30.0, ..VehicleTuning::default() };
        let mut c = DriftController::builder(Arc::new(tuning)).ground_probe(flat_ground()).build().unwrap();
        let dt = 1.0 / 60.0;
        for _ in 0..60 {
            c.tick(InputFrame::new(0.0, 1.0, 0.0), false, dt);
        }
        for _ in 0..90 {
            c.tick(InputFrame::new(0.8, 1.0, 0.0), false, dt);
        }
        assert_eq!(c.drive_state(), DriveStateKind::Grip);

        let camera_forward = forward_from_yaw(c.camera().target_yaw());
        let (forward, moved) = step_direction(&mut c, InputFrame::new(0.8, 1.0, 0.0));
        let gap = forward.angle(&camera_forward);
        assert!(gap > 1f32.to_radians());

        let expected = forward.lerp(&camera_forward, 0.5).normalize();
        assert!(moved.angle(&expected) < 1e-3);
        assert!(moved.angle(&camera_forward) < gap);
    }

    #[test]
    fn heading_holds_while_stopped() {
        let mut c = controller();
        let dt = 1.0 / 60.0;
        for _ in 0..60 {
            c.tick(InputFrame::new(0.0, 1.0, 0.0), false, dt);
        }
        for _ in 0..90 {
            c.tick(InputFrame::new(0.8, 1.0, 0.0), false, dt);
        }
        for _ in 0..120 {
            c.tick(InputFrame::new(0.0, 0.0, 1.0), false, dt);
            if c.state().speed == 0.0 {
                break;
            }
        }
        assert_eq!(c.state().speed, 0.0);
        assert_eq!(c.drive_state(), DriveStateKind::Grip);
        // the camera target is still off to the side
        assert!(c.camera().yaw_offset().abs() > 0.1);

        let held = c.state().orientation;
        for _ in 0..30 {
            c.tick(InputFrame::default(), false, dt);
        }
        assert!(c.state().orientation.angle_to(&held) < 1e-5);
    }
}
