use std::collections::BTreeSet;

use nalgebra::Point3;

use crate::drift_core::{Quat, yaw_rotation};

// ---------------------------------------------
// SPAWN RESULT RETURNED TO STATE + NET
// ---------------------------------------------
#[derive(Debug, Clone)]
pub struct VehicleSpawn {
    pub vehicle_id: String,
    pub slot: usize,
    pub position: Point3<f32>,
    pub orientation: Quat,
}

// ---------------------------------------------
// SPAWN GRID
// ---------------------------------------------
// Slots are laid out along X, alternating sides of the origin:
//   slot 0 -> x = 0, slot 1 -> +spacing, slot 2 -> -spacing, ...
// All vehicles face +Z. Freed slots are handed out again lowest first.
#[derive(Debug)]
pub struct SpawnManager {
    spacing: f32,
    height: f32,
    free: BTreeSet<usize>,
    next: usize,
}

impl SpawnManager {
    pub fn new(spacing: f32, height: f32) -> Self {
        Self { spacing, height, free: BTreeSet::new(), next: 0 }
    }

    pub fn slot_position(&self, slot: usize) -> Point3<f32> {
        let rank = slot.div_ceil(2) as f32;
        let side = if slot % 2 == 1 { 1.0 } else { -1.0 };
        Point3::new(side * rank * self.spacing, self.height, 0.0)
    }

    // ---------------------------------------------------------
    // Full allocation pipeline called from state.rs
    // ---------------------------------------------------------
    pub fn allocate_spawn(&mut self, vehicle_id: String) -> VehicleSpawn {
        let slot = match self.free.pop_first() {
            Some(slot) => slot,
            None => {
                self.next += 1;
                self.next - 1
            }
        };

        VehicleSpawn {
            vehicle_id,
            slot,
            position: self.slot_position(slot),
            orientation: yaw_rotation(0.0),
        }
    }

    pub fn release(&mut self, slot: usize) {
        if slot < self.next {
            self.free.insert(slot);
        }
    }
}

impl Default for SpawnManager {
    fn default() -> Self {
        Self::new(4.0, 0.05)
    }
}
