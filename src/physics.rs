// src/physics.rs
// ==============================================================================
// Static ground scene (rapier) + ground raycasts for the drift controller.
// ------------------------------------------------------------------------------
// The drift model does not run rigid-body dynamics; rapier is only used as a
// collision/query backend. Colliders are fixed, tagged with GROUP_GROUND, and
// the QueryPipeline is rebuilt once after the scene is assembled, so a
// finished GroundWorld is read-only and can be shared across sessions.
// ==============================================================================

use rapier3d::prelude::*;
use nalgebra::Point3;
use tracing::info;

use crate::drift_core::{GroundProbe, GroundProbeResult, Vec3};

const GROUP_GROUND: Group = Group::from_bits_truncate(0b0001);

/// Layer mask that selects the ground colliders.
pub const GROUND_LAYER: u32 = GROUP_GROUND.bits();

pub struct GroundWorld {
    pub bodies: RigidBodySet,          // fixed bodies only
    pub colliders: ColliderSet,        // ground shapes
    pub query_pipeline: QueryPipeline, // for raycasting
}

impl Default for GroundWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl GroundWorld {
    pub fn new() -> Self {
        Self {
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            query_pipeline: QueryPipeline::new(),
        }
    }

    /// Large flat slab whose top surface is exactly y = 0.
    pub fn flat() -> Self {
        let mut world = Self::new();
        world.add_box([0.0, -1.0, 0.0], [500.0, 1.0, 500.0], 0.0);
        world.finalize();
        world
    }

    /// Flat slab plus a ramp ahead of the spawn area.
    pub fn test_track() -> Self {
        let mut world = Self::new();
        world.add_box([0.0, -1.0, 0.0], [500.0, 1.0, 500.0], 0.0);
        world.add_box([0.0, 0.0, 60.0], [8.0, 0.5, 12.0], -12.0);
        world.finalize();

        info!(
            bodies = world.bodies.len(),
            colliders = world.colliders.len(),
            "ground scene ready"
        );
        world
    }

    /// Adds a fixed cuboid centred at `center`, pitched about +X by
    /// `pitch_degrees` (negative raises the +Z end).
    pub fn add_box(&mut self, center: [f32; 3], half_extents: [f32; 3], pitch_degrees: f32) -> ColliderHandle {
        let [cx, cy, cz] = center;
        let [hx, hy, hz] = half_extents;

        let body = RigidBodyBuilder::fixed()
            .translation(vector![cx, cy, cz])
            .rotation(vector![pitch_degrees.to_radians(), 0.0, 0.0])
            .build();
        let handle = self.bodies.insert(body);

        let collider = ColliderBuilder::cuboid(hx, hy, hz)
            .collision_groups(InteractionGroups::new(GROUP_GROUND, Group::ALL))
            .friction(1.2)
            .restitution(0.0)
            .build();

        self.colliders.insert_with_parent(collider, handle, &mut self.bodies)
    }

    /// Rebuilds the query acceleration structure. Call after adding shapes.
    pub fn finalize(&mut self) {
        self.query_pipeline.update(&self.colliders);
    }
}

impl GroundProbe for GroundWorld {
    fn probe_ground(
        &self,
        origin: Point3<f32>,
        direction: Vec3,
        max_distance: f32,
        layer_mask: u32,
    ) -> GroundProbeResult {
        let Some(dir) = direction.try_normalize(1e-6) else {
            return GroundProbeResult::miss();
        };
        let ray = Ray::new(point![origin.x, origin.y, origin.z], vector![dir.x, dir.y, dir.z]);
        let filter = QueryFilter::default()
            .groups(InteractionGroups::new(Group::ALL, Group::from_bits_truncate(layer_mask)));

        match self.query_pipeline.cast_ray_and_get_normal(
            &self.bodies,
            &self.colliders,
            &ray,
            max_distance,
            true,
            filter,
        ) {
            Some((_handle, hit)) => {
                GroundProbeResult::hit(Vec3::new(hit.normal.x, hit.normal.y, hit.normal.z), hit.time_of_impact)
            }
            None => GroundProbeResult::miss(),
        }
    }
}
