//! Narrow seam to the physics engine. The chunk layer only ever hands the
//! backend axis-aligned boxes and batched body lifecycle calls, so swapping
//! engines touches nothing else.

use karst_geom::Aabb;

/// Opaque handle issued by the physics backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PhysicsBodyId(pub u64);

pub trait PhysicsBackend {
    /// Creates a static body (or sensor region) without adding it to the
    /// simulation. Returns `None` when the engine is out of body capacity.
    fn create_body(&mut self, aabb: Aabb, is_sensor: bool) -> Option<PhysicsBodyId>;

    /// Inserts previously created bodies into the simulation.
    fn add_bodies(&mut self, ids: &[PhysicsBodyId]);

    /// Removes bodies from the simulation; they remain alive and re-addable.
    fn remove_bodies(&mut self, ids: &[PhysicsBodyId]);

    /// Destroys bodies. Callers remove inserted bodies first.
    fn destroy_bodies(&mut self, ids: &[PhysicsBodyId]);
}
