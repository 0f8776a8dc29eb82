//! Collision-side view of a chunk: memoized translation of voxel shapes into
//! collision shapes, per-voxel collider enablement, and ownership of the
//! physics bodies spanning merged boxes.
#![forbid(unsafe_code)]

pub mod backend;

use hashbrown::HashMap;

use karst_chunk::{CHUNK_DEPTH, CHUNK_WIDTH, ChunkGrid, ChunkHeader, ManagedChunk};
use karst_geom::{ChunkPos, VoxelPos};
use karst_voxel::VoxelChunk;
use karst_voxel::defs::{BoxShape, ShapeDefId, ShapeGeometry};

use crate::backend::{PhysicsBackend, PhysicsBodyId};

pub type CollisionShapeDefId = u16;

pub const AIR_COLLISION_SHAPE_DEF_ID: CollisionShapeDefId = 0;

/// Collision payload of one voxel shape. `None` means the voxel contributes
/// no collision volume (a sensor region may still exist at the voxel).
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CollisionShapeDef {
    None,
    Box(BoxShape),
}

#[derive(Default)]
pub struct CollisionChunk {
    header: ChunkHeader,
    shape_defs: Vec<CollisionShapeDef>,
    /// Voxel shape def -> collision shape def, filled on demand.
    shape_mappings: HashMap<ShapeDefId, CollisionShapeDefId>,
    shape_def_ids: ChunkGrid<CollisionShapeDefId>,
    enabled_colliders: ChunkGrid<bool>,
    body_ids: ChunkGrid<Option<PhysicsBodyId>>,
    /// Whether the body at this voxel is currently in the simulation.
    inserted: ChunkGrid<bool>,
}

impl ManagedChunk for CollisionChunk {
    fn init(&mut self, position: ChunkPos, height: i32) {
        self.header.init(position, height);
        self.shape_defs.push(CollisionShapeDef::None);
        self.shape_def_ids
            .init(CHUNK_WIDTH, height, CHUNK_DEPTH, AIR_COLLISION_SHAPE_DEF_ID);
        self.enabled_colliders
            .init(CHUNK_WIDTH, height, CHUNK_DEPTH, true);
        self.body_ids.init(CHUNK_WIDTH, height, CHUNK_DEPTH, None);
        self.inserted.init(CHUNK_WIDTH, height, CHUNK_DEPTH, false);
    }

    fn position(&self) -> ChunkPos {
        self.header.position
    }

    fn height(&self) -> i32 {
        self.header.height
    }

    fn clear(&mut self) {
        debug_assert!(
            self.body_ids.iter().all(|id| id.is_none()),
            "chunk cleared with live physics bodies"
        );
        self.header.clear();
        self.shape_defs.clear();
        self.shape_mappings.clear();
        self.shape_def_ids.clear();
        self.enabled_colliders.clear();
        self.body_ids.clear();
        self.inserted.clear();
    }
}

impl CollisionChunk {
    pub fn shape_def(&self, id: CollisionShapeDefId) -> &CollisionShapeDef {
        &self.shape_defs[id as usize]
    }

    #[inline]
    pub fn shape_def_id(&self, x: i32, y: i32, z: i32) -> CollisionShapeDefId {
        *self.shape_def_ids.get(x, y, z)
    }

    pub fn set_shape_def_id(&mut self, x: i32, y: i32, z: i32, id: CollisionShapeDefId) {
        debug_assert!((id as usize) < self.shape_defs.len());
        self.shape_def_ids.set(x, y, z, id);
    }

    /// Translates a voxel shape into its collision shape, reusing an earlier
    /// translation of the same def. Empty meshes map to the air id.
    pub fn get_or_add_shape_mapping(
        &mut self,
        voxel_chunk: &VoxelChunk,
        voxel_shape_def_id: ShapeDefId,
    ) -> CollisionShapeDefId {
        if let Some(&id) = self.shape_mappings.get(&voxel_shape_def_id) {
            return id;
        }
        let shape = voxel_chunk.shape_def(voxel_shape_def_id);
        let id = if shape.mesh.empty {
            AIR_COLLISION_SHAPE_DEF_ID
        } else {
            let def = match shape.geometry {
                ShapeGeometry::Box(shape_box) => CollisionShapeDef::Box(shape_box),
            };
            let id = self.shape_defs.len() as CollisionShapeDefId;
            self.shape_defs.push(def);
            id
        };
        self.shape_mappings.insert(voxel_shape_def_id, id);
        id
    }

    #[inline]
    pub fn is_collider_enabled(&self, x: i32, y: i32, z: i32) -> bool {
        *self.enabled_colliders.get(x, y, z)
    }

    /// Toggles whether the collider at a voxel blocks movement (open doors
    /// and fading voxels don't). No effect on body lifetime.
    pub fn set_collider_enabled(&mut self, x: i32, y: i32, z: i32, enabled: bool) {
        self.enabled_colliders.set(x, y, z, enabled);
    }

    /// Sets the enabled flag and syncs the voxel's body with the simulation:
    /// a disabled collider's body is pulled out of the world, not destroyed.
    /// Only valid for voxels whose body spans just themselves (doors, fading
    /// voxels); the combiner keeps such voxels out of merged boxes.
    pub fn apply_collider_enabled(
        &mut self,
        pos: VoxelPos,
        enabled: bool,
        backend: &mut dyn PhysicsBackend,
    ) {
        self.enabled_colliders.set(pos.x, pos.y, pos.z, enabled);
        let Some(id) = *self.body_ids.at(pos) else {
            return;
        };
        let inserted = *self.inserted.at(pos);
        if enabled && !inserted {
            backend.add_bodies(&[id]);
            self.inserted.set_at(pos, true);
        } else if !enabled && inserted {
            backend.remove_bodies(&[id]);
            self.inserted.set_at(pos, false);
        }
    }

    #[inline]
    pub fn body_id(&self, pos: VoxelPos) -> Option<PhysicsBodyId> {
        *self.body_ids.at(pos)
    }

    /// Records the body spanning this voxel. One body covers every voxel of
    /// its merged box, so neighbors may share the same id.
    pub fn set_body_id(&mut self, pos: VoxelPos, id: PhysicsBodyId, inserted: bool) {
        debug_assert!(self.body_ids.at(pos).is_none(), "voxel already has a body");
        self.body_ids.set_at(pos, Some(id));
        self.inserted.set_at(pos, inserted);
    }

    #[inline]
    pub fn is_body_inserted(&self, pos: VoxelPos) -> bool {
        *self.inserted.at(pos)
    }

    /// Releases the bodies referenced by the given voxels: one batched
    /// simulation removal for the inserted ones, then one batched destroy for
    /// all of them. Voxels sharing a body release it once.
    pub fn free_bodies_at(&mut self, positions: &[VoxelPos], backend: &mut dyn PhysicsBackend) {
        let mut to_remove: Vec<PhysicsBodyId> = Vec::new();
        let mut to_destroy: Vec<PhysicsBodyId> = Vec::new();
        for &pos in positions {
            let Some(id) = *self.body_ids.at(pos) else {
                continue;
            };
            self.body_ids.set_at(pos, None);
            let was_inserted = *self.inserted.at(pos);
            self.inserted.set_at(pos, false);
            if to_destroy.contains(&id) {
                continue;
            }
            if was_inserted {
                to_remove.push(id);
            }
            to_destroy.push(id);
        }
        if !to_remove.is_empty() {
            backend.remove_bodies(&to_remove);
        }
        if !to_destroy.is_empty() {
            backend.destroy_bodies(&to_destroy);
        }
    }

    /// Releases every body in the chunk; called before recycling it.
    pub fn free_all_bodies(&mut self, backend: &mut dyn PhysicsBackend) {
        let positions: Vec<VoxelPos> = self.body_ids.positions().collect();
        self.free_bodies_at(&positions, backend);
    }
}
