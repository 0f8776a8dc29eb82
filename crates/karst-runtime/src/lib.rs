//! Frame-level orchestration: owns the per-kind chunk pools, steps voxel
//! simulation, and drives the derived passes (face enable, face combine, box
//! combine, collision bodies) off the voxel chunks' dirty lists.
#![forbid(unsafe_code)]

use hashbrown::HashSet;

use karst_chunk::{CHUNK_DEPTH, CHUNK_WIDTH, ChunkPool, ManagedChunk};
use karst_collision::backend::{PhysicsBackend, PhysicsBodyId};
use karst_collision::{CollisionChunk, CollisionShapeDef};
use karst_geom::{Aabb, ChunkPos, Facing, Vec3, VoxelPos};
use karst_surface::{BoxCombineChunk, BoxCombineResult, FaceCombineChunk, FaceEnableChunk};
use karst_voxel::VoxelChunk;
use karst_voxel::defs::{AIR_SHAPE_DEF_ID, BoxShape, VoxelKind};
use karst_voxel::insts::ChasmWallInst;

/// Fills a freshly spawned voxel chunk from level data or a generator.
pub trait VoxelPopulator {
    fn populate(&mut self, chunk: &mut VoxelChunk);
}

/// Read-only view of one chunk's renderable state for this frame.
pub struct DrawRegion<'a> {
    pub voxels: &'a VoxelChunk,
    pub face_enable: &'a FaceEnableChunk,
    pub face_combine: &'a FaceCombineChunk,
}

impl DrawRegion<'_> {
    pub fn position(&self) -> ChunkPos {
        self.voxels.position()
    }
}

/// Owns one chunk of every kind per active chunk position; pools keep the
/// kinds in lockstep across spawn and recycle.
pub struct WorldChunkManager {
    chunk_height: i32,
    voxels: ChunkPool<VoxelChunk>,
    face_enable: ChunkPool<FaceEnableChunk>,
    face_combine: ChunkPool<FaceCombineChunk>,
    box_combine: ChunkPool<BoxCombineChunk>,
    collision: ChunkPool<CollisionChunk>,
}

impl WorldChunkManager {
    pub fn new(chunk_height: i32) -> Self {
        assert!(chunk_height > 0);
        Self {
            chunk_height,
            voxels: ChunkPool::new(),
            face_enable: ChunkPool::new(),
            face_combine: ChunkPool::new(),
            box_combine: ChunkPool::new(),
            collision: ChunkPool::new(),
        }
    }

    pub fn chunk_height(&self) -> i32 {
        self.chunk_height
    }

    pub fn chunk_count(&self) -> usize {
        self.voxels.active_count()
    }

    pub fn voxel_chunk(&self, position: ChunkPos) -> Option<&VoxelChunk> {
        self.voxels.at_position(position)
    }

    pub fn voxel_chunk_mut(&mut self, position: ChunkPos) -> Option<&mut VoxelChunk> {
        self.voxels.at_position_mut(position)
    }

    pub fn collision_chunk(&self, position: ChunkPos) -> Option<&CollisionChunk> {
        self.collision.at_position(position)
    }

    pub fn draw_region(&self, position: ChunkPos) -> Option<DrawRegion<'_>> {
        Some(DrawRegion {
            voxels: self.voxels.at_position(position)?,
            face_enable: self.face_enable.at_position(position)?,
            face_combine: self.face_combine.at_position(position)?,
        })
    }

    pub fn draw_regions(&self) -> impl Iterator<Item = DrawRegion<'_>> {
        self.voxels
            .iter()
            .filter_map(|chunk| self.draw_region(chunk.position()))
    }

    /// Steps one frame: recycles freed chunks, spawns and fully builds new
    /// ones, advances animations, then incrementally rebuilds the derived
    /// state for whatever the frame dirtied. Call `end_frame` after all
    /// consumers (rendering, gameplay) have read this frame's dirty lists.
    pub fn update(
        &mut self,
        dt: f32,
        new_chunk_positions: &[ChunkPos],
        freed_chunk_positions: &[ChunkPos],
        populator: &mut dyn VoxelPopulator,
        backend: &mut dyn PhysicsBackend,
    ) {
        for &position in freed_chunk_positions {
            if let Some(collision) = self.collision.at_position_mut(position) {
                collision.free_all_bodies(backend);
            }
            let recycled = self.voxels.recycle_at(position);
            self.face_enable.recycle_at(position);
            self.face_combine.recycle_at(position);
            self.box_combine.recycle_at(position);
            self.collision.recycle_at(position);
            if recycled {
                log::debug!("recycled chunk ({}, {})", position.x, position.z);
            }
        }

        for &position in new_chunk_positions {
            self.spawn_chunk(position, populator, backend);
        }

        let positions: Vec<ChunkPos> = self.voxels.iter().map(|c| c.position()).collect();
        for position in positions {
            self.update_chunk(position, dt, backend);
        }
    }

    /// Clears every chunk's dirty lists and removes instances destroyed this
    /// frame.
    pub fn end_frame(&mut self) {
        for chunk in self.voxels.iter_mut() {
            chunk.clean_up();
        }
    }

    fn spawn_chunk(
        &mut self,
        position: ChunkPos,
        populator: &mut dyn VoxelPopulator,
        backend: &mut dyn PhysicsBackend,
    ) {
        let height = self.chunk_height;
        let index = self.voxels.spawn(position, height);
        self.face_enable.spawn(position, height);
        self.face_combine.spawn(position, height);
        self.box_combine.spawn(position, height);
        self.collision.spawn(position, height);

        let voxel = self.voxels.get_mut(index);
        populator.populate(voxel);
        refresh_chasm_walls_everywhere(voxel);
        refresh_door_visibility(voxel);

        let voxel = self.voxels.get(index);
        let all_positions: Vec<VoxelPos> = all_voxel_positions(height);
        let Some(enable) = self.face_enable.at_position_mut(position) else {
            return;
        };
        enable.update(&all_positions, voxel);
        let enable = match self.face_enable.at_position(position) {
            Some(enable) => enable,
            None => return,
        };
        if let Some(combine) = self.face_combine.at_position_mut(position) {
            combine.update(&all_positions, voxel, enable);
        }
        if let Some(boxes) = self.box_combine.at_position_mut(position) {
            boxes.update(&all_positions, voxel);
        }
        if let (Some(boxes), Some(collision)) = (
            self.box_combine.at_position(position),
            self.collision.at_position_mut(position),
        ) {
            rebuild_collision(voxel, boxes, collision, backend);
        }

        // The full build consumed everything populate dirtied.
        self.voxels.get_mut(index).clean_up();
        log::debug!("spawned chunk ({}, {})", position.x, position.z);
    }

    fn update_chunk(&mut self, position: ChunkPos, dt: f32, backend: &mut dyn PhysicsBackend) {
        let Some(voxel) = self.voxels.at_position_mut(position) else {
            return;
        };
        voxel.update(dt);
        apply_fade_replacements(voxel);

        let shape_dirty: Vec<VoxelPos> = voxel.dirty_shape_positions().to_vec();
        if !shape_dirty.is_empty() {
            let mut candidates = with_neighbors(&shape_dirty, voxel);
            refresh_chasm_walls(voxel, &candidates);
            refresh_door_visibility(voxel);

            candidates.extend_from_slice(voxel.dirty_face_activation_positions());
            candidates.sort_unstable();
            candidates.dedup();

            let voxel = match self.voxels.at_position(position) {
                Some(voxel) => voxel,
                None => return,
            };
            let Some(enable) = self.face_enable.at_position_mut(position) else {
                return;
            };
            enable.update(&candidates, voxel);
        } else if !voxel.dirty_face_activation_positions().is_empty() {
            let face_activation: Vec<VoxelPos> =
                voxel.dirty_face_activation_positions().to_vec();
            let voxel = match self.voxels.at_position(position) {
                Some(voxel) => voxel,
                None => return,
            };
            if let Some(enable) = self.face_enable.at_position_mut(position) {
                enable.update(&face_activation, voxel);
            }
        }

        let Some(voxel) = self.voxels.at_position(position) else {
            return;
        };
        let mut combine_input: Vec<VoxelPos> = voxel.dirty_shape_positions().to_vec();
        combine_input.extend(with_neighbors(voxel.dirty_shape_positions(), voxel));
        combine_input.extend_from_slice(voxel.dirty_face_activation_positions());
        combine_input.extend_from_slice(voxel.dirty_fade_anim_positions());
        combine_input.sort_unstable();
        combine_input.dedup();

        if !combine_input.is_empty() {
            let enable = match self.face_enable.at_position(position) {
                Some(enable) => enable,
                None => return,
            };
            if let Some(combine) = self.face_combine.at_position_mut(position) {
                combine.update(&combine_input, voxel, enable);
            }
        }

        let mut box_dirty: Vec<VoxelPos> = voxel.dirty_shape_positions().to_vec();
        if let Some(boxes) = self.box_combine.at_position(position) {
            // A voxel that starts fading splits out of its merged box so its
            // collider can be toggled on its own.
            for &pos in voxel.dirty_fade_anim_positions() {
                if let Some(id) = boxes.entry(pos) {
                    if boxes.result(id).voxel_count() > 1 {
                        box_dirty.push(pos);
                    }
                }
            }
        }
        box_dirty.sort_unstable();
        box_dirty.dedup();

        if !box_dirty.is_empty() {
            if let Some(boxes) = self.box_combine.at_position_mut(position) {
                boxes.update(&box_dirty, voxel);
            }
            if let (Some(boxes), Some(collision)) = (
                self.box_combine.at_position(position),
                self.collision.at_position_mut(position),
            ) {
                rebuild_collision(voxel, boxes, collision, backend);
            }
        }

        if let Some(collision) = self.collision.at_position_mut(position) {
            // Doors block movement only while fully closed.
            for &pos in voxel.dirty_door_anim_positions() {
                let enabled = match voxel.try_get_door_anim_inst_index(pos.x, pos.y, pos.z) {
                    Some(i) => voxel.door_anim_insts()[i].is_closed(),
                    None => true,
                };
                collision.apply_collider_enabled(pos, enabled, backend);
            }
            // Fading voxels stop blocking as soon as the fade starts.
            for &pos in voxel.dirty_fade_anim_positions() {
                let fading = voxel
                    .try_get_fade_anim_inst_index(pos.x, pos.y, pos.z)
                    .is_some_and(|i| !voxel.fade_anim_insts()[i].is_done());
                if fading {
                    collision.apply_collider_enabled(pos, false, backend);
                }
            }
        }
    }
}

fn all_voxel_positions(height: i32) -> Vec<VoxelPos> {
    let mut positions = Vec::with_capacity((CHUNK_WIDTH * height * CHUNK_DEPTH) as usize);
    for y in 0..height {
        for z in 0..CHUNK_DEPTH {
            for x in 0..CHUNK_WIDTH {
                positions.push(VoxelPos::new(x, y, z));
            }
        }
    }
    positions
}

/// The input positions plus their valid in-chunk neighbors, unsorted.
fn with_neighbors(positions: &[VoxelPos], voxel: &VoxelChunk) -> Vec<VoxelPos> {
    let mut out = Vec::with_capacity(positions.len() * 7);
    for &pos in positions {
        out.push(pos);
        for facing in karst_geom::ALL_FACINGS {
            let adjacent = pos + facing.delta();
            if voxel.is_valid_voxel(adjacent.x, adjacent.y, adjacent.z) {
                out.push(adjacent);
            }
        }
    }
    out
}

/// Swaps a fully faded voxel for the chunk's floor replacement (floors over
/// chasms) or plain air.
fn apply_fade_replacements(voxel: &mut VoxelChunk) {
    let finished: Vec<VoxelPos> = voxel.destroyed_fade_anim_positions().to_vec();
    for pos in finished {
        let kind = voxel
            .traits_def(voxel.traits_def_id(pos.x, pos.y, pos.z))
            .kind();
        let use_replacement =
            kind == VoxelKind::Floor && voxel.floor_replacement_shape_def_id() != AIR_SHAPE_DEF_ID;
        if use_replacement {
            let shape = voxel.floor_replacement_shape_def_id();
            let texture = voxel.floor_replacement_texture_def_id();
            let traits_id = voxel.floor_replacement_traits_def_id();
            voxel.set_shape_def_id(pos.x, pos.y, pos.z, shape);
            voxel.set_texture_def_id(pos.x, pos.y, pos.z, texture);
            voxel.set_traits_def_id(pos.x, pos.y, pos.z, traits_id);
            if let Some(chasm) = voxel.floor_replacement_chasm_def_id() {
                voxel.add_chasm_def_position(chasm, pos);
            }
        } else {
            voxel.set_shape_def_id(pos.x, pos.y, pos.z, AIR_SHAPE_DEF_ID);
            voxel.set_texture_def_id(pos.x, pos.y, pos.z, 0);
            voxel.set_traits_def_id(pos.x, pos.y, pos.z, 0);
        }
    }
}

const CHASM_WALL_FACINGS: [(Facing, usize); 4] = [
    (Facing::PosZ, 0), // north
    (Facing::PosX, 1), // east
    (Facing::NegZ, 2), // south
    (Facing::NegX, 3), // west
];

fn chasm_walls_at(voxel: &VoxelChunk, pos: VoxelPos) -> ChasmWallInst {
    let mut inst = ChasmWallInst::new(pos);
    let mut walls = [false; 4];
    for (facing, slot) in CHASM_WALL_FACINGS {
        let adjacent = pos + facing.delta();
        if !voxel.is_valid_voxel(adjacent.x, adjacent.y, adjacent.z) {
            continue;
        }
        let shape = voxel.shape_def(voxel.shape_def_id(adjacent.x, adjacent.y, adjacent.z));
        walls[slot] = !shape.mesh.empty;
    }
    inst.north = walls[0];
    inst.east = walls[1];
    inst.south = walls[2];
    inst.west = walls[3];
    inst
}

/// Re-derives chasm wall state for candidate voxels after a shape edit.
fn refresh_chasm_walls(voxel: &mut VoxelChunk, candidates: &[VoxelPos]) {
    for &pos in candidates {
        let kind = voxel
            .traits_def(voxel.traits_def_id(pos.x, pos.y, pos.z))
            .kind();
        let existing = voxel.try_get_chasm_wall_inst_index(pos.x, pos.y, pos.z);
        if kind != VoxelKind::Chasm {
            if existing.is_some() {
                voxel.remove_chasm_wall_inst(pos);
            }
            continue;
        }
        let desired = chasm_walls_at(voxel, pos);
        match existing {
            Some(i) => {
                if voxel.chasm_wall_insts()[i] != desired {
                    if desired.has_any_wall() {
                        voxel.chasm_wall_insts_mut()[i] = desired;
                        voxel.mark_face_activation_dirty(pos);
                    } else {
                        voxel.remove_chasm_wall_inst(pos);
                    }
                }
            }
            None => {
                if desired.has_any_wall() {
                    voxel.add_chasm_wall_inst(desired);
                }
            }
        }
    }
}

fn refresh_chasm_walls_everywhere(voxel: &mut VoxelChunk) {
    let mut chasms = Vec::new();
    for y in 0..voxel.height() {
        for z in 0..CHUNK_DEPTH {
            for x in 0..CHUNK_WIDTH {
                if voxel.traits_def(voxel.traits_def_id(x, y, z)).kind() == VoxelKind::Chasm {
                    chasms.push(VoxelPos::new(x, y, z));
                }
            }
        }
    }
    refresh_chasm_walls(voxel, &chasms);
}

const DOOR_VIS_FACINGS: [Facing; 4] = [Facing::PosX, Facing::NegX, Facing::PosZ, Facing::NegZ];

/// A door face is visible when the adjacent voxel is open space (or the
/// chunk edge). Marks the voxel door-vis dirty only on an actual change.
fn refresh_door_visibility(voxel: &mut VoxelChunk) {
    for i in 0..voxel.door_vis_insts().len() {
        let pos = voxel.door_vis_insts()[i].pos;
        let mut desired = [false; 4];
        for (slot, facing) in DOOR_VIS_FACINGS.into_iter().enumerate() {
            let adjacent = pos + facing.delta();
            desired[slot] = !voxel.is_valid_voxel(adjacent.x, adjacent.y, adjacent.z)
                || voxel
                    .shape_def(voxel.shape_def_id(adjacent.x, adjacent.y, adjacent.z))
                    .mesh
                    .empty;
        }
        let changed = DOOR_VIS_FACINGS
            .into_iter()
            .enumerate()
            .any(|(slot, facing)| voxel.door_vis_insts()[i].is_visible(facing) != desired[slot]);
        if changed {
            let inst = &mut voxel.door_vis_insts_mut()[i];
            for (slot, facing) in DOOR_VIS_FACINGS.into_iter().enumerate() {
                inst.set_visible(facing, desired[slot]);
            }
            voxel.mark_door_vis_dirty(pos);
        }
    }
}

/// World-space bounds of a merged box, applying the shape's in-cell extents
/// to the outermost cells.
fn result_aabb(chunk_position: ChunkPos, result: &BoxCombineResult, shape_box: &BoxShape) -> Aabb {
    let origin_x = (chunk_position.x * CHUNK_WIDTH) as f32;
    let origin_z = (chunk_position.z * CHUNK_DEPTH) as f32;
    let lateral_x = (1.0 - shape_box.width) * 0.5;
    let lateral_z = (1.0 - shape_box.depth) * 0.5;
    Aabb {
        min: Vec3::new(
            origin_x + result.min.x as f32 + lateral_x,
            result.min.y as f32 + shape_box.y_offset,
            origin_z + result.min.z as f32 + lateral_z,
        ),
        max: Vec3::new(
            origin_x + result.max.x as f32 + 1.0 - lateral_x,
            result.max.y as f32 + shape_box.y_offset + shape_box.height,
            origin_z + result.max.z as f32 + 1.0 - lateral_z,
        ),
    }
}

/// Whether the voxel currently blocks movement: closed-or-absent door and no
/// active fade.
fn voxel_collider_enabled(voxel: &VoxelChunk, pos: VoxelPos) -> bool {
    if let Some(i) = voxel.try_get_door_anim_inst_index(pos.x, pos.y, pos.z) {
        if !voxel.door_anim_insts()[i].is_closed() {
            return false;
        }
    }
    let fading = voxel
        .try_get_fade_anim_inst_index(pos.x, pos.y, pos.z)
        .is_some_and(|i| !voxel.fade_anim_insts()[i].is_done());
    !fading
}

/// Rebuilds physics bodies for every voxel the box combiner just touched:
/// free the old bodies in two batches, create one body per surviving merged
/// box, and insert the new bodies in a single batch.
fn rebuild_collision(
    voxel: &VoxelChunk,
    boxes: &BoxCombineChunk,
    collision: &mut CollisionChunk,
    backend: &mut dyn PhysicsBackend,
) {
    let dirty = boxes.last_dirty_positions();
    for &pos in dirty {
        let mapped =
            collision.get_or_add_shape_mapping(voxel, voxel.shape_def_id(pos.x, pos.y, pos.z));
        collision.set_shape_def_id(pos.x, pos.y, pos.z, mapped);
    }
    collision.free_bodies_at(dirty, backend);

    let mut created: Vec<PhysicsBodyId> = Vec::new();
    let mut seen: HashSet<karst_surface::SlotId> = HashSet::new();
    for &pos in dirty {
        let Some(id) = boxes.entry(pos) else {
            continue;
        };
        if !seen.insert(id) {
            continue;
        }
        let result = boxes.result(id);
        let seed = result.min;
        let (shape_box, is_sensor) =
            match collision.shape_def(collision.shape_def_id(seed.x, seed.y, seed.z)) {
                CollisionShapeDef::Box(shape_box) => (*shape_box, false),
                // Sensor region for a trigger/transition on an air voxel.
                CollisionShapeDef::None => (BoxShape::UNIT, true),
            };
        let aabb = result_aabb(voxel.position(), result, &shape_box);
        let Some(body) = backend.create_body(aabb, is_sensor) else {
            log::error!(
                "physics backend out of bodies at chunk ({}, {})",
                voxel.position().x,
                voxel.position().z
            );
            continue;
        };
        // Multi-voxel boxes never contain doors or fading voxels, so only a
        // standalone box can start life disabled (door already open).
        let enabled = result.voxel_count() > 1 || voxel_collider_enabled(voxel, seed);
        if enabled {
            created.push(body);
        }
        for covered in result.positions() {
            collision.set_body_id(covered, body, enabled);
            collision.set_collider_enabled(covered.x, covered.y, covered.z, enabled);
        }
    }
    if !created.is_empty() {
        backend.add_bodies(&created);
    }
}
