//! Greedy merging of solid voxels into larger collision boxes. Mirrors the
//! face combiner's dissolve/re-merge scheme but works on whole voxels, so a
//! chunk of flat ground collapses into a handful of slabs.

use karst_chunk::{CHUNK_DEPTH, CHUNK_WIDTH, ChunkGrid, ChunkHeader, ManagedChunk};
use karst_geom::{ChunkPos, VoxelPos};
use karst_voxel::VoxelChunk;
use karst_voxel::defs::{BoxShape, ShapeGeometry};

use crate::pool::{SlotId, SlotPool};

/// Inclusive voxel bounds of one merged collision box.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoxCombineResult {
    pub min: VoxelPos,
    pub max: VoxelPos,
}

impl BoxCombineResult {
    pub fn positions(&self) -> impl Iterator<Item = VoxelPos> + use<> {
        let (min, max) = (self.min, self.max);
        (min.y..=max.y).flat_map(move |y| {
            (min.z..=max.z)
                .flat_map(move |z| (min.x..=max.x).map(move |x| VoxelPos::new(x, y, z)))
        })
    }

    pub fn voxel_count(&self) -> i64 {
        let d = self.max - self.min;
        (d.x as i64 + 1) * (d.y as i64 + 1) * (d.z as i64 + 1)
    }
}

#[derive(Default)]
pub struct BoxCombineChunk {
    header: ChunkHeader,
    results: SlotPool<BoxCombineResult>,
    entries: ChunkGrid<Option<SlotId>>,
    scratch_dirty: Vec<VoxelPos>,
}

impl ManagedChunk for BoxCombineChunk {
    fn init(&mut self, position: ChunkPos, height: i32) {
        self.header.init(position, height);
        let voxel_count = (CHUNK_WIDTH * height * CHUNK_DEPTH) as usize;
        self.results.init(voxel_count);
        self.entries.init(CHUNK_WIDTH, height, CHUNK_DEPTH, None);
    }

    fn position(&self) -> ChunkPos {
        self.header.position
    }

    fn height(&self) -> i32 {
        self.header.height
    }

    fn clear(&mut self) {
        self.header.clear();
        self.results.clear();
        self.entries.clear();
        self.scratch_dirty.clear();
    }
}

impl BoxCombineChunk {
    #[inline]
    pub fn entry(&self, pos: VoxelPos) -> Option<SlotId> {
        *self.entries.at(pos)
    }

    pub fn result(&self, id: SlotId) -> &BoxCombineResult {
        self.results.get(id)
    }

    pub fn result_count(&self) -> usize {
        self.results.live_count()
    }

    pub fn iter_results(&self) -> impl Iterator<Item = &BoxCombineResult> {
        self.results.iter()
    }

    /// Voxels whose box membership was recomputed by the last `update` call,
    /// sorted and deduplicated. The collision layer rebuilds bodies for
    /// exactly these.
    pub fn last_dirty_positions(&self) -> &[VoxelPos] {
        &self.scratch_dirty
    }

    pub fn update(&mut self, dirty_positions: &[VoxelPos], voxel_chunk: &VoxelChunk) {
        self.scratch_dirty.clear();
        self.scratch_dirty.extend_from_slice(dirty_positions);

        for &pos in dirty_positions {
            if let Some(id) = *self.entries.at(pos) {
                let result = self.results.free(id);
                for covered in result.positions() {
                    self.entries.set_at(covered, None);
                    self.scratch_dirty.push(covered);
                }
            }
        }

        self.scratch_dirty.sort_unstable();
        self.scratch_dirty.dedup();
        self.scratch_dirty.sort_by_key(|pos| pos.length_sq());

        for i in 0..self.scratch_dirty.len() {
            let pos = self.scratch_dirty[i];
            self.try_build_result(pos, voxel_chunk);
        }
    }

    fn try_build_result(&mut self, pos: VoxelPos, voxel_chunk: &VoxelChunk) {
        if self.entries.at(pos).is_some() {
            return;
        }
        if !voxel_needs_box(voxel_chunk, pos) {
            return;
        }

        let min = pos;
        let mut max = pos;
        if !is_standalone(voxel_chunk, pos) {
            // Claim a run along +X, extrude it along +Y, then along +Z. Once
            // an axis rejects a slice it is never retried.
            for grow_axis in 0..3usize {
                loop {
                    if !self.slice_can_join(min, max, grow_axis, pos, voxel_chunk) {
                        break;
                    }
                    match grow_axis {
                        0 => max.x += 1,
                        1 => max.y += 1,
                        _ => max.z += 1,
                    }
                }
            }
        }

        let Some(id) = self.results.alloc(BoxCombineResult { min, max }) else {
            log::error!(
                "box combine pool exhausted in chunk ({}, {})",
                self.header.position.x,
                self.header.position.z
            );
            return;
        };
        for covered in self.results.get(id).positions() {
            self.entries.set_at(covered, Some(id));
        }
    }

    fn slice_can_join(
        &self,
        min: VoxelPos,
        max: VoxelPos,
        grow_axis: usize,
        seed: VoxelPos,
        voxel_chunk: &VoxelChunk,
    ) -> bool {
        let mut slice_min = min;
        let mut slice_max = max;
        match grow_axis {
            0 => {
                slice_min.x = max.x + 1;
                slice_max.x = max.x + 1;
            }
            1 => {
                slice_min.y = max.y + 1;
                slice_max.y = max.y + 1;
            }
            _ => {
                slice_min.z = max.z + 1;
                slice_max.z = max.z + 1;
            }
        }

        for y in slice_min.y..=slice_max.y {
            for z in slice_min.z..=slice_max.z {
                for x in slice_min.x..=slice_max.x {
                    if !voxel_chunk.is_valid_voxel(x, y, z) {
                        return false;
                    }
                    let candidate = VoxelPos::new(x, y, z);
                    if self.entries.at(candidate).is_some() {
                        return false;
                    }
                    if !voxel_needs_box(voxel_chunk, candidate) {
                        return false;
                    }
                    if !boxes_can_combine(voxel_chunk, seed, candidate, grow_axis) {
                        return false;
                    }
                }
            }
        }
        true
    }
}

/// Whether this voxel contributes any collision volume. Air contributes none
/// unless it carries a sensor decorator (trigger or transition), which still
/// needs its own box for the physics region.
fn voxel_needs_box(chunk: &VoxelChunk, pos: VoxelPos) -> bool {
    let shape = chunk.shape_def(chunk.shape_def_id(pos.x, pos.y, pos.z));
    if !shape.mesh.empty {
        return true;
    }
    has_sensor_decorator(chunk, pos)
}

fn has_sensor_decorator(chunk: &VoxelChunk, pos: VoxelPos) -> bool {
    let trigger_needs_sensor = chunk
        .try_get_trigger_def_id(pos.x, pos.y, pos.z)
        .is_some_and(|id| chunk.trigger_def(id).affects_physics());
    trigger_needs_sensor
        || chunk
            .try_get_transition_def_id(pos.x, pos.y, pos.z)
            .is_some()
}

/// Merge rule for collision boxes. Trigger/lock/door voxels and fading voxels
/// keep a standalone box so their body stays individually addressable (an open
/// door or fading wall toggles only its own collider); transition voxels merge
/// when they share the same transition; a partial box shape only extends along
/// an axis it tiles.
fn boxes_can_combine(chunk: &VoxelChunk, a: VoxelPos, b: VoxelPos, grow_axis: usize) -> bool {
    let shape_id = chunk.shape_def_id(a.x, a.y, a.z);
    if shape_id != chunk.shape_def_id(b.x, b.y, b.z) {
        return false;
    }
    if !chunk.shape_def(shape_id).allows_adjacent_face_combining {
        return false;
    }
    if chunk.traits_def_id(a.x, a.y, a.z) != chunk.traits_def_id(b.x, b.y, b.z) {
        return false;
    }
    if is_standalone(chunk, a) || is_standalone(chunk, b) {
        return false;
    }
    if chunk.try_get_transition_def_id(a.x, a.y, a.z)
        != chunk.try_get_transition_def_id(b.x, b.y, b.z)
    {
        return false;
    }
    let ShapeGeometry::Box(shape_box) = chunk.shape_def(shape_id).geometry;
    box_tiles_along_axis(&shape_box, grow_axis)
}

fn is_standalone(chunk: &VoxelChunk, pos: VoxelPos) -> bool {
    chunk.try_get_trigger_def_id(pos.x, pos.y, pos.z).is_some()
        || chunk.try_get_lock_def_id(pos.x, pos.y, pos.z).is_some()
        || chunk.try_get_door_def_id(pos.x, pos.y, pos.z).is_some()
        || crate::face_combine::is_fading(chunk, pos)
}

fn box_tiles_along_axis(shape_box: &BoxShape, grow_axis: usize) -> bool {
    if shape_box.y_rotation != 0.0 {
        return false;
    }
    match grow_axis {
        0 => shape_box.width == 1.0,
        1 => shape_box.height == 1.0 && shape_box.y_offset == 0.0,
        _ => shape_box.depth == 1.0,
    }
}
