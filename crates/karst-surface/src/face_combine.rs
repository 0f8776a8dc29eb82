//! Greedy merging of coplanar voxel faces into larger rectangles. Results
//! are incremental: edits dissolve only the rectangles they touch and the
//! freed cells are re-merged the same pass.

use karst_chunk::{CHUNK_DEPTH, CHUNK_WIDTH, ChunkGrid, ChunkHeader, ManagedChunk};
use karst_geom::{ALL_FACINGS, ChunkPos, FACE_COUNT, Facing, VoxelPos};
use karst_voxel::VoxelChunk;
use karst_voxel::defs::VoxelKind;

use crate::face_enable::FaceEnableChunk;
use crate::pool::{SlotId, SlotPool};

/// Axis-aligned rectangle of identical faces, all with the given facing.
/// `min`/`max` are inclusive voxel bounds; the rectangle is one voxel thick
/// along the facing's axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FaceCombineResult {
    pub min: VoxelPos,
    pub max: VoxelPos,
    pub facing: Facing,
}

impl FaceCombineResult {
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

type FaceEntries = [Option<SlotId>; FACE_COUNT];

/// One rectangle set per chunk. Every enabled, geometry-producing face is
/// covered by exactly one result; faces that can't merge get a 1x1x1 result.
#[derive(Default)]
pub struct FaceCombineChunk {
    header: ChunkHeader,
    results: SlotPool<FaceCombineResult>,
    entries: ChunkGrid<FaceEntries>,
    scratch_dirty: Vec<VoxelPos>,
}

impl ManagedChunk for FaceCombineChunk {
    fn init(&mut self, position: ChunkPos, height: i32) {
        self.header.init(position, height);
        let voxel_count = (CHUNK_WIDTH * height * CHUNK_DEPTH) as usize;
        // Worst case is a checkerboard of cubes: six 1x1 faces on half the voxels.
        self.results.init(voxel_count * 3);
        self.entries
            .init(CHUNK_WIDTH, height, CHUNK_DEPTH, [None; FACE_COUNT]);
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

impl FaceCombineChunk {
    #[inline]
    pub fn entry(&self, pos: VoxelPos) -> &FaceEntries {
        self.entries.at(pos)
    }

    pub fn result(&self, id: SlotId) -> &FaceCombineResult {
        self.results.get(id)
    }

    pub fn result_count(&self) -> usize {
        self.results.live_count()
    }

    pub fn iter_results(&self) -> impl Iterator<Item = &FaceCombineResult> {
        self.results.iter()
    }

    pub fn update(
        &mut self,
        dirty_positions: &[VoxelPos],
        voxel_chunk: &VoxelChunk,
        face_enable: &FaceEnableChunk,
    ) {
        self.scratch_dirty.clear();
        self.scratch_dirty.extend_from_slice(dirty_positions);

        // Dissolve every rectangle touching a dirty voxel. Cells the
        // rectangle covered go back on the dirty list so they re-merge below.
        // Only the input voxels dissolve their rectangles; cells freed here
        // keep their results on other facings.
        for i in 0..dirty_positions.len() {
            let pos = dirty_positions[i];
            let entry = *self.entries.at(pos);
            for id in entry.into_iter().flatten() {
                let result = self.results.free(id);
                let face_index = result.facing.index();
                for covered in result.positions() {
                    self.entries.at_mut(covered)[face_index] = None;
                    self.scratch_dirty.push(covered);
                }
            }
        }

        // Deterministic order: lexicographic for tie-breaks, then nearest to
        // the chunk origin first so rectangles grow away from it.
        self.scratch_dirty.sort_unstable();
        self.scratch_dirty.dedup();
        self.scratch_dirty.sort_by_key(|pos| pos.length_sq());

        for i in 0..self.scratch_dirty.len() {
            let pos = self.scratch_dirty[i];
            for facing in ALL_FACINGS {
                self.try_build_result(pos, facing, voxel_chunk, face_enable);
            }
        }
    }

    fn try_build_result(
        &mut self,
        pos: VoxelPos,
        facing: Facing,
        voxel_chunk: &VoxelChunk,
        face_enable: &FaceEnableChunk,
    ) {
        let face_index = facing.index();
        if self.entries.at(pos)[face_index].is_some() {
            return;
        }
        if !face_enable.is_face_enabled(pos, facing) {
            return;
        }
        let kind = voxel_chunk
            .traits_def(voxel_chunk.traits_def_id(pos.x, pos.y, pos.z))
            .kind();
        if !kind.mesh_covers_facing(facing) {
            return;
        }

        let min = pos;
        let mut max = pos;
        if faces_can_combine(voxel_chunk, pos, pos, facing) {
            // Grow along both in-plane axes, lower axis first. An axis is
            // done the first time its next slice is rejected.
            let axis = facing.axis_index();
            let plane_axes: [usize; 2] = match axis {
                0 => [1, 2],
                1 => [0, 2],
                _ => [0, 1],
            };
            for grow_axis in plane_axes {
                loop {
                    if !self.slice_can_join(min, max, grow_axis, pos, facing, voxel_chunk, face_enable) {
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

        let Some(id) = self.results.alloc(FaceCombineResult { min, max, facing }) else {
            log::error!(
                "face combine pool exhausted in chunk ({}, {})",
                self.header.position.x,
                self.header.position.z
            );
            return;
        };
        for covered in self.results.get(id).positions() {
            self.entries.at_mut(covered)[face_index] = Some(id);
        }
    }

    /// Tests the one-voxel-thick slice adjacent to `max` along `grow_axis`:
    /// every cell must be unclaimed, enabled, and combinable with the seed.
    fn slice_can_join(
        &self,
        min: VoxelPos,
        max: VoxelPos,
        grow_axis: usize,
        seed: VoxelPos,
        facing: Facing,
        voxel_chunk: &VoxelChunk,
        face_enable: &FaceEnableChunk,
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
                    if self.entries.at(candidate)[facing.index()].is_some() {
                        return false;
                    }
                    if !face_enable.is_face_enabled(candidate, facing) {
                        return false;
                    }
                    if !faces_can_combine(voxel_chunk, seed, candidate, facing) {
                        return false;
                    }
                }
            }
        }
        true
    }
}

/// Whether two voxels' faces with the given facing merge into one rectangle.
/// Reflexive; a voxel failing against itself never merges at all.
fn faces_can_combine(
    chunk: &VoxelChunk,
    a: VoxelPos,
    b: VoxelPos,
    facing: Facing,
) -> bool {
    let shape_id = chunk.shape_def_id(a.x, a.y, a.z);
    if shape_id != chunk.shape_def_id(b.x, b.y, b.z) {
        return false;
    }
    if chunk.texture_def_id(a.x, a.y, a.z) != chunk.texture_def_id(b.x, b.y, b.z) {
        return false;
    }
    let traits_id = chunk.traits_def_id(a.x, a.y, a.z);
    if traits_id != chunk.traits_def_id(b.x, b.y, b.z) {
        return false;
    }
    if !chunk.shape_def(shape_id).allows_adjacent_face_combining {
        return false;
    }
    // Fading voxels render at their own opacity and stay 1x1.
    if is_fading(chunk, a) || is_fading(chunk, b) {
        return false;
    }

    let kind = chunk.traits_def(traits_id).kind();
    match kind.combinable_facings() {
        Some(facings) => facings.contains(&facing),
        None => kind == VoxelKind::Chasm && chasm_walls_equal(chunk, a, b),
    }
}

/// A voxel mid-fade; an instance that already finished (awaiting end-of-frame
/// removal) no longer vetoes merging.
pub(crate) fn is_fading(chunk: &VoxelChunk, pos: VoxelPos) -> bool {
    chunk
        .try_get_fade_anim_inst_index(pos.x, pos.y, pos.z)
        .is_some_and(|i| !chunk.fade_anim_insts()[i].is_done())
}

/// Chasm faces merge only between voxels showing the same wall pattern; a
/// missing instance means no walls.
fn chasm_walls_equal(chunk: &VoxelChunk, a: VoxelPos, b: VoxelPos) -> bool {
    let walls = |pos: VoxelPos| {
        chunk
            .try_get_chasm_wall_inst_index(pos.x, pos.y, pos.z)
            .map(|i| {
                let inst = chunk.chasm_wall_insts()[i];
                (inst.north, inst.east, inst.south, inst.west)
            })
            .unwrap_or((false, false, false, false))
    };
    walls(a) == walls(b)
}
