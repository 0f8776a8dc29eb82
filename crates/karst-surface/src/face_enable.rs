//! Per-voxel face occlusion: a face is disabled when the neighboring voxel's
//! touching face is opaque and fully covers the cell boundary.

use karst_chunk::{CHUNK_DEPTH, CHUNK_WIDTH, ChunkGrid, ChunkHeader, ManagedChunk};
use karst_geom::{ALL_FACINGS, ChunkPos, FACE_COUNT, Facing, VoxelPos};
use karst_voxel::VoxelChunk;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FaceEnableEntry {
    enabled_faces: [bool; FACE_COUNT],
}

impl FaceEnableEntry {
    #[inline]
    pub fn is_enabled(&self, facing: Facing) -> bool {
        self.enabled_faces[facing.index()]
    }
}

impl Default for FaceEnableEntry {
    fn default() -> Self {
        // All faces drawn until proven occluded.
        Self {
            enabled_faces: [true; FACE_COUNT],
        }
    }
}

/// Tracks which faces of each voxel need drawing at all. Purely derived
/// state; `update` recomputes the entries for the given dirty voxels. The
/// caller is responsible for also passing the in-chunk neighbors of edited
/// voxels since an edit changes the occlusion of the voxels around it.
///
/// Voxels on the chunk boundary keep their outward faces enabled; cross-chunk
/// occlusion is out of scope here, so the boundary stays conservative.
#[derive(Default)]
pub struct FaceEnableChunk {
    header: ChunkHeader,
    entries: ChunkGrid<FaceEnableEntry>,
}

impl ManagedChunk for FaceEnableChunk {
    fn init(&mut self, position: ChunkPos, height: i32) {
        self.header.init(position, height);
        self.entries
            .init(CHUNK_WIDTH, height, CHUNK_DEPTH, FaceEnableEntry::default());
    }

    fn position(&self) -> ChunkPos {
        self.header.position
    }

    fn height(&self) -> i32 {
        self.header.height
    }

    fn clear(&mut self) {
        self.header.clear();
        self.entries.clear();
    }
}

impl FaceEnableChunk {
    #[inline]
    pub fn entry(&self, pos: VoxelPos) -> &FaceEnableEntry {
        self.entries.at(pos)
    }

    #[inline]
    pub fn is_face_enabled(&self, pos: VoxelPos, facing: Facing) -> bool {
        self.entries.at(pos).is_enabled(facing)
    }

    pub fn update(&mut self, dirty_positions: &[VoxelPos], voxel_chunk: &VoxelChunk) {
        for &pos in dirty_positions {
            let mut entry = FaceEnableEntry::default();
            let shape = voxel_chunk.shape_def(voxel_chunk.shape_def_id(pos.x, pos.y, pos.z));
            if shape.mesh.empty {
                entry.enabled_faces = [false; FACE_COUNT];
                self.entries.set_at(pos, entry);
                continue;
            }

            for facing in ALL_FACINGS {
                if !shape.allows_internal_face_removal {
                    continue;
                }
                // Partial or see-through faces are never culled, whatever the
                // neighbor looks like.
                if !shape.mesh.has_full_coverage(facing) || !shape.mesh.is_face_opaque(facing) {
                    continue;
                }
                let adjacent = pos + facing.delta();
                if !voxel_chunk.is_valid_voxel(adjacent.x, adjacent.y, adjacent.z) {
                    continue;
                }
                let adjacent_shape = voxel_chunk
                    .shape_def(voxel_chunk.shape_def_id(adjacent.x, adjacent.y, adjacent.z));
                let touching = facing.opposite();
                if adjacent_shape.mesh.is_face_opaque(touching)
                    && adjacent_shape.mesh.has_full_coverage(touching)
                {
                    entry.enabled_faces[facing.index()] = false;
                }
            }
            self.entries.set_at(pos, entry);
        }
    }
}
