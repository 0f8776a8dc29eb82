use karst_chunk::ManagedChunk;
use karst_geom::{ChunkPos, VoxelPos};
use karst_surface::{BoxCombineChunk, FaceCombineChunk, FaceEnableChunk};
use karst_voxel::VoxelChunk;
use karst_voxel::defs::{ShapeDef, TraitsDef};
use proptest::prelude::*;

const REGION: i32 = 4;
const HEIGHT: i32 = 4;

fn build_pattern(occupancy: &[bool]) -> (VoxelChunk, Vec<VoxelPos>) {
    let mut voxels = VoxelChunk::default();
    voxels.init(ChunkPos::new(0, 0), HEIGHT);
    let shape = voxels.add_shape_def(ShapeDef::solid_opaque());
    let traits_id = voxels.add_traits_def(TraitsDef::Wall);

    let mut dirty = Vec::new();
    for (i, &solid) in occupancy.iter().enumerate() {
        let i = i as i32;
        let (x, y, z) = (i % REGION, (i / REGION) % HEIGHT, i / (REGION * HEIGHT));
        if solid {
            voxels.set_shape_def_id(x, y, z, shape);
            voxels.set_traits_def_id(x, y, z, traits_id);
        }
        dirty.push(VoxelPos::new(x, y, z));
    }
    (voxels, dirty)
}

fn occupancy() -> impl Strategy<Value = Vec<bool>> {
    proptest::collection::vec(any::<bool>(), (REGION * HEIGHT * REGION) as usize)
}

proptest! {
    // Merged boxes are disjoint and cover exactly the solid voxels.
    #[test]
    fn box_results_partition_solid_voxels(occ in occupancy()) {
        let (voxels, dirty) = build_pattern(&occ);
        let mut boxes = BoxCombineChunk::default();
        boxes.init(ChunkPos::new(0, 0), HEIGHT);
        boxes.update(&dirty, &voxels);

        let solid_count = occ.iter().filter(|&&s| s).count() as i64;
        let covered: i64 = boxes.iter_results().map(|r| r.voxel_count()).sum();
        prop_assert_eq!(covered, solid_count);

        let mut seen = std::collections::HashSet::new();
        for result in boxes.iter_results() {
            for pos in result.positions() {
                prop_assert!(seen.insert(pos), "box overlap at {:?}", pos);
                prop_assert!(!voxels.shape_def(voxels.shape_def_id(pos.x, pos.y, pos.z)).mesh.empty);
            }
        }
    }

    // Updating again with an arbitrary dirty voxel reproduces the same set.
    #[test]
    fn rebuild_is_idempotent(occ in occupancy(), px in 0..REGION, py in 0..HEIGHT, pz in 0..REGION) {
        let (voxels, dirty) = build_pattern(&occ);
        let mut boxes = BoxCombineChunk::default();
        boxes.init(ChunkPos::new(0, 0), HEIGHT);
        boxes.update(&dirty, &voxels);
        let mut before: Vec<_> = boxes.iter_results().copied().collect();

        boxes.update(&[VoxelPos::new(px, py, pz)], &voxels);
        let mut after: Vec<_> = boxes.iter_results().copied().collect();
        before.sort_by_key(|r| r.min);
        after.sort_by_key(|r| r.min);
        prop_assert_eq!(before, after);
    }

    // A face between two solid voxels is hidden on both sides; a face against
    // air is drawn and belongs to exactly one rectangle.
    #[test]
    fn face_occlusion_is_symmetric(occ in occupancy()) {
        let (voxels, dirty) = build_pattern(&occ);
        let mut faces = FaceEnableChunk::default();
        faces.init(ChunkPos::new(0, 0), HEIGHT);
        faces.update(&dirty, &voxels);
        let mut combine = FaceCombineChunk::default();
        combine.init(ChunkPos::new(0, 0), HEIGHT);
        combine.update(&dirty, &voxels, &faces);

        for &pos in &dirty {
            let solid = !voxels.shape_def(voxels.shape_def_id(pos.x, pos.y, pos.z)).mesh.empty;
            for facing in karst_geom::ALL_FACINGS {
                let adjacent = pos + facing.delta();
                let enabled = faces.is_face_enabled(pos, facing);
                if !solid {
                    prop_assert!(!enabled);
                    continue;
                }
                if voxels.is_valid_voxel(adjacent.x, adjacent.y, adjacent.z) {
                    let adjacent_solid = !voxels
                        .shape_def(voxels.shape_def_id(adjacent.x, adjacent.y, adjacent.z))
                        .mesh
                        .empty;
                    prop_assert_eq!(enabled, !adjacent_solid);
                    if adjacent_solid {
                        // Hidden on the other side too.
                        prop_assert!(!faces.is_face_enabled(adjacent, facing.opposite()));
                    }
                } else {
                    prop_assert!(enabled);
                }
            }
        }
    }
}
