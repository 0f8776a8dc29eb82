use karst_chunk::ManagedChunk;
use karst_geom::{ALL_FACINGS, ChunkPos, Facing, VoxelPos};
use karst_surface::{FaceCombineChunk, FaceEnableChunk};
use karst_voxel::VoxelChunk;
use karst_voxel::defs::{ShapeDef, TextureDef, TraitsDef};
use karst_voxel::insts::FadeAnimInst;

const HEIGHT: i32 = 4;

struct Fixture {
    voxels: VoxelChunk,
    faces: FaceEnableChunk,
    combine: FaceCombineChunk,
}

impl Fixture {
    fn new() -> Self {
        let mut voxels = VoxelChunk::default();
        voxels.init(ChunkPos::new(0, 0), HEIGHT);
        let mut faces = FaceEnableChunk::default();
        faces.init(ChunkPos::new(0, 0), HEIGHT);
        let mut combine = FaceCombineChunk::default();
        combine.init(ChunkPos::new(0, 0), HEIGHT);
        Self {
            voxels,
            faces,
            combine,
        }
    }

    /// Fills a w x d rectangle of floor tiles at y=0 and returns its positions.
    fn add_floor(&mut self, w: i32, d: i32) -> Vec<VoxelPos> {
        let shape = self.voxels.add_shape_def(ShapeDef::solid_opaque());
        let traits_id = self.voxels.add_traits_def(TraitsDef::Floor);
        let mut dirty = Vec::new();
        for z in 0..d {
            for x in 0..w {
                self.voxels.set_shape_def_id(x, 0, z, shape);
                self.voxels.set_traits_def_id(x, 0, z, traits_id);
                dirty.push(VoxelPos::new(x, 0, z));
            }
        }
        dirty
    }

    fn rebuild(&mut self, dirty: &[VoxelPos]) {
        self.faces.update(dirty, &self.voxels);
        self.combine.update(dirty, &self.voxels, &self.faces);
    }
}

#[test]
fn uniform_floor_merges_into_one_rectangle() {
    let mut fx = Fixture::new();
    let dirty = fx.add_floor(4, 4);
    fx.rebuild(&dirty);

    assert_eq!(fx.combine.result_count(), 1);
    let result = fx.combine.iter_results().next().unwrap();
    assert_eq!(result.facing, Facing::PosY);
    assert_eq!(result.min, VoxelPos::new(0, 0, 0));
    assert_eq!(result.max, VoxelPos::new(3, 0, 3));
}

#[test]
fn corner_edit_dissolves_and_remerges_deterministically() {
    let mut fx = Fixture::new();
    let dirty = fx.add_floor(4, 4);
    fx.rebuild(&dirty);

    // Retexturing one corner splits the 4x4 rectangle. Greedy growth away
    // from the origin gives a fixed three-way split.
    let other_tex = fx.voxels.add_texture_def(TextureDef { asset_index: 7 });
    fx.voxels.set_texture_def_id(3, 0, 3, other_tex);
    fx.rebuild(&[VoxelPos::new(3, 0, 3)]);

    let mut results: Vec<_> = fx.combine.iter_results().copied().collect();
    results.sort_by_key(|r| r.min);
    assert_eq!(results.len(), 3);
    assert_eq!(
        (results[0].min, results[0].max),
        (VoxelPos::new(0, 0, 0), VoxelPos::new(3, 0, 2))
    );
    assert_eq!(
        (results[1].min, results[1].max),
        (VoxelPos::new(0, 0, 3), VoxelPos::new(2, 0, 3))
    );
    assert_eq!(
        (results[2].min, results[2].max),
        (VoxelPos::new(3, 0, 3), VoxelPos::new(3, 0, 3))
    );
}

#[test]
fn fading_voxel_stays_out_of_merges() {
    let mut fx = Fixture::new();
    let dirty = fx.add_floor(3, 1);
    fx.voxels
        .add_fade_anim_inst(FadeAnimInst::new(VoxelPos::new(1, 0, 0), 1.0));
    fx.rebuild(&dirty);

    // The fading tile is still drawn but as a lone 1x1 rectangle.
    assert_eq!(fx.combine.result_count(), 3);
    for result in fx.combine.iter_results() {
        if result.min == VoxelPos::new(1, 0, 0) {
            assert_eq!(result.max, result.min);
        }
    }
}

#[test]
fn rebuild_with_same_input_is_idempotent() {
    let mut fx = Fixture::new();
    let dirty = fx.add_floor(4, 2);
    fx.rebuild(&dirty);
    let before: Vec<_> = fx.combine.iter_results().copied().collect();

    fx.rebuild(&[VoxelPos::new(1, 0, 1)]);
    let mut after: Vec<_> = fx.combine.iter_results().copied().collect();
    let mut before_sorted = before;
    before_sorted.sort_by_key(|r| (r.min, r.facing.index()));
    after.sort_by_key(|r| (r.min, r.facing.index()));
    assert_eq!(before_sorted, after);
}

#[test]
fn walls_merge_vertically_and_expose_only_enabled_faces() {
    let mut fx = Fixture::new();
    let shape = fx.voxels.add_shape_def(ShapeDef::solid_opaque());
    let traits_id = fx.voxels.add_traits_def(TraitsDef::Wall);
    let mut dirty = Vec::new();
    for y in 0..HEIGHT {
        fx.voxels.set_shape_def_id(5, y, 5, shape);
        fx.voxels.set_traits_def_id(5, y, 5, traits_id);
        dirty.push(VoxelPos::new(5, y, 5));
    }
    fx.rebuild(&dirty);

    // Four lateral column rectangles plus a top and a bottom cap; the faces
    // between stacked wall voxels are disabled and produce nothing.
    assert_eq!(fx.combine.result_count(), 6);
    for result in fx.combine.iter_results() {
        match result.facing {
            Facing::PosY | Facing::NegY => {
                assert_eq!(result.min, result.max);
            }
            _ => {
                assert_eq!(result.min.y, 0);
                assert_eq!(result.max.y, HEIGHT - 1);
            }
        }
    }
}

// Every enabled geometry-producing face belongs to exactly one rectangle.
#[test]
fn results_partition_enabled_faces() {
    let mut fx = Fixture::new();
    let shape = fx.voxels.add_shape_def(ShapeDef::solid_opaque());
    let traits_id = fx.voxels.add_traits_def(TraitsDef::Wall);
    let mut dirty = Vec::new();
    // Irregular blob with holes.
    for (x, y, z) in [
        (0, 0, 0),
        (1, 0, 0),
        (0, 1, 0),
        (2, 0, 0),
        (2, 1, 0),
        (2, 2, 0),
        (0, 0, 2),
        (1, 0, 2),
        (2, 0, 2),
    ] {
        fx.voxels.set_shape_def_id(x, y, z, shape);
        fx.voxels.set_traits_def_id(x, y, z, traits_id);
        dirty.push(VoxelPos::new(x, y, z));
    }
    fx.rebuild(&dirty);

    let mut covered = 0usize;
    for &pos in &dirty {
        for facing in ALL_FACINGS {
            let enabled = fx.faces.is_face_enabled(pos, facing);
            let entry = fx.combine.entry(pos)[facing.index()];
            assert_eq!(entry.is_some(), enabled, "pos {pos:?} facing {facing:?}");
            if let Some(id) = entry {
                let result = fx.combine.result(id);
                assert_eq!(result.facing, facing);
                assert!(result.positions().any(|p| p == pos));
                covered += 1;
            }
        }
    }

    let total: i64 = fx.combine.iter_results().map(|r| r.voxel_count()).sum();
    assert_eq!(total, covered as i64);
}
