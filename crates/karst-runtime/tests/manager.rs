use karst_collision::backend::{PhysicsBackend, PhysicsBodyId};
use karst_geom::{Aabb, ChunkPos, VoxelPos};
use karst_runtime::{VoxelPopulator, WorldChunkManager};
use karst_voxel::VoxelChunk;
use karst_voxel::defs::{ChasmDef, ChasmKind, DoorDef, DoorKind, ShapeDef, TraitsDef};
use karst_voxel::insts::FadeAnimInst;

const HEIGHT: i32 = 4;
const ORIGIN: ChunkPos = ChunkPos { x: 0, z: 0 };

#[derive(Default)]
struct CountingBackend {
    next_id: u64,
    live: std::collections::HashSet<PhysicsBodyId>,
    inserted: std::collections::HashSet<PhysicsBodyId>,
    destroyed_total: usize,
}

impl PhysicsBackend for CountingBackend {
    fn create_body(&mut self, _aabb: Aabb, _is_sensor: bool) -> Option<PhysicsBodyId> {
        let id = PhysicsBodyId(self.next_id);
        self.next_id += 1;
        self.live.insert(id);
        Some(id)
    }

    fn add_bodies(&mut self, ids: &[PhysicsBodyId]) {
        for id in ids {
            assert!(self.live.contains(id));
            self.inserted.insert(*id);
        }
    }

    fn remove_bodies(&mut self, ids: &[PhysicsBodyId]) {
        for id in ids {
            assert!(self.inserted.remove(id), "removing body not in simulation");
        }
    }

    fn destroy_bodies(&mut self, ids: &[PhysicsBodyId]) {
        for id in ids {
            assert!(self.live.remove(id), "destroying unknown body");
            assert!(!self.inserted.contains(id), "destroying inserted body");
            self.destroyed_total += 1;
        }
    }
}

/// Level template applied to every spawned chunk: a full ground floor plus
/// the extra voxels each test lists.
struct TestLevel {
    walls: Vec<VoxelPos>,
    doors: Vec<VoxelPos>,
    chasms: Vec<VoxelPos>,
}

impl TestLevel {
    fn floor_only() -> Self {
        Self {
            walls: Vec::new(),
            doors: Vec::new(),
            chasms: Vec::new(),
        }
    }
}

impl VoxelPopulator for TestLevel {
    fn populate(&mut self, chunk: &mut VoxelChunk) {
        let solid = chunk.add_shape_def(ShapeDef::solid_opaque());
        let floor_traits = chunk.add_traits_def(TraitsDef::Floor);
        let wall_traits = chunk.add_traits_def(TraitsDef::Wall);
        let door_traits = chunk.add_traits_def(TraitsDef::Door);
        let chasm_traits = chunk.add_traits_def(TraitsDef::Chasm {
            kind: ChasmKind::Dry,
        });

        for z in 0..64 {
            for x in 0..64 {
                chunk.set_shape_def_id(x, 0, z, solid);
                chunk.set_traits_def_id(x, 0, z, floor_traits);
            }
        }
        for &pos in &self.walls {
            chunk.set_shape_def_id(pos.x, pos.y, pos.z, solid);
            chunk.set_traits_def_id(pos.x, pos.y, pos.z, wall_traits);
        }
        if !self.doors.is_empty() {
            let door = chunk.add_door_def(DoorDef {
                kind: DoorKind::Swinging,
                open_sound: None,
                close_sound: None,
            });
            for &pos in &self.doors {
                chunk.set_shape_def_id(pos.x, pos.y, pos.z, solid);
                chunk.set_traits_def_id(pos.x, pos.y, pos.z, door_traits);
                chunk.add_door_def_position(door, pos);
            }
        }
        if !self.chasms.is_empty() {
            let chasm = chunk.add_chasm_def(ChasmDef {
                kind: ChasmKind::Dry,
                allows_swimming: false,
                is_damaging: false,
            });
            for &pos in &self.chasms {
                chunk.set_traits_def_id(pos.x, pos.y, pos.z, chasm_traits);
                chunk.add_chasm_def_position(chasm, pos);
            }
        }
    }
}

fn step(
    manager: &mut WorldChunkManager,
    dt: f32,
    level: &mut TestLevel,
    backend: &mut CountingBackend,
) {
    manager.update(dt, &[], &[], level, backend);
    manager.end_frame();
}

#[test]
fn spawned_chunk_builds_merged_bodies() {
    let mut manager = WorldChunkManager::new(HEIGHT);
    let mut level = TestLevel::floor_only();
    let mut backend = CountingBackend::default();

    manager.update(0.0, &[ORIGIN], &[], &mut level, &mut backend);
    manager.end_frame();

    assert_eq!(manager.chunk_count(), 1);
    // The whole ground slab merges into one box, so one body spans it.
    assert_eq!(backend.live.len(), 1);
    assert_eq!(backend.inserted.len(), 1);
    let collision = manager.collision_chunk(ORIGIN).unwrap();
    assert_eq!(
        collision.body_id(VoxelPos::new(0, 0, 0)),
        collision.body_id(VoxelPos::new(63, 0, 63))
    );
    assert!(collision.body_id(VoxelPos::new(0, 0, 0)).is_some());

    // And one top-facing rectangle for rendering.
    let region = manager.draw_region(ORIGIN).unwrap();
    assert_eq!(region.face_combine.result_count(), 1);
}

#[test]
fn door_collider_follows_animation_state() {
    let door_pos = VoxelPos::new(5, 1, 5);
    let mut manager = WorldChunkManager::new(HEIGHT);
    let mut level = TestLevel::floor_only();
    level.doors.push(door_pos);
    let mut backend = CountingBackend::default();

    manager.update(0.0, &[ORIGIN], &[], &mut level, &mut backend);
    manager.end_frame();
    let collision = manager.collision_chunk(ORIGIN).unwrap();
    assert!(collision.is_collider_enabled(5, 1, 5));
    // The door keeps its own body rather than merging into the floor's.
    assert_ne!(
        collision.body_id(door_pos),
        collision.body_id(VoxelPos::new(5, 0, 5))
    );

    manager
        .voxel_chunk_mut(ORIGIN)
        .unwrap()
        .open_door(door_pos, 1.0);
    step(&mut manager, 1.0, &mut level, &mut backend);
    let collision = manager.collision_chunk(ORIGIN).unwrap();
    assert!(!collision.is_collider_enabled(5, 1, 5));

    manager.voxel_chunk_mut(ORIGIN).unwrap().close_door(door_pos);
    step(&mut manager, 1.0, &mut level, &mut backend);
    let collision = manager.collision_chunk(ORIGIN).unwrap();
    assert!(collision.is_collider_enabled(5, 1, 5));
    // The finished animation was cleaned up at end of frame.
    let voxels = manager.voxel_chunk(ORIGIN).unwrap();
    assert!(voxels.try_get_door_anim_inst_index(5, 1, 5).is_none());
}

#[test]
fn finished_fade_replaces_voxel_and_rebuilds() {
    let wall_pos = VoxelPos::new(10, 1, 10);
    let mut manager = WorldChunkManager::new(HEIGHT);
    let mut level = TestLevel::floor_only();
    level.walls.push(wall_pos);
    let mut backend = CountingBackend::default();

    manager.update(0.0, &[ORIGIN], &[], &mut level, &mut backend);
    manager.end_frame();
    let bodies_before = backend.live.len();
    assert_eq!(bodies_before, 2);

    manager
        .voxel_chunk_mut(ORIGIN)
        .unwrap()
        .add_fade_anim_inst(FadeAnimInst::new(wall_pos, 1.0));
    step(&mut manager, 1.0, &mut level, &mut backend);

    let voxels = manager.voxel_chunk(ORIGIN).unwrap();
    assert_eq!(voxels.shape_def_id(10, 1, 10), 0);
    assert!(voxels.try_get_fade_anim_inst_index(10, 1, 10).is_none());
    let collision = manager.collision_chunk(ORIGIN).unwrap();
    assert_eq!(collision.body_id(wall_pos), None);
    assert_eq!(backend.live.len(), 1);
}

#[test]
fn fading_voxel_splits_box_and_releases_collider() {
    let row = [
        VoxelPos::new(9, 1, 10),
        VoxelPos::new(10, 1, 10),
        VoxelPos::new(11, 1, 10),
    ];
    let middle = row[1];
    let mut manager = WorldChunkManager::new(HEIGHT);
    let mut level = TestLevel::floor_only();
    level.walls.extend_from_slice(&row);
    let mut backend = CountingBackend::default();

    manager.update(0.0, &[ORIGIN], &[], &mut level, &mut backend);
    manager.end_frame();
    // Ground slab plus the merged wall row.
    assert_eq!(backend.live.len(), 2);

    // A slow fade on the middle voxel splits the row into three standalone
    // boxes; only the fading one leaves the simulation.
    manager
        .voxel_chunk_mut(ORIGIN)
        .unwrap()
        .add_fade_anim_inst(FadeAnimInst::new(middle, 0.1));
    step(&mut manager, 0.1, &mut level, &mut backend);

    assert_eq!(backend.live.len(), 4);
    let collision = manager.collision_chunk(ORIGIN).unwrap();
    assert!(collision.body_id(middle).is_some());
    assert!(!collision.is_body_inserted(middle));
    assert!(!collision.is_collider_enabled(10, 1, 10));
    assert!(collision.is_collider_enabled(9, 1, 10));
    assert_ne!(collision.body_id(row[0]), collision.body_id(row[2]));

    // Finishing the fade destroys the body and leaves air behind.
    step(&mut manager, 100.0, &mut level, &mut backend);
    let collision = manager.collision_chunk(ORIGIN).unwrap();
    assert_eq!(collision.body_id(middle), None);
    assert_eq!(backend.live.len(), 3);
    assert_eq!(manager.voxel_chunk(ORIGIN).unwrap().shape_def_id(10, 1, 10), 0);
}

#[test]
fn chasm_walls_track_neighbor_edits() {
    let chasm_pos = VoxelPos::new(20, 0, 20);
    let wall_pos = VoxelPos::new(21, 0, 20);
    let mut manager = WorldChunkManager::new(HEIGHT);
    let mut level = TestLevel::floor_only();
    level.chasms.push(chasm_pos);
    let mut backend = CountingBackend::default();

    manager.update(0.0, &[ORIGIN], &[], &mut level, &mut backend);
    manager.end_frame();

    // The chasm floor voxel is walled in by the surrounding ground slab.
    let voxels = manager.voxel_chunk(ORIGIN).unwrap();
    let i = voxels
        .try_get_chasm_wall_inst_index(20, 0, 20)
        .expect("chasm wall instance");
    let inst = voxels.chasm_wall_insts()[i];
    assert!(inst.north && inst.east && inst.south && inst.west);

    // Fading out the east neighbor drops that wall.
    manager
        .voxel_chunk_mut(ORIGIN)
        .unwrap()
        .add_fade_anim_inst(FadeAnimInst::new(wall_pos, 1.0));
    step(&mut manager, 1.0, &mut level, &mut backend);

    let voxels = manager.voxel_chunk(ORIGIN).unwrap();
    let i = voxels.try_get_chasm_wall_inst_index(20, 0, 20).unwrap();
    let inst = voxels.chasm_wall_insts()[i];
    assert!(!inst.east);
    assert!(inst.north && inst.south && inst.west);
}

#[test]
fn recycled_chunk_releases_every_body() {
    let mut manager = WorldChunkManager::new(HEIGHT);
    let mut level = TestLevel::floor_only();
    level.walls.push(VoxelPos::new(3, 1, 3));
    let mut backend = CountingBackend::default();

    manager.update(0.0, &[ORIGIN], &[], &mut level, &mut backend);
    manager.end_frame();
    assert!(!backend.live.is_empty());

    manager.update(0.0, &[], &[ORIGIN], &mut level, &mut backend);
    manager.end_frame();
    assert_eq!(manager.chunk_count(), 0);
    assert!(backend.live.is_empty());
    assert!(backend.inserted.is_empty());

    // Respawning reuses the recycled slots cleanly.
    manager.update(0.0, &[ORIGIN], &[], &mut level, &mut backend);
    manager.end_frame();
    assert_eq!(manager.chunk_count(), 1);
    assert!(!backend.live.is_empty());
}
