//! Authoritative voxel grid: de-duplicated definition tables, per-voxel IDs,
//! sparse decorators, animation instances, and per-tick dirty tracking.
#![forbid(unsafe_code)]

pub mod defs;
pub mod insts;

use std::collections::HashMap;

use karst_chunk::{CHUNK_DEPTH, CHUNK_WIDTH, ChunkGrid, ChunkHeader, ManagedChunk};
use karst_geom::{ChunkPos, VoxelPos};

use crate::defs::{
    AIR_SHAPE_DEF_ID, AIR_TEXTURE_DEF_ID, AIR_TRAITS_DEF_ID, ChasmDef, ChasmDefId, DoorDef,
    DoorDefId, LockDef, LockDefId, ShapeDef, ShapeDefId, TextureDef, TextureDefId, TraitsDef,
    TraitsDefId, TransitionDef, TransitionDefId, TriggerDef, TriggerDefId,
};
use crate::insts::{ChasmWallInst, DoorAnimInst, DoorVisInst, FadeAnimInst, TriggerInst};

/// Category of change notification. Downstream systems subscribe to the
/// category they care about; the lists are cleared at end-of-frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DirtyKind {
    Shape,
    FaceActivation,
    DoorAnim,
    DoorVis,
    FadeAnim,
}

impl DirtyKind {
    #[inline]
    fn bit(self) -> u8 {
        match self {
            DirtyKind::Shape => 1 << 0,
            DirtyKind::FaceActivation => 1 << 1,
            DirtyKind::DoorAnim => 1 << 2,
            DirtyKind::DoorVis => 1 << 3,
            DirtyKind::FadeAnim => 1 << 4,
        }
    }
}

/// Single source of truth for "what is at this voxel" within one chunk.
///
/// Definitions are append-only value records shared by many voxels; callers
/// deduplicate through a transient lookup map while populating (a repeated
/// `add_*_def` wastes table space but is not a correctness bug). All grids are
/// sized in `init(position, height)` and wiped in `clear()`.
#[derive(Default)]
pub struct VoxelChunk {
    header: ChunkHeader,

    shape_defs: Vec<ShapeDef>,
    texture_defs: Vec<TextureDef>,
    traits_defs: Vec<TraitsDef>,
    transition_defs: Vec<TransitionDef>,
    trigger_defs: Vec<TriggerDef>,
    lock_defs: Vec<LockDef>,
    door_defs: Vec<DoorDef>,
    chasm_defs: Vec<ChasmDef>,

    shape_def_ids: ChunkGrid<ShapeDefId>,
    texture_def_ids: ChunkGrid<TextureDefId>,
    traits_def_ids: ChunkGrid<TraitsDefId>,

    floor_replacement_shape_def_id: ShapeDefId,
    floor_replacement_texture_def_id: TextureDefId,
    floor_replacement_traits_def_id: TraitsDefId,
    floor_replacement_chasm_def_id: Option<ChasmDefId>,

    // Dirty voxels this frame, deduplicated per category via the mask grid.
    dirty_masks: ChunkGrid<u8>,
    dirty_shape: Vec<VoxelPos>,
    dirty_face_activation: Vec<VoxelPos>,
    dirty_door_anim: Vec<VoxelPos>,
    dirty_door_vis: Vec<VoxelPos>,
    dirty_fade_anim: Vec<VoxelPos>,

    // Sparse decorators; most voxels have none.
    transition_def_indices: HashMap<VoxelPos, TransitionDefId>,
    trigger_def_indices: HashMap<VoxelPos, TriggerDefId>,
    lock_def_indices: HashMap<VoxelPos, LockDefId>,
    door_def_indices: HashMap<VoxelPos, DoorDefId>,
    chasm_def_indices: HashMap<VoxelPos, ChasmDefId>,

    door_anim_insts: Vec<DoorAnimInst>,
    fade_anim_insts: Vec<FadeAnimInst>,
    door_vis_insts: Vec<DoorVisInst>,
    trigger_insts: Vec<TriggerInst>,
    chasm_wall_insts: Vec<ChasmWallInst>,

    // Instances finished this frame; removed in clean_up() so same-frame
    // readers of the dirty lists still find valid data.
    destroyed_door_anim_positions: Vec<VoxelPos>,
    destroyed_fade_anim_positions: Vec<VoxelPos>,
}

impl ManagedChunk for VoxelChunk {
    fn init(&mut self, position: ChunkPos, height: i32) {
        self.header.init(position, height);

        // Definition 0 (air) is usable immediately; all default IDs point to it.
        self.shape_defs.push(ShapeDef::AIR);
        self.texture_defs.push(TextureDef::AIR);
        self.traits_defs.push(TraitsDef::Air);

        self.shape_def_ids
            .init(CHUNK_WIDTH, height, CHUNK_DEPTH, AIR_SHAPE_DEF_ID);
        self.texture_def_ids
            .init(CHUNK_WIDTH, height, CHUNK_DEPTH, AIR_TEXTURE_DEF_ID);
        self.traits_def_ids
            .init(CHUNK_WIDTH, height, CHUNK_DEPTH, AIR_TRAITS_DEF_ID);

        self.floor_replacement_shape_def_id = AIR_SHAPE_DEF_ID;
        self.floor_replacement_texture_def_id = AIR_TEXTURE_DEF_ID;
        self.floor_replacement_traits_def_id = AIR_TRAITS_DEF_ID;
        self.floor_replacement_chasm_def_id = None;

        self.dirty_masks.init(CHUNK_WIDTH, height, CHUNK_DEPTH, 0);
        let voxel_count = (CHUNK_WIDTH * height * CHUNK_DEPTH) as usize;
        self.dirty_shape.reserve(voxel_count);
    }

    fn position(&self) -> ChunkPos {
        self.header.position
    }

    fn height(&self) -> i32 {
        self.header.height
    }

    fn clear(&mut self) {
        self.header.clear();
        self.shape_defs.clear();
        self.texture_defs.clear();
        self.traits_defs.clear();
        self.transition_defs.clear();
        self.trigger_defs.clear();
        self.lock_defs.clear();
        self.door_defs.clear();
        self.chasm_defs.clear();
        self.shape_def_ids.clear();
        self.texture_def_ids.clear();
        self.traits_def_ids.clear();
        self.floor_replacement_chasm_def_id = None;
        self.dirty_masks.clear();
        self.dirty_shape.clear();
        self.dirty_face_activation.clear();
        self.dirty_door_anim.clear();
        self.dirty_door_vis.clear();
        self.dirty_fade_anim.clear();
        self.transition_def_indices.clear();
        self.trigger_def_indices.clear();
        self.lock_def_indices.clear();
        self.door_def_indices.clear();
        self.chasm_def_indices.clear();
        self.door_anim_insts.clear();
        self.fade_anim_insts.clear();
        self.door_vis_insts.clear();
        self.trigger_insts.clear();
        self.chasm_wall_insts.clear();
        self.destroyed_door_anim_positions.clear();
        self.destroyed_fade_anim_positions.clear();
    }
}

impl VoxelChunk {
    #[inline]
    pub fn is_valid_voxel(&self, x: i32, y: i32, z: i32) -> bool {
        self.shape_def_ids.is_valid(x, y, z)
    }

    // --- definition tables ---

    pub fn shape_def_count(&self) -> usize {
        self.shape_defs.len()
    }

    pub fn texture_def_count(&self) -> usize {
        self.texture_defs.len()
    }

    pub fn traits_def_count(&self) -> usize {
        self.traits_defs.len()
    }

    pub fn transition_def_count(&self) -> usize {
        self.transition_defs.len()
    }

    pub fn trigger_def_count(&self) -> usize {
        self.trigger_defs.len()
    }

    pub fn lock_def_count(&self) -> usize {
        self.lock_defs.len()
    }

    pub fn door_def_count(&self) -> usize {
        self.door_defs.len()
    }

    pub fn chasm_def_count(&self) -> usize {
        self.chasm_defs.len()
    }

    pub fn shape_def(&self, id: ShapeDefId) -> &ShapeDef {
        &self.shape_defs[id as usize]
    }

    pub fn texture_def(&self, id: TextureDefId) -> &TextureDef {
        &self.texture_defs[id as usize]
    }

    pub fn traits_def(&self, id: TraitsDefId) -> &TraitsDef {
        &self.traits_defs[id as usize]
    }

    pub fn transition_def(&self, id: TransitionDefId) -> &TransitionDef {
        &self.transition_defs[id as usize]
    }

    pub fn trigger_def(&self, id: TriggerDefId) -> &TriggerDef {
        &self.trigger_defs[id as usize]
    }

    pub fn lock_def(&self, id: LockDefId) -> &LockDef {
        &self.lock_defs[id as usize]
    }

    pub fn door_def(&self, id: DoorDefId) -> &DoorDef {
        &self.door_defs[id as usize]
    }

    pub fn chasm_def(&self, id: ChasmDefId) -> &ChasmDef {
        &self.chasm_defs[id as usize]
    }

    pub fn add_shape_def(&mut self, def: ShapeDef) -> ShapeDefId {
        let id = self.shape_defs.len() as ShapeDefId;
        self.shape_defs.push(def);
        id
    }

    pub fn add_texture_def(&mut self, def: TextureDef) -> TextureDefId {
        let id = self.texture_defs.len() as TextureDefId;
        self.texture_defs.push(def);
        id
    }

    pub fn add_traits_def(&mut self, def: TraitsDef) -> TraitsDefId {
        let id = self.traits_defs.len() as TraitsDefId;
        self.traits_defs.push(def);
        id
    }

    pub fn add_transition_def(&mut self, def: TransitionDef) -> TransitionDefId {
        let id = self.transition_defs.len() as TransitionDefId;
        self.transition_defs.push(def);
        id
    }

    pub fn add_trigger_def(&mut self, def: TriggerDef) -> TriggerDefId {
        let id = self.trigger_defs.len() as TriggerDefId;
        self.trigger_defs.push(def);
        id
    }

    pub fn add_lock_def(&mut self, def: LockDef) -> LockDefId {
        let id = self.lock_defs.len() as LockDefId;
        self.lock_defs.push(def);
        id
    }

    pub fn add_door_def(&mut self, def: DoorDef) -> DoorDefId {
        let id = self.door_defs.len() as DoorDefId;
        self.door_defs.push(def);
        id
    }

    pub fn add_chasm_def(&mut self, def: ChasmDef) -> ChasmDefId {
        let id = self.chasm_defs.len() as ChasmDefId;
        self.chasm_defs.push(def);
        id
    }

    // --- per-voxel IDs ---

    #[inline]
    pub fn shape_def_id(&self, x: i32, y: i32, z: i32) -> ShapeDefId {
        *self.shape_def_ids.get(x, y, z)
    }

    #[inline]
    pub fn texture_def_id(&self, x: i32, y: i32, z: i32) -> TextureDefId {
        *self.texture_def_ids.get(x, y, z)
    }

    #[inline]
    pub fn traits_def_id(&self, x: i32, y: i32, z: i32) -> TraitsDefId {
        *self.traits_def_ids.get(x, y, z)
    }

    /// Reassigns the shape at a voxel. Enqueues a shape-dirty notification
    /// when the ID actually changed since downstream geometry depends on it.
    pub fn set_shape_def_id(&mut self, x: i32, y: i32, z: i32, id: ShapeDefId) {
        debug_assert!((id as usize) < self.shape_defs.len());
        let old = *self.shape_def_ids.get(x, y, z);
        self.shape_def_ids.set(x, y, z, id);
        if old != id {
            self.mark_dirty(VoxelPos::new(x, y, z), DirtyKind::Shape);
        }
    }

    pub fn set_texture_def_id(&mut self, x: i32, y: i32, z: i32, id: TextureDefId) {
        debug_assert!((id as usize) < self.texture_defs.len());
        self.texture_def_ids.set(x, y, z, id);
    }

    pub fn set_traits_def_id(&mut self, x: i32, y: i32, z: i32, id: TraitsDefId) {
        debug_assert!((id as usize) < self.traits_defs.len());
        self.traits_def_ids.set(x, y, z, id);
    }

    // --- floor replacement (applied when a fading floor voxel finishes) ---

    pub fn floor_replacement_shape_def_id(&self) -> ShapeDefId {
        self.floor_replacement_shape_def_id
    }

    pub fn floor_replacement_texture_def_id(&self) -> TextureDefId {
        self.floor_replacement_texture_def_id
    }

    pub fn floor_replacement_traits_def_id(&self) -> TraitsDefId {
        self.floor_replacement_traits_def_id
    }

    pub fn floor_replacement_chasm_def_id(&self) -> Option<ChasmDefId> {
        self.floor_replacement_chasm_def_id
    }

    pub fn set_floor_replacement_shape_def_id(&mut self, id: ShapeDefId) {
        self.floor_replacement_shape_def_id = id;
    }

    pub fn set_floor_replacement_texture_def_id(&mut self, id: TextureDefId) {
        self.floor_replacement_texture_def_id = id;
    }

    pub fn set_floor_replacement_traits_def_id(&mut self, id: TraitsDefId) {
        self.floor_replacement_traits_def_id = id;
    }

    pub fn set_floor_replacement_chasm_def_id(&mut self, id: ChasmDefId) {
        self.floor_replacement_chasm_def_id = Some(id);
    }

    // --- sparse decorators ---

    pub fn try_get_transition_def_id(&self, x: i32, y: i32, z: i32) -> Option<TransitionDefId> {
        self.transition_def_indices
            .get(&VoxelPos::new(x, y, z))
            .copied()
    }

    pub fn try_get_trigger_def_id(&self, x: i32, y: i32, z: i32) -> Option<TriggerDefId> {
        self.trigger_def_indices
            .get(&VoxelPos::new(x, y, z))
            .copied()
    }

    pub fn try_get_lock_def_id(&self, x: i32, y: i32, z: i32) -> Option<LockDefId> {
        self.lock_def_indices.get(&VoxelPos::new(x, y, z)).copied()
    }

    pub fn try_get_door_def_id(&self, x: i32, y: i32, z: i32) -> Option<DoorDefId> {
        self.door_def_indices.get(&VoxelPos::new(x, y, z)).copied()
    }

    pub fn try_get_chasm_def_id(&self, x: i32, y: i32, z: i32) -> Option<ChasmDefId> {
        self.chasm_def_indices.get(&VoxelPos::new(x, y, z)).copied()
    }

    pub fn add_transition_def_position(&mut self, id: TransitionDefId, pos: VoxelPos) {
        debug_assert!((id as usize) < self.transition_defs.len());
        assert!(self.is_valid_voxel(pos.x, pos.y, pos.z));
        self.transition_def_indices.insert(pos, id);
    }

    pub fn add_trigger_def_position(&mut self, id: TriggerDefId, pos: VoxelPos) {
        debug_assert!((id as usize) < self.trigger_defs.len());
        assert!(self.is_valid_voxel(pos.x, pos.y, pos.z));
        self.trigger_def_indices.insert(pos, id);
    }

    pub fn add_lock_def_position(&mut self, id: LockDefId, pos: VoxelPos) {
        debug_assert!((id as usize) < self.lock_defs.len());
        assert!(self.is_valid_voxel(pos.x, pos.y, pos.z));
        self.lock_def_indices.insert(pos, id);
    }

    /// Registers a door at the voxel. Doors always track per-face visibility,
    /// so this also creates the voxel's visibility instance.
    pub fn add_door_def_position(&mut self, id: DoorDefId, pos: VoxelPos) {
        debug_assert!((id as usize) < self.door_defs.len());
        assert!(self.is_valid_voxel(pos.x, pos.y, pos.z));
        self.door_def_indices.insert(pos, id);
        if self
            .try_get_door_vis_inst_index(pos.x, pos.y, pos.z)
            .is_none()
        {
            self.add_door_vis_inst(DoorVisInst::new(pos));
        }
    }

    pub fn add_chasm_def_position(&mut self, id: ChasmDefId, pos: VoxelPos) {
        debug_assert!((id as usize) < self.chasm_defs.len());
        assert!(self.is_valid_voxel(pos.x, pos.y, pos.z));
        self.chasm_def_indices.insert(pos, id);
    }

    // --- dirty lists ---

    pub fn dirty_shape_positions(&self) -> &[VoxelPos] {
        &self.dirty_shape
    }

    pub fn dirty_face_activation_positions(&self) -> &[VoxelPos] {
        &self.dirty_face_activation
    }

    pub fn dirty_door_anim_positions(&self) -> &[VoxelPos] {
        &self.dirty_door_anim
    }

    pub fn dirty_door_vis_positions(&self) -> &[VoxelPos] {
        &self.dirty_door_vis
    }

    pub fn dirty_fade_anim_positions(&self) -> &[VoxelPos] {
        &self.dirty_fade_anim
    }

    /// Enqueues a face-activation notification (chasm wall state changed,
    /// possibly driven by a neighbor chunk edit through the manager).
    pub fn mark_face_activation_dirty(&mut self, pos: VoxelPos) {
        assert!(self.is_valid_voxel(pos.x, pos.y, pos.z));
        self.mark_dirty(pos, DirtyKind::FaceActivation);
    }

    pub fn mark_door_vis_dirty(&mut self, pos: VoxelPos) {
        assert!(self.is_valid_voxel(pos.x, pos.y, pos.z));
        self.mark_dirty(pos, DirtyKind::DoorVis);
    }

    fn mark_dirty(&mut self, pos: VoxelPos, kind: DirtyKind) {
        let mask = self.dirty_masks.get_mut(pos.x, pos.y, pos.z);
        let bit = kind.bit();
        if *mask & bit != 0 {
            return;
        }
        *mask |= bit;
        let list = match kind {
            DirtyKind::Shape => &mut self.dirty_shape,
            DirtyKind::FaceActivation => &mut self.dirty_face_activation,
            DirtyKind::DoorAnim => &mut self.dirty_door_anim,
            DirtyKind::DoorVis => &mut self.dirty_door_vis,
            DirtyKind::FadeAnim => &mut self.dirty_fade_anim,
        };
        list.push(pos);
    }

    // --- instances ---

    pub fn door_anim_insts(&self) -> &[DoorAnimInst] {
        &self.door_anim_insts
    }

    pub fn door_anim_insts_mut(&mut self) -> &mut [DoorAnimInst] {
        &mut self.door_anim_insts
    }

    pub fn try_get_door_anim_inst_index(&self, x: i32, y: i32, z: i32) -> Option<usize> {
        let pos = VoxelPos::new(x, y, z);
        self.door_anim_insts.iter().position(|inst| inst.pos == pos)
    }

    pub fn add_door_anim_inst(&mut self, inst: DoorAnimInst) {
        debug_assert!(
            self.try_get_door_anim_inst_index(inst.pos.x, inst.pos.y, inst.pos.z)
                .is_none()
        );
        self.door_anim_insts.push(inst);
        self.mark_dirty(inst.pos, DirtyKind::DoorAnim);
    }

    /// Starts (or restarts) the open animation for the door at this voxel.
    pub fn open_door(&mut self, pos: VoxelPos, speed: f32) {
        if let Some(i) = self.try_get_door_anim_inst_index(pos.x, pos.y, pos.z) {
            self.door_anim_insts[i].state = insts::DoorAnimState::Opening;
            // A door reopened the same frame it finished closing survives.
            self.destroyed_door_anim_positions.retain(|&p| p != pos);
            self.mark_dirty(pos, DirtyKind::DoorAnim);
        } else {
            self.add_door_anim_inst(DoorAnimInst::new_opening(pos, speed));
        }
    }

    pub fn close_door(&mut self, pos: VoxelPos) {
        if let Some(i) = self.try_get_door_anim_inst_index(pos.x, pos.y, pos.z) {
            self.door_anim_insts[i].begin_closing();
            self.mark_dirty(pos, DirtyKind::DoorAnim);
        }
    }

    pub fn fade_anim_insts(&self) -> &[FadeAnimInst] {
        &self.fade_anim_insts
    }

    pub fn try_get_fade_anim_inst_index(&self, x: i32, y: i32, z: i32) -> Option<usize> {
        let pos = VoxelPos::new(x, y, z);
        self.fade_anim_insts.iter().position(|inst| inst.pos == pos)
    }

    pub fn add_fade_anim_inst(&mut self, inst: FadeAnimInst) {
        debug_assert!(
            self.try_get_fade_anim_inst_index(inst.pos.x, inst.pos.y, inst.pos.z)
                .is_none()
        );
        self.fade_anim_insts.push(inst);
        self.mark_dirty(inst.pos, DirtyKind::FadeAnim);
    }

    pub fn door_vis_insts(&self) -> &[DoorVisInst] {
        &self.door_vis_insts
    }

    pub fn door_vis_insts_mut(&mut self) -> &mut [DoorVisInst] {
        &mut self.door_vis_insts
    }

    pub fn try_get_door_vis_inst_index(&self, x: i32, y: i32, z: i32) -> Option<usize> {
        let pos = VoxelPos::new(x, y, z);
        self.door_vis_insts.iter().position(|inst| inst.pos == pos)
    }

    pub fn add_door_vis_inst(&mut self, inst: DoorVisInst) {
        debug_assert!(
            self.try_get_door_vis_inst_index(inst.pos.x, inst.pos.y, inst.pos.z)
                .is_none()
        );
        let pos = inst.pos;
        self.door_vis_insts.push(inst);
        self.mark_dirty(pos, DirtyKind::DoorVis);
    }

    pub fn trigger_insts(&self) -> &[TriggerInst] {
        &self.trigger_insts
    }

    pub fn try_get_trigger_inst_index(&self, x: i32, y: i32, z: i32) -> Option<usize> {
        let pos = VoxelPos::new(x, y, z);
        self.trigger_insts.iter().position(|inst| inst.pos == pos)
    }

    pub fn add_trigger_inst(&mut self, inst: TriggerInst) {
        debug_assert!(
            self.try_get_trigger_inst_index(inst.pos.x, inst.pos.y, inst.pos.z)
                .is_none()
        );
        self.trigger_insts.push(inst);
    }

    pub fn chasm_wall_insts(&self) -> &[ChasmWallInst] {
        &self.chasm_wall_insts
    }

    pub fn chasm_wall_insts_mut(&mut self) -> &mut [ChasmWallInst] {
        &mut self.chasm_wall_insts
    }

    pub fn try_get_chasm_wall_inst_index(&self, x: i32, y: i32, z: i32) -> Option<usize> {
        let pos = VoxelPos::new(x, y, z);
        self.chasm_wall_insts
            .iter()
            .position(|inst| inst.pos == pos)
    }

    pub fn add_chasm_wall_inst(&mut self, inst: ChasmWallInst) {
        debug_assert!(
            self.try_get_chasm_wall_inst_index(inst.pos.x, inst.pos.y, inst.pos.z)
                .is_none()
        );
        let pos = inst.pos;
        self.chasm_wall_insts.push(inst);
        self.mark_dirty(pos, DirtyKind::FaceActivation);
    }

    pub fn remove_chasm_wall_inst(&mut self, pos: VoxelPos) {
        if let Some(i) = self.try_get_chasm_wall_inst_index(pos.x, pos.y, pos.z) {
            self.chasm_wall_insts.remove(i);
            self.mark_dirty(pos, DirtyKind::FaceActivation);
        }
    }

    // --- per-tick simulation ---

    /// Advances door and fade animations by `dt` seconds, marking the
    /// affected voxels dirty. Finished instances go on the destroyed lists
    /// and stay readable until `clean_up`.
    pub fn update(&mut self, dt: f32) {
        for i in 0..self.door_anim_insts.len() {
            let inst = &mut self.door_anim_insts[i];
            let was_animating = inst.is_animating();
            let just_closed = inst.update(dt);
            let pos = inst.pos;
            if was_animating || just_closed {
                self.mark_dirty(pos, DirtyKind::DoorAnim);
            }
            if just_closed {
                self.destroyed_door_anim_positions.push(pos);
            }
        }

        for i in 0..self.fade_anim_insts.len() {
            let inst = &mut self.fade_anim_insts[i];
            if inst.is_done() {
                continue;
            }
            inst.update(dt);
            let pos = inst.pos;
            let done = self.fade_anim_insts[i].is_done();
            self.mark_dirty(pos, DirtyKind::FadeAnim);
            if done {
                self.destroyed_fade_anim_positions.push(pos);
            }
        }
    }

    /// Fade instances that completed this frame; the manager replaces these
    /// voxels (air or floor replacement) before end-of-frame cleanup.
    pub fn destroyed_fade_anim_positions(&self) -> &[VoxelPos] {
        &self.destroyed_fade_anim_positions
    }

    pub fn destroyed_door_anim_positions(&self) -> &[VoxelPos] {
        &self.destroyed_door_anim_positions
    }

    /// End-of-frame cleanup: removes destroyed instances and resets all dirty
    /// state. Must run after every downstream consumer has read the dirty
    /// lists for this tick.
    pub fn clean_up(&mut self) {
        if !self.destroyed_door_anim_positions.is_empty() {
            let destroyed = std::mem::take(&mut self.destroyed_door_anim_positions);
            self.door_anim_insts
                .retain(|inst| !destroyed.contains(&inst.pos));
        }
        if !self.destroyed_fade_anim_positions.is_empty() {
            let destroyed = std::mem::take(&mut self.destroyed_fade_anim_positions);
            self.fade_anim_insts
                .retain(|inst| !destroyed.contains(&inst.pos));
        }

        self.dirty_shape.clear();
        self.dirty_face_activation.clear();
        self.dirty_door_anim.clear();
        self.dirty_door_vis.clear();
        self.dirty_fade_anim.clear();
        self.dirty_masks.fill(0);
    }
}
