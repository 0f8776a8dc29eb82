//! Per-voxel runtime state instances. These are dense lists on the chunk; a
//! voxel position maps to at most one live instance per category.

use karst_geom::{FACE_COUNT, Facing, VoxelPos};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DoorAnimState {
    Closed,
    Opening,
    Open,
    Closing,
}

/// Animation of one door voxel. Finished close animations are queued for
/// end-of-frame removal rather than erased immediately so same-frame readers
/// of the dirty list still find the instance.
#[derive(Clone, Copy, Debug)]
pub struct DoorAnimInst {
    pub pos: VoxelPos,
    /// Percent-open change per second.
    pub speed: f32,
    pub percent_open: f32,
    pub state: DoorAnimState,
}

impl DoorAnimInst {
    pub fn new_opening(pos: VoxelPos, speed: f32) -> Self {
        Self {
            pos,
            speed,
            percent_open: 0.0,
            state: DoorAnimState::Opening,
        }
    }

    #[inline]
    pub fn is_animating(&self) -> bool {
        matches!(self.state, DoorAnimState::Opening | DoorAnimState::Closing)
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.state == DoorAnimState::Closed
    }

    pub fn begin_closing(&mut self) {
        if self.state != DoorAnimState::Closed {
            self.state = DoorAnimState::Closing;
        }
    }

    /// Advances the animation. Returns true if the door just finished closing
    /// this call (caller queues the instance for end-of-frame removal).
    pub fn update(&mut self, dt: f32) -> bool {
        match self.state {
            DoorAnimState::Opening => {
                self.percent_open = (self.percent_open + self.speed * dt).min(1.0);
                if self.percent_open >= 1.0 {
                    self.state = DoorAnimState::Open;
                }
                false
            }
            DoorAnimState::Closing => {
                self.percent_open = (self.percent_open - self.speed * dt).max(0.0);
                if self.percent_open <= 0.0 {
                    self.state = DoorAnimState::Closed;
                    true
                } else {
                    false
                }
            }
            DoorAnimState::Open | DoorAnimState::Closed => false,
        }
    }
}

/// Fade-out of one voxel (destruction). At 100% the voxel is replaced by the
/// chunk's floor replacement or air; while fading it never merges.
#[derive(Clone, Copy, Debug)]
pub struct FadeAnimInst {
    pub pos: VoxelPos,
    pub speed: f32,
    pub percent_faded: f32,
}

impl FadeAnimInst {
    pub fn new(pos: VoxelPos, speed: f32) -> Self {
        Self {
            pos,
            speed,
            percent_faded: 0.0,
        }
    }

    pub fn update(&mut self, dt: f32) {
        self.percent_faded = (self.percent_faded + self.speed * dt).min(1.0);
    }

    #[inline]
    pub fn is_done(&self) -> bool {
        self.percent_faded >= 1.0
    }
}

/// Which faces of a door voxel face open space this frame (camera-dependent
/// culling input maintained by the caller).
#[derive(Clone, Copy, Debug)]
pub struct DoorVisInst {
    pub pos: VoxelPos,
    visible_face_mask: u8,
}

impl DoorVisInst {
    pub fn new(pos: VoxelPos) -> Self {
        Self {
            pos,
            visible_face_mask: 0,
        }
    }

    #[inline]
    pub fn set_visible(&mut self, facing: Facing, visible: bool) {
        let bit = 1u8 << facing.index();
        if visible {
            self.visible_face_mask |= bit;
        } else {
            self.visible_face_mask &= !bit;
        }
    }

    #[inline]
    pub fn is_visible(&self, facing: Facing) -> bool {
        (self.visible_face_mask & (1u8 << facing.index())) != 0
    }

    pub fn clear_visible_faces(&mut self) {
        self.visible_face_mask = 0;
    }

    pub fn visible_face_count(&self) -> usize {
        (0..FACE_COUNT)
            .filter(|&i| (self.visible_face_mask & (1u8 << i)) != 0)
            .count()
    }
}

/// Records that a one-shot trigger at this voxel already fired.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TriggerInst {
    pub pos: VoxelPos,
}

/// Which lateral walls a chasm voxel currently shows, derived from its
/// neighbors' geometry by the chunk manager.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChasmWallInst {
    pub pos: VoxelPos,
    pub north: bool,
    pub east: bool,
    pub south: bool,
    pub west: bool,
}

impl ChasmWallInst {
    pub fn new(pos: VoxelPos) -> Self {
        Self {
            pos,
            north: false,
            east: false,
            south: false,
            west: false,
        }
    }

    #[inline]
    pub fn has_any_wall(&self) -> bool {
        self.north || self.east || self.south || self.west
    }
}
