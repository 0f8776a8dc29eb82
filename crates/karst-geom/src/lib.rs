//! Integer voxel/chunk coordinates and face directions shared by the chunk crates.
#![forbid(unsafe_code)]

use core::ops::{Add, AddAssign, Sub};

/// Number of cardinal/vertical faces on a voxel.
pub const FACE_COUNT: usize = 6;

/// Position of a voxel within a chunk's local grid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub struct VoxelPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl VoxelPos {
    pub const ZERO: VoxelPos = VoxelPos { x: 0, y: 0, z: 0 };

    #[inline]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Squared distance to the chunk-local origin. Used for merge seeding
    /// order. Wide enough that no `i32` coordinate can overflow it.
    #[inline]
    pub fn length_sq(self) -> i128 {
        let x = self.x as i128;
        let y = self.y as i128;
        let z = self.z as i128;
        x * x + y * y + z * z
    }
}

impl Add for VoxelPos {
    type Output = VoxelPos;
    #[inline]
    fn add(self, rhs: VoxelPos) -> VoxelPos {
        VoxelPos::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl AddAssign for VoxelPos {
    #[inline]
    fn add_assign(&mut self, rhs: VoxelPos) {
        self.x += rhs.x;
        self.y += rhs.y;
        self.z += rhs.z;
    }
}

impl Sub for VoxelPos {
    type Output = VoxelPos;
    #[inline]
    fn sub(self, rhs: VoxelPos) -> VoxelPos {
        VoxelPos::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

/// Identifies a 64xHx64 chunk column in the streamed world.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub struct ChunkPos {
    pub x: i32,
    pub z: i32,
}

impl ChunkPos {
    #[inline]
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }
}

/// One of the six voxel faces. The discriminant doubles as the face index
/// used by face-enable entries and combined-face slots.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Facing {
    PosX = 0,
    NegX = 1,
    PosY = 2,
    NegY = 3,
    PosZ = 4,
    NegZ = 5,
}

/// All six facings in index order.
pub const ALL_FACINGS: [Facing; FACE_COUNT] = [
    Facing::PosX,
    Facing::NegX,
    Facing::PosY,
    Facing::NegY,
    Facing::PosZ,
    Facing::NegZ,
];

impl Facing {
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Converts a face index `[0..6)` back into a `Facing` value.
    #[inline]
    pub fn from_index(i: usize) -> Facing {
        ALL_FACINGS[i]
    }

    #[inline]
    pub fn opposite(self) -> Facing {
        match self {
            Facing::PosX => Facing::NegX,
            Facing::NegX => Facing::PosX,
            Facing::PosY => Facing::NegY,
            Facing::NegY => Facing::PosY,
            Facing::PosZ => Facing::NegZ,
            Facing::NegZ => Facing::PosZ,
        }
    }

    /// Returns the integer grid delta when stepping out of this face.
    #[inline]
    pub fn delta(self) -> VoxelPos {
        match self {
            Facing::PosX => VoxelPos::new(1, 0, 0),
            Facing::NegX => VoxelPos::new(-1, 0, 0),
            Facing::PosY => VoxelPos::new(0, 1, 0),
            Facing::NegY => VoxelPos::new(0, -1, 0),
            Facing::PosZ => VoxelPos::new(0, 0, 1),
            Facing::NegZ => VoxelPos::new(0, 0, -1),
        }
    }

    /// Axis this facing's normal lies on: 0 = X, 1 = Y, 2 = Z.
    #[inline]
    pub fn axis_index(self) -> usize {
        match self {
            Facing::PosX | Facing::NegX => 0,
            Facing::PosY | Facing::NegY => 1,
            Facing::PosZ | Facing::NegZ => 2,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    #[inline]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

impl Add for Vec3 {
    type Output = Vec3;
    #[inline]
    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Vec3;
    #[inline]
    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

/// Axis-aligned box in voxel-grid space, handed to the physics backend.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    #[inline]
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }
}
