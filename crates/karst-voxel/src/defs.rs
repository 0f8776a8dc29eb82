//! Immutable per-chunk definition records. Voxels reference these by small
//! integer IDs; ID 0 in the shape/texture/traits tables is reserved for air.

use karst_geom::{ALL_FACINGS, FACE_COUNT, Facing};

pub type ShapeDefId = u16;
pub type TextureDefId = u16;
pub type TraitsDefId = u16;
pub type TransitionDefId = u16;
pub type TriggerDefId = u16;
pub type LockDefId = u16;
pub type DoorDefId = u16;
pub type ChasmDefId = u16;

pub const AIR_SHAPE_DEF_ID: ShapeDefId = 0;
pub const AIR_TEXTURE_DEF_ID: TextureDefId = 0;
pub const AIR_TRAITS_DEF_ID: TraitsDefId = 0;

/// Axis-aligned box occupying part of a voxel cell. Width/depth are centered
/// in the cell; the box rests `y_offset` above the cell bottom.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoxShape {
    pub width: f32,
    pub height: f32,
    pub depth: f32,
    pub y_offset: f32,
    /// Radians, for diagonal walls.
    pub y_rotation: f32,
}

impl BoxShape {
    pub const UNIT: BoxShape = BoxShape {
        width: 1.0,
        height: 1.0,
        depth: 1.0,
        y_offset: 0.0,
        y_rotation: 0.0,
    };
}

/// Geometry payload of a shape definition. The tag is the single source of
/// truth for which payload is valid; collision translation matches on it
/// exhaustively, so adding a variant is a compile-time obligation there.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ShapeGeometry {
    Box(BoxShape),
}

/// Per-face mesh attributes needed by the face-enable and combine passes.
/// `full_coverage` means the mesh completely tiles that face of the cell;
/// `opaque` means nothing behind the face can show through it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShapeMesh {
    pub empty: bool,
    pub full_coverage: [bool; FACE_COUNT],
    pub opaque: [bool; FACE_COUNT],
}

impl ShapeMesh {
    pub const AIR: ShapeMesh = ShapeMesh {
        empty: true,
        full_coverage: [false; FACE_COUNT],
        opaque: [false; FACE_COUNT],
    };

    pub const SOLID_OPAQUE: ShapeMesh = ShapeMesh {
        empty: false,
        full_coverage: [true; FACE_COUNT],
        opaque: [true; FACE_COUNT],
    };

    #[inline]
    pub fn has_full_coverage(&self, facing: Facing) -> bool {
        !self.empty && self.full_coverage[facing.index()]
    }

    #[inline]
    pub fn is_face_opaque(&self, facing: Facing) -> bool {
        !self.empty && self.opaque[facing.index()]
    }
}

/// Geometry + merge behavior for one distinct voxel shape.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShapeDef {
    pub geometry: ShapeGeometry,
    pub mesh: ShapeMesh,
    /// Whether faces may be disabled when blocked by an opaque neighbor face.
    pub allows_internal_face_removal: bool,
    /// Whether this shape may merge with identical adjacent voxels. Shapes
    /// whose meshes don't tile seamlessly opt out and stay 1x1x1.
    pub allows_adjacent_face_combining: bool,
}

impl ShapeDef {
    pub const AIR: ShapeDef = ShapeDef {
        geometry: ShapeGeometry::Box(BoxShape {
            width: 0.0,
            height: 0.0,
            depth: 0.0,
            y_offset: 0.0,
            y_rotation: 0.0,
        }),
        mesh: ShapeMesh::AIR,
        allows_internal_face_removal: true,
        allows_adjacent_face_combining: false,
    };

    /// Full-cell opaque cube that participates in culling and merging.
    pub fn solid_opaque() -> ShapeDef {
        ShapeDef {
            geometry: ShapeGeometry::Box(BoxShape::UNIT),
            mesh: ShapeMesh::SOLID_OPAQUE,
            allows_internal_face_removal: true,
            allows_adjacent_face_combining: true,
        }
    }
}

/// Handle to a texture/shading configuration owned by the render layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextureDef {
    pub asset_index: u32,
}

impl TextureDef {
    pub const AIR: TextureDef = TextureDef { asset_index: 0 };
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChasmKind {
    Dry,
    Wet,
    Lava,
}

/// Gameplay classification of a voxel, with per-kind payload. Determines
/// which merge rules apply and how context-sensitive geometry behaves.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TraitsDef {
    Air,
    Floor,
    Ceiling,
    Wall,
    Raised { y_offset: f32, y_size: f32 },
    Diagonal { right_handed: bool },
    TransparentWall { collider: bool },
    Edge { facing: Facing, collider: bool },
    Chasm { kind: ChasmKind },
    Door,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VoxelKind {
    Air,
    Floor,
    Ceiling,
    Wall,
    Raised,
    Diagonal,
    TransparentWall,
    Edge,
    Chasm,
    Door,
}

const LATERAL_FACINGS: [Facing; 4] = [Facing::PosX, Facing::NegX, Facing::PosZ, Facing::NegZ];

impl TraitsDef {
    #[inline]
    pub fn kind(&self) -> VoxelKind {
        match self {
            TraitsDef::Air => VoxelKind::Air,
            TraitsDef::Floor => VoxelKind::Floor,
            TraitsDef::Ceiling => VoxelKind::Ceiling,
            TraitsDef::Wall => VoxelKind::Wall,
            TraitsDef::Raised { .. } => VoxelKind::Raised,
            TraitsDef::Diagonal { .. } => VoxelKind::Diagonal,
            TraitsDef::TransparentWall { .. } => VoxelKind::TransparentWall,
            TraitsDef::Edge { .. } => VoxelKind::Edge,
            TraitsDef::Chasm { .. } => VoxelKind::Chasm,
            TraitsDef::Door => VoxelKind::Door,
        }
    }
}

impl VoxelKind {
    /// Facings across which faces of this kind may merge, when the rule is a
    /// plain whitelist. Kinds needing instance-state checks (chasms) or that
    /// never merge (air, diagonals, doors) return `None` and are special-cased
    /// by the combiner.
    pub fn combinable_facings(self) -> Option<&'static [Facing]> {
        match self {
            VoxelKind::Floor => Some(&[Facing::PosY]),
            VoxelKind::Ceiling => Some(&[Facing::NegY]),
            VoxelKind::Wall | VoxelKind::Raised => Some(&ALL_FACINGS),
            VoxelKind::TransparentWall => Some(&LATERAL_FACINGS),
            VoxelKind::Air
            | VoxelKind::Diagonal
            | VoxelKind::Edge
            | VoxelKind::Chasm
            | VoxelKind::Door => None,
        }
    }

    /// Whether this kind's mesh actually produces geometry covering the
    /// facing, i.e. whether a combined face seeded there would draw anything.
    pub fn mesh_covers_facing(self, facing: Facing) -> bool {
        match self {
            VoxelKind::Air | VoxelKind::Diagonal | VoxelKind::Door => false,
            VoxelKind::Floor => facing == Facing::PosY,
            VoxelKind::Ceiling => facing == Facing::NegY,
            VoxelKind::Wall | VoxelKind::Raised => true,
            VoxelKind::TransparentWall | VoxelKind::Edge => facing.axis_index() != 1,
            VoxelKind::Chasm => facing != Facing::PosY,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransitionKind {
    InteriorEntry,
    InteriorExit,
    CityGate,
    LevelChange { up: bool },
}

/// Marks a voxel that moves the player between map areas.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransitionDef {
    pub kind: TransitionKind,
}

/// Sound/text fired when the player enters the voxel. A trigger on an
/// otherwise-empty voxel still needs a physics sensor region.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TriggerDef {
    pub sound: Option<String>,
    pub lore_text: Option<String>,
}

impl TriggerDef {
    #[inline]
    pub fn affects_physics(&self) -> bool {
        self.sound.is_some() || self.lore_text.is_some()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LockDef {
    pub key_id: i32,
    pub lock_level: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DoorKind {
    Swinging,
    Sliding,
    Raising,
    Splitting,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DoorDef {
    pub kind: DoorKind,
    pub open_sound: Option<String>,
    pub close_sound: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChasmDef {
    pub kind: ChasmKind,
    pub allows_swimming: bool,
    pub is_damaging: bool,
}
