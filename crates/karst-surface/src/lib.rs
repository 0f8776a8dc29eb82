//! Derived per-chunk surface state: face occlusion, face rectangles for
//! rendering, and merged boxes for collision. All three layers consume the
//! voxel chunk's dirty lists and rebuild only what an edit invalidated.
#![forbid(unsafe_code)]

pub mod box_combine;
pub mod face_combine;
pub mod face_enable;
pub mod pool;

pub use box_combine::{BoxCombineChunk, BoxCombineResult};
pub use face_combine::{FaceCombineChunk, FaceCombineResult};
pub use face_enable::{FaceEnableChunk, FaceEnableEntry};
pub use pool::{SlotId, SlotPool};
