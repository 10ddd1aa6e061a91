//! Decoded fixed-schema records
//!
//! These mirror the on-disk layout one to one: ids stay ids, codes are
//! mapped to their enums. They exist for inspection and round-trip checks.

use bxporter_core::{Color, DatablockKind, GraphCode, TextureFilter, TextureMapping, TextureProjection};
use bxporter_scene::Spline;
use serde::Serialize;

use crate::collect::SectionCounts;

/// A whole decoded `.bx` file
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BxDocument {
    pub version: u32,
    pub counts: SectionCounts,
    pub textures: Vec<BxTexture>,
    pub materials: Vec<BxMaterial>,
    pub meshes: Vec<BxMesh>,
    pub cameras: Vec<BxCamera>,
    pub armatures: Vec<BxArmature>,
    pub curves: Vec<BxCurve>,
    pub lamps: Vec<BxLamp>,
    pub objects: Vec<BxObject>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BxTexture {
    pub name: String,
    /// Image file name without directories
    pub filename: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BxMaterial {
    pub name: String,
    /// Diffuse rgb and alpha
    pub diffuse: [f32; 4],
    /// Specular rgb, alpha always 1
    pub specular: [f32; 4],
    pub diffuse_intensity: f32,
    pub specular_intensity: f32,
    pub ambient: f32,
    /// `material_flags` bits
    pub flags: i32,
    pub slots: Vec<BxTextureSlot>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BxTextureSlot {
    pub name: String,
    pub mapping: TextureMapping,
    pub projection: TextureProjection,
    pub offset: [f32; 3],
    pub scale: [f32; 3],
    pub uv_layer: String,
    pub properties: Vec<(TextureFilter, f32)>,
    /// Texture id
    pub texture: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BxMesh {
    pub name: String,
    /// Material ids per slot, -1 for an empty slot
    pub materials: Vec<i32>,
    pub uv_layers: Vec<String>,
    pub vertex_groups: i32,
    pub has_colors: bool,
    pub shape_keys: i32,
    pub vertices: Vec<BxVertex>,
    pub polygons: Vec<BxPolygon>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BxVertex {
    pub co: [f32; 3],
    pub normal: [f32; 3],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BxPolygon {
    pub material_index: i32,
    pub corners: Vec<BxCorner>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BxCorner {
    pub vertex: i32,
    /// One uv per mesh uv layer
    pub uvs: Vec<[f32; 2]>,
    pub color: Option<Color>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BxCamera {
    pub name: String,
    /// Field of view in degrees
    pub fov: f32,
    pub clip_start: f32,
    pub clip_end: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BxArmature {
    pub name: String,
    pub bones: Vec<BxBone>,
    pub tracks: Vec<BxSkeletalTrack>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BxBone {
    pub name: String,
    /// Parent bone id, -1 for roots
    pub parent: i32,
    /// Head relative to the parent's tail
    pub head: [f32; 3],
    /// Tail relative to the parent's tail
    pub tail: [f32; 3],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BxCurve {
    pub name: String,
    pub resolution: i32,
    pub splines: Vec<Spline>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BxLamp {
    pub name: String,
    pub color: [f32; 3],
    pub energy: f32,
    pub distance: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BxObject {
    pub name: String,
    pub kind: DatablockKind,
    /// Datablock id, absent for empties
    pub datablock: Option<i32>,
    /// Parent object id plus one, 0 without parent
    pub parent: i32,
    pub position: [f32; 3],
    /// Quaternion in x, y, z, w order
    pub rotation: [f32; 4],
    pub scale: [f32; 3],
    pub tracks: Vec<BxTrack>,
}

impl BxObject {
    /// Parent object id
    pub fn parent_id(&self) -> Option<i32> {
        (self.parent > 0).then(|| self.parent - 1)
    }
}

/// Object-level track
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BxTrack {
    pub name: String,
    pub strips: Vec<BxStrip>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BxStrip {
    pub range: [f32; 2],
    pub use_groups: i32,
    pub graphs: Vec<BxGraph>,
}

/// Bone-level track
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BxSkeletalTrack {
    pub name: String,
    pub strips: Vec<BxSkeletalStrip>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BxSkeletalStrip {
    pub range: [f32; 2],
    pub bones: Vec<BxBoneGraphs>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BxBoneGraphs {
    pub name: String,
    pub graphs: Vec<BxGraph>,
}

/// One axis stream
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BxGraph {
    pub code: GraphCode,
    /// Left t/v, center t/v, right t/v
    pub keyframes: Vec<[f32; 6]>,
}
