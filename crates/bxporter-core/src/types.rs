//! Format vocabulary shared by the encoders and decoders
//!
//! The integer codes below are part of the `.bx` binary contract and the
//! string names are part of the `.bxon` tree contract. Neither may change.

use serde::{Deserialize, Serialize};

/// Kind of datablock an object record points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DatablockKind {
    /// Plain object without data (an empty)
    Object,
    Mesh,
    Material,
    Texture,
    Armature,
    Camera,
    Lamp,
    Curve,
}

impl DatablockKind {
    /// Convert to the on-disk code
    pub fn to_i32(self) -> i32 {
        match self {
            DatablockKind::Object => 1,
            DatablockKind::Mesh => 2,
            DatablockKind::Material => 3,
            DatablockKind::Texture => 4,
            DatablockKind::Armature => 5,
            DatablockKind::Camera => 6,
            DatablockKind::Lamp => 7,
            DatablockKind::Curve => 8,
        }
    }

    /// Convert from the on-disk code
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            1 => Some(DatablockKind::Object),
            2 => Some(DatablockKind::Mesh),
            3 => Some(DatablockKind::Material),
            4 => Some(DatablockKind::Texture),
            5 => Some(DatablockKind::Armature),
            6 => Some(DatablockKind::Camera),
            7 => Some(DatablockKind::Lamp),
            8 => Some(DatablockKind::Curve),
            _ => None,
        }
    }

    /// Name used for the `datablock.type` field of tree objects
    pub fn tree_name(self) -> &'static str {
        match self {
            DatablockKind::Object => "empty",
            DatablockKind::Mesh => "mesh",
            DatablockKind::Material => "material",
            DatablockKind::Texture => "texture",
            DatablockKind::Armature => "armature",
            DatablockKind::Camera => "camera",
            DatablockKind::Lamp => "lamp",
            DatablockKind::Curve => "curve",
        }
    }

    /// Whether a record of this kind carries a datablock id
    pub fn has_datablock(self) -> bool {
        !matches!(self, DatablockKind::Object)
    }
}

/// Transform property an animation graph drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GraphProperty {
    Location,
    Rotation,
    Scale,
}

/// Semantic tag of one flattened keyframe stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GraphCode {
    LocX,
    LocY,
    LocZ,
    RotX,
    RotY,
    RotZ,
    RotW,
    ScaleX,
    ScaleY,
    ScaleZ,
}

impl GraphCode {
    /// Graph code for `property` on component `axis`, if that axis exists
    pub fn for_axis(property: GraphProperty, axis: usize) -> Option<Self> {
        use GraphCode::*;
        let codes: &[GraphCode] = match property {
            GraphProperty::Location => &[LocX, LocY, LocZ],
            GraphProperty::Rotation => &[RotX, RotY, RotZ, RotW],
            GraphProperty::Scale => &[ScaleX, ScaleY, ScaleZ],
        };
        codes.get(axis).copied()
    }

    /// Convert to the on-disk code
    pub fn to_i32(self) -> i32 {
        match self {
            GraphCode::LocX => 1,
            GraphCode::LocY => 2,
            GraphCode::LocZ => 3,
            GraphCode::RotX => 4,
            GraphCode::RotY => 5,
            GraphCode::RotZ => 6,
            GraphCode::RotW => 7,
            GraphCode::ScaleX => 8,
            GraphCode::ScaleY => 9,
            GraphCode::ScaleZ => 10,
        }
    }

    /// Convert from the on-disk code
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            1 => Some(GraphCode::LocX),
            2 => Some(GraphCode::LocY),
            3 => Some(GraphCode::LocZ),
            4 => Some(GraphCode::RotX),
            5 => Some(GraphCode::RotY),
            6 => Some(GraphCode::RotZ),
            7 => Some(GraphCode::RotW),
            8 => Some(GraphCode::ScaleX),
            9 => Some(GraphCode::ScaleY),
            10 => Some(GraphCode::ScaleZ),
            _ => None,
        }
    }

    /// Property this graph drives
    pub fn property(self) -> GraphProperty {
        match self {
            GraphCode::LocX | GraphCode::LocY | GraphCode::LocZ => GraphProperty::Location,
            GraphCode::RotX | GraphCode::RotY | GraphCode::RotZ | GraphCode::RotW => {
                GraphProperty::Rotation
            }
            GraphCode::ScaleX | GraphCode::ScaleY | GraphCode::ScaleZ => GraphProperty::Scale,
        }
    }

    /// Component index (x = 0 ... w = 3)
    pub fn axis(self) -> usize {
        match self {
            GraphCode::LocX | GraphCode::RotX | GraphCode::ScaleX => 0,
            GraphCode::LocY | GraphCode::RotY | GraphCode::ScaleY => 1,
            GraphCode::LocZ | GraphCode::RotZ | GraphCode::ScaleZ => 2,
            GraphCode::RotW => 3,
        }
    }
}

/// Texture coordinate source of a material slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TextureMapping {
    Global,
    Uv,
    Strand,
    Reflection,
}

impl TextureMapping {
    pub fn to_i32(self) -> i32 {
        match self {
            TextureMapping::Global => 0,
            TextureMapping::Uv => 1,
            TextureMapping::Strand => 2,
            TextureMapping::Reflection => 3,
        }
    }

    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(TextureMapping::Global),
            1 => Some(TextureMapping::Uv),
            2 => Some(TextureMapping::Strand),
            3 => Some(TextureMapping::Reflection),
            _ => None,
        }
    }

    pub fn tree_name(self) -> &'static str {
        match self {
            TextureMapping::Global => "global",
            TextureMapping::Uv => "uv",
            TextureMapping::Strand => "strand",
            TextureMapping::Reflection => "reflection",
        }
    }
}

/// Projection of a texture onto the surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TextureProjection {
    Flat,
    Cube,
    Tube,
    Sphere,
}

impl TextureProjection {
    pub fn to_i32(self) -> i32 {
        match self {
            TextureProjection::Flat => 0,
            TextureProjection::Cube => 1,
            TextureProjection::Tube => 2,
            TextureProjection::Sphere => 3,
        }
    }

    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(TextureProjection::Flat),
            1 => Some(TextureProjection::Cube),
            2 => Some(TextureProjection::Tube),
            3 => Some(TextureProjection::Sphere),
            _ => None,
        }
    }

    pub fn tree_name(self) -> &'static str {
        match self {
            TextureProjection::Flat => "flat",
            TextureProjection::Cube => "cube",
            TextureProjection::Tube => "tube",
            TextureProjection::Sphere => "sphere",
        }
    }
}

/// Material property a texture slot influences
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TextureFilter {
    DiffuseIntensity,
    DiffuseColor,
    DiffuseAlpha,
    DiffuseTranslucency,
    SpecularIntensity,
    SpecularColor,
    SpecularHardness,
    GeometryNormal,
    GeometryDisplacement,
}

impl TextureFilter {
    pub fn to_i32(self) -> i32 {
        match self {
            TextureFilter::DiffuseIntensity => 0,
            TextureFilter::DiffuseColor => 1,
            TextureFilter::DiffuseAlpha => 2,
            TextureFilter::DiffuseTranslucency => 3,
            TextureFilter::SpecularIntensity => 4,
            TextureFilter::SpecularColor => 5,
            TextureFilter::SpecularHardness => 6,
            TextureFilter::GeometryNormal => 7,
            TextureFilter::GeometryDisplacement => 8,
        }
    }

    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(TextureFilter::DiffuseIntensity),
            1 => Some(TextureFilter::DiffuseColor),
            2 => Some(TextureFilter::DiffuseAlpha),
            3 => Some(TextureFilter::DiffuseTranslucency),
            4 => Some(TextureFilter::SpecularIntensity),
            5 => Some(TextureFilter::SpecularColor),
            6 => Some(TextureFilter::SpecularHardness),
            7 => Some(TextureFilter::GeometryNormal),
            8 => Some(TextureFilter::GeometryDisplacement),
            _ => None,
        }
    }

    /// Key used inside a tree slot's `properties` map
    pub fn tree_name(self) -> &'static str {
        match self {
            TextureFilter::DiffuseIntensity => "diffuse_factor",
            TextureFilter::DiffuseColor => "diffuse_color_factor",
            TextureFilter::DiffuseAlpha => "alpha_factor",
            TextureFilter::DiffuseTranslucency => "translucency_factor",
            TextureFilter::SpecularIntensity => "specular_factor",
            TextureFilter::SpecularColor => "specular_color_factor",
            TextureFilter::SpecularHardness => "hardness_factor",
            TextureFilter::GeometryNormal => "normal_factor",
            TextureFilter::GeometryDisplacement => "displacement_factor",
        }
    }
}

/// Material flag bits
pub mod material_flags {
    /// Material has animated properties (never set by the exporter)
    pub const ANIMATION: i32 = 1;
    /// Material uses alpha blending
    pub const ALPHA: i32 = 2;
}

/// Color in RGBA format (0-255 per channel)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Self = Self { r: 255, g: 255, b: 255, a: 255 };

    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Opaque color from normalized rgb, truncating toward zero
    pub fn from_unit_rgb(rgb: [f32; 3]) -> Self {
        // `as` saturates, out-of-range input clamps to 0/255
        Self {
            r: (rgb[0] * 255.0) as u8,
            g: (rgb[1] * 255.0) as u8,
            b: (rgb[2] * 255.0) as u8,
            a: 255,
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graph_code_roundtrip() {
        for code in 1..=10 {
            let graph = GraphCode::from_i32(code).unwrap();
            assert_eq!(graph.to_i32(), code);
            assert_eq!(GraphCode::for_axis(graph.property(), graph.axis()), Some(graph));
        }
        assert_eq!(GraphCode::from_i32(0), None);
        assert_eq!(GraphCode::from_i32(11), None);
    }

    #[test]
    fn test_graph_code_arity() {
        assert_eq!(GraphCode::for_axis(GraphProperty::Rotation, 3), Some(GraphCode::RotW));
        assert_eq!(GraphCode::for_axis(GraphProperty::Location, 3), None);
        assert_eq!(GraphCode::for_axis(GraphProperty::Scale, 2), Some(GraphCode::ScaleZ));
    }

    #[test]
    fn test_datablock_codes() {
        assert_eq!(DatablockKind::Mesh.to_i32(), 2);
        assert_eq!(DatablockKind::from_i32(5), Some(DatablockKind::Armature));
        assert!(!DatablockKind::Object.has_datablock());
        assert_eq!(DatablockKind::Object.tree_name(), "empty");
    }

    #[test]
    fn test_color_from_unit() {
        let color = Color::from_unit_rgb([1.0, 0.5, 0.0]);
        assert_eq!(color, Color::new(255, 127, 0, 255));

        let clamped = Color::from_unit_rgb([2.0, -1.0, 0.999]);
        assert_eq!(clamped, Color::new(255, 0, 254, 255));
    }
}
