//! Material, texture slot and texture datablocks

use bxporter_core::{TextureFilter, TextureMapping, TextureProjection};
use serde::{Deserialize, Serialize};

/// A surface material
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Material {
    /// Material name
    pub name: String,
    /// Diffuse color (normalized rgb)
    pub diffuse_color: [f32; 3],
    /// Opacity
    pub alpha: f32,
    /// Specular color (normalized rgb)
    pub specular_color: [f32; 3],
    pub diffuse_intensity: f32,
    pub specular_intensity: f32,
    pub ambient: f32,
    /// How transparency is rendered
    pub transparency_method: TransparencyMethod,
    /// Texture slots in slot order
    pub texture_slots: Vec<TextureSlot>,
}

impl Material {
    /// Create a material with host default values
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Whether the material is drawn with alpha blending
    pub fn uses_alpha_blend(&self) -> bool {
        self.transparency_method == TransparencyMethod::ZTransparency
    }
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: String::new(),
            diffuse_color: [0.8, 0.8, 0.8],
            alpha: 1.0,
            specular_color: [1.0, 1.0, 1.0],
            diffuse_intensity: 0.8,
            specular_intensity: 0.5,
            ambient: 1.0,
            transparency_method: TransparencyMethod::Mask,
            texture_slots: Vec::new(),
        }
    }
}

/// Transparency rendering method
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransparencyMethod {
    #[default]
    Mask,
    ZTransparency,
    Raytrace,
}

/// Binding of a texture to a material
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextureSlot {
    /// Slot name
    pub name: String,
    /// Name of the bound texture
    pub texture: String,
    /// Coordinate source
    #[serde(default)]
    pub texture_coords: TexCoords,
    /// Projection onto the surface
    #[serde(default = "default_projection")]
    pub mapping: TextureProjection,
    #[serde(default)]
    pub offset: [f32; 3],
    #[serde(default = "default_scale")]
    pub scale: [f32; 3],
    /// UV layer name, empty for the active layer
    #[serde(default)]
    pub uv_layer: String,
    /// Material properties this slot drives
    #[serde(default)]
    pub influence: SlotInfluence,
}

fn default_projection() -> TextureProjection {
    TextureProjection::Flat
}

fn default_scale() -> [f32; 3] {
    [1.0, 1.0, 1.0]
}

impl TextureSlot {
    /// Slot with default placement and no influences
    pub fn new(name: impl Into<String>, texture: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            texture: texture.into(),
            texture_coords: TexCoords::default(),
            mapping: default_projection(),
            offset: [0.0; 3],
            scale: default_scale(),
            uv_layer: String::new(),
            influence: SlotInfluence::default(),
        }
    }

    /// Exported mapping mode; sources without a dedicated code map to uv
    pub fn texture_mapping(&self) -> TextureMapping {
        match self.texture_coords {
            TexCoords::Global => TextureMapping::Global,
            TexCoords::Strand => TextureMapping::Strand,
            TexCoords::Reflection => TextureMapping::Reflection,
            _ => TextureMapping::Uv,
        }
    }
}

/// Host texture coordinate sources
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TexCoords {
    Global,
    Object,
    #[default]
    Uv,
    Orco,
    Strand,
    Window,
    Normal,
    Reflection,
    Stress,
    Tangent,
}

/// Influence factors of a texture slot, `None` when the influence is off
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlotInfluence {
    pub diffuse_color: Option<f32>,
    pub alpha: Option<f32>,
    pub diffuse: Option<f32>,
    pub translucency: Option<f32>,
    pub specular: Option<f32>,
    pub specular_color: Option<f32>,
    pub hardness: Option<f32>,
    pub normal: Option<f32>,
    pub displacement: Option<f32>,
}

impl SlotInfluence {
    /// Enabled influences in export order
    pub fn factors(&self) -> Vec<(TextureFilter, f32)> {
        [
            (TextureFilter::DiffuseColor, self.diffuse_color),
            (TextureFilter::DiffuseAlpha, self.alpha),
            (TextureFilter::DiffuseIntensity, self.diffuse),
            (TextureFilter::DiffuseTranslucency, self.translucency),
            (TextureFilter::SpecularIntensity, self.specular),
            (TextureFilter::SpecularColor, self.specular_color),
            (TextureFilter::SpecularHardness, self.hardness),
            (TextureFilter::GeometryNormal, self.normal),
            (TextureFilter::GeometryDisplacement, self.displacement),
        ]
        .into_iter()
        .filter_map(|(filter, factor)| factor.map(|f| (filter, f)))
        .collect()
    }
}

/// A texture datablock
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Texture {
    /// Texture name
    pub name: String,
    /// Texture type
    #[serde(rename = "type")]
    pub texture_type: TextureType,
    /// Source image, present for image textures
    #[serde(default)]
    pub image: Option<Image>,
}

impl Texture {
    /// Image texture reading `filepath`
    pub fn image(name: impl Into<String>, filepath: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            texture_type: TextureType::Image,
            image: Some(Image {
                filepath: filepath.into(),
            }),
        }
    }

    /// Non-image texture of the given type
    pub fn procedural(name: impl Into<String>, texture_type: TextureType) -> Self {
        Self {
            name: name.into(),
            texture_type,
            image: None,
        }
    }

    /// Whether this is an image texture
    pub fn is_image(&self) -> bool {
        self.texture_type == TextureType::Image
    }

    /// File name of the source image without directories
    ///
    /// Both separators are honored since host paths may come from any OS.
    pub fn image_basename(&self) -> Option<&str> {
        let path = self.image.as_ref()?.filepath.as_str();
        path.rsplit(['/', '\\']).next()
    }
}

/// Host texture types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TextureType {
    Image,
    Blend,
    Clouds,
    DistortedNoise,
    EnvironmentMap,
    Magic,
    Marble,
    Musgrave,
    Noise,
    Ocean,
    PointDensity,
    Stucci,
    VoxelData,
    Voronoi,
    Wood,
}

impl TextureType {
    /// Host type tag
    pub fn as_str(self) -> &'static str {
        match self {
            TextureType::Image => "IMAGE",
            TextureType::Blend => "BLEND",
            TextureType::Clouds => "CLOUDS",
            TextureType::DistortedNoise => "DISTORTED_NOISE",
            TextureType::EnvironmentMap => "ENVIRONMENT_MAP",
            TextureType::Magic => "MAGIC",
            TextureType::Marble => "MARBLE",
            TextureType::Musgrave => "MUSGRAVE",
            TextureType::Noise => "NOISE",
            TextureType::Ocean => "OCEAN",
            TextureType::PointDensity => "POINT_DENSITY",
            TextureType::Stucci => "STUCCI",
            TextureType::VoxelData => "VOXEL_DATA",
            TextureType::Voronoi => "VORONOI",
            TextureType::Wood => "WOOD",
        }
    }
}

/// Image referenced by an image texture
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    /// Path as stored by the host, possibly relative (`//textures/a.png`)
    pub filepath: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_basename() {
        let tex = Texture::image("Wood", "//textures/wood.png");
        assert_eq!(tex.image_basename(), Some("wood.png"));

        let tex = Texture::image("Brick", "C:\\maps\\brick.jpg");
        assert_eq!(tex.image_basename(), Some("brick.jpg"));

        let tex = Texture::image("Bare", "bare.tga");
        assert_eq!(tex.image_basename(), Some("bare.tga"));

        let tex = Texture::procedural("Clouds", TextureType::Clouds);
        assert_eq!(tex.image_basename(), None);
        assert!(!tex.is_image());
    }

    #[test]
    fn test_influence_order() {
        let influence = SlotInfluence {
            normal: Some(0.5),
            diffuse_color: Some(1.0),
            translucency: Some(0.25),
            ..Default::default()
        };

        let factors = influence.factors();
        assert_eq!(
            factors,
            vec![
                (TextureFilter::DiffuseColor, 1.0),
                (TextureFilter::DiffuseTranslucency, 0.25),
                (TextureFilter::GeometryNormal, 0.5),
            ]
        );
    }

    #[test]
    fn test_texture_mapping_fallback() {
        let mut slot = TextureSlot::new("Wood", "Wood");
        assert_eq!(slot.texture_mapping(), TextureMapping::Uv);

        slot.texture_coords = TexCoords::Orco;
        assert_eq!(slot.texture_mapping(), TextureMapping::Uv);

        slot.texture_coords = TexCoords::Reflection;
        assert_eq!(slot.texture_mapping(), TextureMapping::Reflection);
    }

    #[test]
    fn test_material_defaults_from_json() {
        let mat: Material = serde_json::from_str(
            r#"{"name": "Glass", "alpha": 0.3, "transparency_method": "Z_TRANSPARENCY",
                "texture_slots": [{"name": "Dirt", "texture": "Dirt", "mapping": "CUBE",
                                   "influence": {"alpha": 0.7}}]}"#,
        )
        .unwrap();

        assert_eq!(mat.diffuse_color, [0.8, 0.8, 0.8]);
        assert!(mat.uses_alpha_blend());
        assert_eq!(mat.texture_slots[0].mapping, TextureProjection::Cube);
        assert_eq!(mat.texture_slots[0].scale, [1.0, 1.0, 1.0]);
        assert_eq!(
            mat.texture_slots[0].influence.factors(),
            vec![(TextureFilter::DiffuseAlpha, 0.7)]
        );
    }
}
