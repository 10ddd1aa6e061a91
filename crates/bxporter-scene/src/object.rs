// bxporter-scene/src/object.rs
//! Scene objects and their animation bindings

use bxporter_core::DatablockKind;
use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// An object placed in the scene
///
/// Matrices are column-major, serialized as 16 floats.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Object {
    /// Object name
    pub name: String,
    /// Attached datablock
    #[serde(default)]
    pub data: ObjectData,
    /// Parent object name
    #[serde(default)]
    pub parent: Option<String>,
    /// Transform relative to the parent
    #[serde(default)]
    pub matrix_local: Mat4,
    /// Inverse of the parent's world matrix at parenting time
    #[serde(default)]
    pub matrix_parent_inverse: Mat4,
    /// Vertex group names, indexed by `VertexWeight::group`
    #[serde(default)]
    pub vertex_groups: Vec<String>,
    /// Attached animation
    #[serde(default)]
    pub animation: Option<AnimationData>,
}

impl Object {
    /// Unparented object at the origin
    pub fn new(name: impl Into<String>, data: ObjectData) -> Self {
        Self {
            name: name.into(),
            data,
            parent: None,
            matrix_local: Mat4::IDENTITY,
            matrix_parent_inverse: Mat4::IDENTITY,
            vertex_groups: Vec::new(),
            animation: None,
        }
    }

    /// Builder-style parent assignment
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Builder-style local matrix assignment
    pub fn with_matrix(mut self, matrix_local: Mat4) -> Self {
        self.matrix_local = matrix_local;
        self
    }

    /// Matrix written to the output, corrected by the parent inverse when parented
    pub fn export_matrix(&self) -> Mat4 {
        if self.parent.is_some() {
            self.matrix_local * self.matrix_parent_inverse
        } else {
            self.matrix_local
        }
    }

    /// Decomposed export transform
    pub fn transform(&self) -> Transform {
        Transform::from_matrix(&self.export_matrix())
    }

    /// Check if animation data is attached
    pub fn has_animation(&self) -> bool {
        self.animation.is_some()
    }
}

/// Datablock attached to an object, referenced by name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "name", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObjectData {
    #[default]
    Empty,
    Mesh(String),
    Lamp(String),
    Camera(String),
    Curve(String),
    Armature(String),
}

impl ObjectData {
    /// Datablock kind written in object records
    pub fn kind(&self) -> DatablockKind {
        match self {
            ObjectData::Empty => DatablockKind::Object,
            ObjectData::Mesh(_) => DatablockKind::Mesh,
            ObjectData::Lamp(_) => DatablockKind::Lamp,
            ObjectData::Camera(_) => DatablockKind::Camera,
            ObjectData::Curve(_) => DatablockKind::Curve,
            ObjectData::Armature(_) => DatablockKind::Armature,
        }
    }

    /// Name of the referenced datablock, `None` for empties
    pub fn datablock_name(&self) -> Option<&str> {
        match self {
            ObjectData::Empty => None,
            ObjectData::Mesh(name)
            | ObjectData::Lamp(name)
            | ObjectData::Camera(name)
            | ObjectData::Curve(name)
            | ObjectData::Armature(name) => Some(name),
        }
    }
}

/// Decomposed transform
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    pub fn from_matrix(matrix: &Mat4) -> Self {
        let (scale, rotation, position) = matrix.to_scale_rotation_translation();
        Self {
            position,
            rotation,
            scale,
        }
    }
}

/// Animation bound to an object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnimationData {
    /// Active action name
    #[serde(default)]
    pub action: Option<String>,
    /// Non-linear animation tracks
    #[serde(default)]
    pub nla_tracks: Vec<NlaTrack>,
}

impl AnimationData {
    /// Animation playing a single action
    pub fn with_action(action: impl Into<String>) -> Self {
        Self {
            action: Some(action.into()),
            nla_tracks: Vec::new(),
        }
    }
}

/// A named sequence of strips
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NlaTrack {
    pub name: String,
    #[serde(default)]
    pub strips: Vec<NlaStrip>,
}

/// A strip wrapping one action
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NlaStrip {
    pub name: String,
    /// Name of the wrapped action
    pub action: String,
}
