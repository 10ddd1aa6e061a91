// bxporter-scene/src/armature.rs
//! Armature (skeleton) datablocks

use bxporter_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// A skeleton made of bones
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Armature {
    /// Armature name
    pub name: String,
    /// All bones, parents listed before their children
    #[serde(default)]
    pub bones: Vec<Bone>,
}

impl Armature {
    /// Create a new empty armature
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bones: Vec::new(),
        }
    }

    /// Get bone count
    pub fn bone_count(&self) -> usize {
        self.bones.len()
    }

    /// Find bone by name
    pub fn find_bone(&self, name: &str) -> Option<&Bone> {
        self.bones.iter().find(|b| b.name == name)
    }

    /// Get all bone names
    pub fn bone_names(&self) -> Vec<&str> {
        self.bones.iter().map(|b| b.name.as_str()).collect()
    }

    /// Get the direct children of a bone
    pub fn children(&self, name: &str) -> Vec<&Bone> {
        self.bones
            .iter()
            .filter(|b| b.parent.as_deref() == Some(name))
            .collect()
    }

    /// Validate skeleton structure
    pub fn validate(&self) -> Result<()> {
        for bone in &self.bones {
            if let Some(parent) = &bone.parent {
                if parent == &bone.name {
                    return Err(Error::consistency(format!(
                        "bone \"{}\" references itself as parent",
                        bone.name
                    )));
                }
                if self.find_bone(parent).is_none() {
                    return Err(Error::not_found("Bone", parent.clone())
                        .with_context(format!("parent of bone \"{}\"", bone.name)));
                }
            }
        }
        Ok(())
    }
}

/// A single bone in rest pose
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bone {
    /// Bone name
    pub name: String,
    /// Parent bone name (None for root bones)
    #[serde(default)]
    pub parent: Option<String>,
    /// Head position in armature space
    pub head_local: [f32; 3],
    /// Tail position in armature space
    pub tail_local: [f32; 3],
}

impl Bone {
    pub fn new(name: impl Into<String>, head_local: [f32; 3], tail_local: [f32; 3]) -> Self {
        Self {
            name: name.into(),
            parent: None,
            head_local,
            tail_local,
        }
    }

    /// Builder-style parent assignment
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }
}
