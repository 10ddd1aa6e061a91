//! Scene snapshot root and name resolution

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use bxporter_core::{Error, Result, ResultExt};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Action, Armature, Camera, Curve, Lamp, Material, Mesh, Named, Object, Texture};

/// A snapshot of the host scene
///
/// `objects` is the export selection in selection order. The remaining
/// fields are datablock libraries that objects and materials reference
/// by name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Scene {
    pub objects: Vec<Object>,
    pub meshes: Vec<Mesh>,
    pub materials: Vec<Material>,
    pub textures: Vec<Texture>,
    pub lamps: Vec<Lamp>,
    pub cameras: Vec<Camera>,
    pub curves: Vec<Curve>,
    pub armatures: Vec<Armature>,
    pub actions: Vec<Action>,
}

fn find<'a, T: Named>(items: &'a [T], kind: &'static str, name: &str) -> Result<&'a T> {
    items
        .iter()
        .find(|item| item.name() == name)
        .ok_or_else(|| Error::not_found(kind, name))
}

impl Scene {
    /// Create an empty scene
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a snapshot from a JSON reader
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let scene: Scene = serde_json::from_reader(reader)?;
        debug!(
            objects = scene.objects.len(),
            meshes = scene.meshes.len(),
            materials = scene.materials.len(),
            actions = scene.actions.len(),
            "Loaded scene snapshot"
        );
        Ok(scene)
    }

    /// Load a snapshot from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_reader(json.as_bytes())
    }

    /// Load a snapshot from a JSON file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(Error::from)
            .with_context(|| format!("opening {}", path.display()))?;
        Self::from_reader(BufReader::new(file)).with_context(|| format!("reading {}", path.display()))
    }

    /// Find a selected object by name
    pub fn object(&self, name: &str) -> Result<&Object> {
        find(&self.objects, "Object", name)
    }

    pub fn mesh(&self, name: &str) -> Result<&Mesh> {
        find(&self.meshes, "Mesh", name)
    }

    pub fn material(&self, name: &str) -> Result<&Material> {
        find(&self.materials, "Material", name)
    }

    pub fn texture(&self, name: &str) -> Result<&Texture> {
        find(&self.textures, "Texture", name)
    }

    pub fn lamp(&self, name: &str) -> Result<&Lamp> {
        find(&self.lamps, "Lamp", name)
    }

    pub fn camera(&self, name: &str) -> Result<&Camera> {
        find(&self.cameras, "Camera", name)
    }

    pub fn curve(&self, name: &str) -> Result<&Curve> {
        find(&self.curves, "Curve", name)
    }

    pub fn armature(&self, name: &str) -> Result<&Armature> {
        find(&self.armatures, "Armature", name)
    }

    pub fn action(&self, name: &str) -> Result<&Action> {
        find(&self.actions, "Action", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ObjectData;
    use std::io::Write;

    const SCENE_JSON: &str = r#"{
        "objects": [
            {"name": "Cube", "data": {"type": "MESH", "name": "CubeMesh"}},
            {"name": "Sun", "data": {"type": "LAMP", "name": "SunLamp"}, "parent": "Cube"}
        ],
        "meshes": [{"name": "CubeMesh"}],
        "lamps": [{"name": "SunLamp", "energy": 3.0}]
    }"#;

    #[test]
    fn test_from_json() {
        let scene = Scene::from_json(SCENE_JSON).unwrap();
        assert_eq!(scene.objects.len(), 2);
        assert_eq!(scene.objects[1].parent.as_deref(), Some("Cube"));
        assert_eq!(scene.lamp("SunLamp").unwrap().energy, 3.0);
        assert!(scene.cameras.is_empty());
    }

    #[test]
    fn test_lookup_not_found() {
        let scene = Scene::from_json(SCENE_JSON).unwrap();
        let err = scene.mesh("Sphere").unwrap_err();
        assert!(err.is_reference_not_found());
        assert_eq!(err.to_string(), "Mesh not found: \"Sphere\"");
        assert!(matches!(scene.object("Cube").unwrap().data, ObjectData::Mesh(_)));
    }

    #[test]
    fn test_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SCENE_JSON.as_bytes()).unwrap();

        let scene = Scene::from_path(file.path()).unwrap();
        assert_eq!(scene.meshes[0].name, "CubeMesh");
    }

    #[test]
    fn test_malformed_json() {
        let err = Scene::from_json("{\"objects\": [{}]}").unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }
}
