//! Graph walk over the export selection
//!
//! A single pass over the selected objects fills one [`Registry`] per
//! resource kind, validates what the encoders rely on and attaches flattened
//! animation to the object entries. Encoders only ever read a finished
//! [`Collection`].

use bxporter_core::{Error, Result, ResultExt};
use bxporter_scene::{
    Armature, Camera, Curve, Lamp, Material, Mesh, Object, ObjectData, Scene, Texture,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::animation::{Flattener, Track};
use crate::log_collection_size;
use crate::options::ExportOptions;
use crate::registry::{Entry, Registry};

/// Entry counts in file section order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionCounts {
    pub textures: usize,
    pub materials: usize,
    pub meshes: usize,
    pub cameras: usize,
    pub armatures: usize,
    pub curves: usize,
    pub lamps: usize,
    pub objects: usize,
}

impl SectionCounts {
    /// Counts as written in the fixed-schema header
    pub fn to_array(self) -> [usize; 8] {
        [
            self.textures,
            self.materials,
            self.meshes,
            self.cameras,
            self.armatures,
            self.curves,
            self.lamps,
            self.objects,
        ]
    }

    pub fn from_array(counts: [usize; 8]) -> Self {
        Self {
            textures: counts[0],
            materials: counts[1],
            meshes: counts[2],
            cameras: counts[3],
            armatures: counts[4],
            curves: counts[5],
            lamps: counts[6],
            objects: counts[7],
        }
    }
}

/// All registries of one export
#[derive(Debug)]
pub struct Collection<'a> {
    pub objects: Registry<'a, Object>,
    pub meshes: Registry<'a, Mesh>,
    pub materials: Registry<'a, Material>,
    pub textures: Registry<'a, Texture>,
    pub lamps: Registry<'a, Lamp>,
    pub cameras: Registry<'a, Camera>,
    pub curves: Registry<'a, Curve>,
    pub armatures: Registry<'a, Armature>,
}

impl<'a> Collection<'a> {
    /// Create an empty collection
    pub fn new() -> Self {
        Self {
            objects: Registry::new(),
            meshes: Registry::new(),
            materials: Registry::new(),
            textures: Registry::new(),
            lamps: Registry::new(),
            cameras: Registry::new(),
            curves: Registry::new(),
            armatures: Registry::new(),
        }
    }

    /// Walk the selection of `scene`
    pub fn collect(scene: &'a Scene, options: &ExportOptions) -> Result<Self> {
        let mut collection = Self::new();
        let flattener = Flattener::new(options);

        for object in &scene.objects {
            let added = collection
                .add_object(scene, object)
                .with_context(|| format!("object \"{}\"", object.name))?;

            if added && options.export_animation {
                let tracks = flattener
                    .extract_tracks(object, scene)
                    .with_context(|| format!("animation of object \"{}\"", object.name))?;
                if !tracks.is_empty() {
                    collection.objects.set_tracks(&object.name, tracks);
                }
            }
        }

        collection.check_parents()?;

        log_collection_size!("objects", collection.objects);
        log_collection_size!("meshes", collection.meshes);
        log_collection_size!("materials", collection.materials);
        log_collection_size!("textures", collection.textures);
        log_collection_size!("cameras", collection.cameras);
        log_collection_size!("lamps", collection.lamps);
        log_collection_size!("armatures", collection.armatures);
        log_collection_size!("curves", collection.curves);

        Ok(collection)
    }

    /// Register `object` and its datablocks; `false` for a repeated name
    fn add_object(&mut self, scene: &'a Scene, object: &'a Object) -> Result<bool> {
        if self.objects.contains(&object.name) {
            debug!(object = %object.name, "Object already collected");
            return Ok(false);
        }

        match &object.data {
            ObjectData::Empty => {}
            ObjectData::Mesh(name) => {
                let mesh = scene.mesh(name)?;
                if self.meshes.insert(mesh) {
                    mesh.validate()?;
                    self.add_materials(scene, mesh)
                        .with_context(|| format!("mesh \"{}\"", mesh.name))?;
                }
                self.meshes.add_user(name, object);
            }
            ObjectData::Lamp(name) => {
                self.lamps.insert(scene.lamp(name)?);
                self.lamps.add_user(name, object);
            }
            ObjectData::Camera(name) => {
                self.cameras.insert(scene.camera(name)?);
                self.cameras.add_user(name, object);
            }
            ObjectData::Curve(name) => {
                self.curves.insert(scene.curve(name)?);
                self.curves.add_user(name, object);
            }
            ObjectData::Armature(name) => {
                let armature = scene.armature(name)?;
                if self.armatures.insert(armature) {
                    armature.validate()?;
                }
                self.armatures.add_user(name, object);
            }
        }

        Ok(self.objects.insert(object))
    }

    fn add_materials(&mut self, scene: &'a Scene, mesh: &'a Mesh) -> Result<()> {
        for name in mesh.materials.iter().flatten() {
            let material = scene.material(name)?;
            if !self.materials.insert(material) {
                continue;
            }

            for (idx, slot) in material.texture_slots.iter().enumerate() {
                if material.texture_slots[..idx].iter().any(|s| s.name == slot.name) {
                    return Err(Error::consistency(format!(
                        "material \"{}\" has two slots named \"{}\"",
                        material.name, slot.name
                    )));
                }

                let texture = scene
                    .texture(&slot.texture)
                    .with_context(|| format!("slot \"{}\" of material \"{}\"", slot.name, material.name))?;
                if !texture.is_image() {
                    return Err(Error::unsupported(
                        "texture",
                        texture.name.clone(),
                        texture.texture_type.as_str(),
                    )
                    .with_context(format!("material \"{}\"", material.name)));
                }
                self.textures.insert(texture);
            }
        }
        Ok(())
    }

    fn check_parents(&self) -> Result<()> {
        for entry in &self.objects {
            if let Some(parent) = &entry.data.parent {
                if !self.objects.contains(parent) {
                    return Err(Error::not_found("Object", parent.clone())
                        .with_context(format!("parent of object \"{}\"", entry.key)));
                }
            }
        }
        Ok(())
    }

    /// Registry sizes in section order
    pub fn counts(&self) -> SectionCounts {
        SectionCounts {
            textures: self.textures.len(),
            materials: self.materials.len(),
            meshes: self.meshes.len(),
            cameras: self.cameras.len(),
            armatures: self.armatures.len(),
            curves: self.curves.len(),
            lamps: self.lamps.len(),
            objects: self.objects.len(),
        }
    }

    /// Tracks exported with an object: the ones not driving bones
    pub fn object_tracks<'c>(&'c self, entry: &'c Entry<'a, Object>) -> Vec<&'c Track> {
        entry.tracks().iter().filter(|t| !t.skeletal).collect()
    }

    /// Tracks exported with an armature: skeletal tracks of all its users
    pub fn skeletal_tracks(&self, entry: &Entry<'a, Armature>) -> Vec<&Track> {
        entry
            .users
            .iter()
            .filter_map(|user| self.objects.lookup(&user.name))
            .flat_map(|object| object.tracks().iter().filter(|t| t.skeletal))
            .collect()
    }

    /// Vertex group names of the first object using `mesh`
    pub fn vertex_groups(&self, entry: &Entry<'a, Mesh>) -> &'a [String] {
        entry
            .users
            .first()
            .map(|&user| user.vertex_groups.as_slice())
            .unwrap_or(&[])
    }
}

impl<'a> Default for Collection<'a> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bxporter_scene::{TextureSlot, TextureType};

    fn make_scene() -> Scene {
        let mut mesh = Mesh::new("CubeMesh");
        mesh.materials = vec![Some("Wood".into()), None, Some("Wood".into())];

        let mut wood = Material::new("Wood");
        wood.texture_slots.push(TextureSlot::new("Grain", "GrainTex"));

        Scene {
            objects: vec![
                Object::new("A", ObjectData::Mesh("CubeMesh".into())),
                Object::new("B", ObjectData::Mesh("CubeMesh".into())).with_parent("A"),
                Object::new("Light", ObjectData::Lamp("Sun".into())),
                Object::new("Pivot", ObjectData::Empty),
            ],
            meshes: vec![mesh],
            materials: vec![wood],
            textures: vec![Texture::image("GrainTex", "//grain.png")],
            lamps: vec![Lamp::new("Sun")],
            ..Default::default()
        }
    }

    #[test]
    fn test_collect_deduplicates() {
        let scene = make_scene();
        let collection = Collection::collect(&scene, &ExportOptions::default()).unwrap();

        let counts = collection.counts();
        assert_eq!(counts.objects, 4);
        assert_eq!(counts.meshes, 1);
        assert_eq!(counts.materials, 1);
        assert_eq!(counts.textures, 1);
        assert_eq!(counts.lamps, 1);
        assert_eq!(counts.cameras, 0);

        let mesh = collection.meshes.lookup("CubeMesh").unwrap();
        assert_eq!(mesh.users.len(), 2);
        assert_eq!(collection.objects.id_of("Pivot"), Some(3));
    }

    #[test]
    fn test_missing_datablock() {
        let mut scene = make_scene();
        scene.objects.push(Object::new("Cam", ObjectData::Camera("Lens".into())));

        let err = Collection::collect(&scene, &ExportOptions::default()).unwrap_err();
        assert!(err.is_reference_not_found());
        assert!(err.to_string().contains("object \"Cam\""));
    }

    #[test]
    fn test_non_image_texture_rejected() {
        let mut scene = make_scene();
        scene.textures[0] = Texture::procedural("GrainTex", TextureType::Wood);

        let err = Collection::collect(&scene, &ExportOptions::default()).unwrap_err();
        assert!(err.is_unsupported_type());
        assert!(err.to_string().contains("WOOD"));
    }

    #[test]
    fn test_unselected_parent() {
        let mut scene = make_scene();
        scene.objects.remove(0);

        let err = Collection::collect(&scene, &ExportOptions::default()).unwrap_err();
        assert!(err.is_reference_not_found());
    }

    #[test]
    fn test_section_counts_array() {
        let counts = SectionCounts::from_array([1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(counts.lamps, 7);
        assert_eq!(counts.to_array(), [1, 2, 3, 4, 5, 6, 7, 8]);
    }
}
