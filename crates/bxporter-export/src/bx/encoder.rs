//! Fixed-schema encoder
//!
//! Every section iterates its registry in id order. Cross references are
//! resolved to registry ids while writing; an unresolved reference aborts
//! the whole encode.

use std::io::Write;

use bxporter_core::{material_flags, Color, DatablockKind, GraphCode, Result, ResultExt};
use bxporter_scene::{Armature, Bone, Camera, Curve, Lamp, Material, Mesh, Object, Texture, TextureSlot};
use glam::Vec3;
use tracing::debug;

use super::writer::BxWriter;
use super::{BX_MAGIC, BX_VERSION};
use crate::animation::{Keyframe, Track};
use crate::collect::Collection;
use crate::exporter::Encoder;
use crate::log_section;
use crate::logging::log_progress;
use crate::registry::{Entry, Registry};

/// Writes `.bx` files
#[derive(Debug, Clone, Copy, Default)]
pub struct BxEncoder;

impl Encoder for BxEncoder {
    fn name(&self) -> &'static str {
        "bx"
    }

    fn extension(&self) -> &'static str {
        "bx"
    }

    fn encode(&self, collection: &Collection<'_>, out: &mut Vec<u8>) -> Result<()> {
        let mut w = BxWriter::new(out);
        SectionWriter {
            w: &mut w,
            c: collection,
        }
        .write_all()
    }
}

struct SectionWriter<'w, 'c, 'a, W: Write> {
    w: &'w mut BxWriter<W>,
    c: &'c Collection<'a>,
}

impl<'w, 'c, 'a, W: Write> SectionWriter<'w, 'c, 'a, W> {
    fn write_all(&mut self) -> Result<()> {
        let c = self.c;
        self.w.write_str(BX_MAGIC)?;
        self.w.write_int(BX_VERSION)?;
        for count in c.counts().to_array() {
            self.w.write_count(count)?;
        }

        log_section!("bx", "textures", c.textures.len());
        for entry in &c.textures {
            self.write_texture(entry.data)
                .with_context(|| format!("texture \"{}\"", entry.key))?;
        }

        log_section!("bx", "materials", c.materials.len());
        for entry in &c.materials {
            self.write_material(entry.data)
                .with_context(|| format!("material \"{}\"", entry.key))?;
        }

        log_section!("bx", "meshes", c.meshes.len());
        for entry in &c.meshes {
            self.write_mesh(entry.data)
                .with_context(|| format!("mesh \"{}\"", entry.key))?;
        }

        log_section!("bx", "cameras", c.cameras.len());
        for entry in &c.cameras {
            self.write_camera(entry.data)
                .with_context(|| format!("camera \"{}\"", entry.key))?;
        }

        log_section!("bx", "armatures", c.armatures.len());
        for entry in &c.armatures {
            self.write_armature(entry)
                .with_context(|| format!("armature \"{}\"", entry.key))?;
        }

        log_section!("bx", "curves", c.curves.len());
        for entry in &c.curves {
            self.write_curve(entry.data)
                .with_context(|| format!("curve \"{}\"", entry.key))?;
        }

        log_section!("bx", "lamps", c.lamps.len());
        for entry in &c.lamps {
            self.write_lamp(entry.data)
                .with_context(|| format!("lamp \"{}\"", entry.key))?;
        }

        log_section!("bx", "objects", c.objects.len());
        for entry in &c.objects {
            self.write_object(entry)
                .with_context(|| format!("object \"{}\"", entry.key))?;
        }

        Ok(())
    }

    fn write_texture(&mut self, texture: &Texture) -> Result<()> {
        debug!(texture = %texture.name, "Texture");
        self.w.write_str(&texture.name)?;
        self.w.write_str(texture.image_basename().unwrap_or_default())
    }

    fn write_material(&mut self, material: &Material) -> Result<()> {
        debug!(material = %material.name, slots = material.texture_slots.len(), "Material");
        let [dr, dg, db] = material.diffuse_color;
        let [sr, sg, sb] = material.specular_color;

        self.w.write_str(&material.name)?;
        self.w.write_vec4([dr, dg, db, material.alpha])?;
        self.w.write_vec4([sr, sg, sb, 1.0])?;
        self.w.write_float(material.diffuse_intensity)?;
        self.w.write_float(material.specular_intensity)?;
        self.w.write_float(material.ambient)?;

        let mut flags = 0;
        if material.uses_alpha_blend() {
            flags |= material_flags::ALPHA;
        }
        self.w.write_int(flags)?;

        self.w.write_count(material.texture_slots.len())?;
        for slot in &material.texture_slots {
            self.write_slot(slot)
                .with_context(|| format!("slot \"{}\"", slot.name))?;
        }
        Ok(())
    }

    fn write_slot(&mut self, slot: &TextureSlot) -> Result<()> {
        self.w.write_str(&slot.name)?;
        self.w.write_int(slot.texture_mapping().to_i32())?;
        self.w.write_int(slot.mapping.to_i32())?;
        self.w.write_vec3(slot.offset)?;
        self.w.write_vec3(slot.scale)?;
        self.w.write_str(&slot.uv_layer)?;

        let factors = slot.influence.factors();
        self.w.write_count(factors.len())?;
        for (filter, factor) in factors {
            self.w.write_int(filter.to_i32())?;
            self.w.write_float(factor)?;
        }

        let texture = self.c.textures.require("Texture", &slot.texture)?;
        self.w.write_int(texture.id_i32())
    }

    fn write_mesh(&mut self, mesh: &Mesh) -> Result<()> {
        debug!(
            mesh = %mesh.name,
            vertices = mesh.vertex_count(),
            polygons = mesh.polygon_count(),
            "Mesh"
        );
        let colors = mesh.active_colors();

        self.w.write_str(&mesh.name)?;
        self.w.write_count(mesh.vertex_count())?;
        self.w.write_count(mesh.polygon_count())?;
        self.w.write_count(mesh.materials.len())?;
        self.w.write_count(mesh.uv_layers.len())?;
        // vertex groups
        self.w.write_int(0)?;
        self.w.write_bool(colors.is_some())?;
        // shape keys
        self.w.write_int(0)?;

        for slot in &mesh.materials {
            let id = match slot {
                Some(name) => self.c.materials.require("Material", name)?.id_i32(),
                None => -1,
            };
            self.w.write_int(id)?;
        }
        for layer in &mesh.uv_layers {
            self.w.write_str(&layer.name)?;
        }

        for vertex in &mesh.vertices {
            self.w.write_vec3(vertex.co)?;
            self.w.write_vec3(vertex.normal)?;
            self.w.write_int(0)?;
        }

        let mut loop_index = 0;
        let total = mesh.polygon_count();
        for (idx, polygon) in mesh.polygons.iter().enumerate() {
            self.w.write_count(polygon.vertices.len())?;
            self.w.write_int(polygon.material_index)?;
            for &vertex in &polygon.vertices {
                self.w.write_int(vertex as i32)?;
                for layer in &mesh.uv_layers {
                    self.w.write_vec2(layer.data[loop_index])?;
                }
                if let Some(colors) = colors {
                    self.w.write_col4ub(Color::from_unit_rgb(colors.data[loop_index]))?;
                }
                loop_index += 1;
            }
            log_progress(idx + 1, total);
        }
        Ok(())
    }

    fn write_camera(&mut self, camera: &Camera) -> Result<()> {
        debug!(camera = %camera.name, "Camera");
        self.w.write_str(&camera.name)?;
        self.w.write_float(camera.fov_degrees())?;
        self.w.write_float(camera.clip_start)?;
        self.w.write_float(camera.clip_end)
    }

    fn write_armature(&mut self, entry: &Entry<'a, Armature>) -> Result<()> {
        let armature = entry.data;
        debug!(armature = %armature.name, bones = armature.bone_count(), "Armature");
        self.w.write_str(&armature.name)?;

        let mut bones: Registry<'_, Bone> = Registry::new();
        for bone in &armature.bones {
            bones.insert(bone);
        }

        self.w.write_count(bones.len())?;
        for bone in &bones {
            self.w.write_str(&bone.key)?;

            let (parent_id, origin) = match &bone.data.parent {
                Some(parent) => {
                    let parent = bones.require("Bone", parent)?;
                    (parent.id_i32(), Vec3::from(parent.data.tail_local))
                }
                None => (-1, Vec3::ZERO),
            };
            self.w.write_int(parent_id)?;
            self.w.write_glam_vec3(Vec3::from(bone.data.head_local) - origin)?;
            self.w.write_glam_vec3(Vec3::from(bone.data.tail_local) - origin)?;
        }

        let c = self.c;
        let tracks = c.skeletal_tracks(entry);
        debug!(tracks = tracks.len(), "Skeletal tracks");
        self.w.write_count(tracks.len())?;
        for track in tracks {
            self.w.write_str(&track.name)?;
            self.w.write_count(track.strips.len())?;
            for strip in &track.strips {
                self.w.write_vec2(strip.range)?;
                self.w.write_count(strip.bones.len())?;
                for bone in &strip.bones {
                    self.w.write_str(&bone.name)?;
                    self.w.write_count(bone.groups.graph_count())?;
                    self.write_graphs(bone.groups.graphs())?;
                }
            }
        }
        Ok(())
    }

    fn write_curve(&mut self, curve: &Curve) -> Result<()> {
        debug!(curve = %curve.name, splines = curve.splines.len(), "Curve");
        self.w.write_str(&curve.name)?;
        self.w.write_int(curve.resolution_u)?;
        self.w.write_count(curve.splines.len())?;
        for spline in &curve.splines {
            self.w.write_count(spline.bezier_points.len())?;
            for point in &spline.bezier_points {
                self.w.write_vec3(point.handle_left)?;
                self.w.write_vec3(point.co)?;
                self.w.write_vec3(point.handle_right)?;
            }
        }
        Ok(())
    }

    fn write_lamp(&mut self, lamp: &Lamp) -> Result<()> {
        debug!(lamp = %lamp.name, "Lamp");
        self.w.write_str(&lamp.name)?;
        self.w.write_vec3(lamp.color)?;
        self.w.write_float(lamp.energy)?;
        self.w.write_float(lamp.distance)
    }

    fn write_object(&mut self, entry: &Entry<'a, Object>) -> Result<()> {
        let object = entry.data;
        let kind = object.data.kind();
        debug!(object = %object.name, kind = ?kind, "Object");

        self.w.write_str(&object.name)?;
        self.w.write_int(kind.to_i32())?;
        if let Some(name) = object.data.datablock_name() {
            self.w.write_int(self.datablock_id(kind, name)?)?;
        }

        let parent = match &object.parent {
            Some(name) => self.c.objects.require("Object", name)?.id_i32() + 1,
            None => 0,
        };
        self.w.write_int(parent)?;

        let transform = object.transform();
        self.w.write_glam_vec3(transform.position)?;
        self.w.write_quat(transform.rotation)?;
        self.w.write_glam_vec3(transform.scale)?;

        let c = self.c;
        let tracks = c.object_tracks(entry);
        self.write_object_tracks(&tracks)
    }

    fn datablock_id(&self, kind: DatablockKind, name: &str) -> Result<i32> {
        let id = match kind {
            DatablockKind::Mesh => self.c.meshes.require("Mesh", name)?.id,
            DatablockKind::Lamp => self.c.lamps.require("Lamp", name)?.id,
            DatablockKind::Camera => self.c.cameras.require("Camera", name)?.id,
            DatablockKind::Curve => self.c.curves.require("Curve", name)?.id,
            DatablockKind::Armature => self.c.armatures.require("Armature", name)?.id,
            DatablockKind::Object | DatablockKind::Material | DatablockKind::Texture => {
                return Err(bxporter_core::Error::unsupported(
                    "object datablock",
                    name,
                    format!("{:?}", kind),
                ))
            }
        };
        Ok(id as i32)
    }

    fn write_object_tracks(&mut self, tracks: &[&Track]) -> Result<()> {
        self.w.write_count(tracks.len())?;
        for track in tracks {
            self.w.write_str(&track.name)?;
            self.w.write_count(track.strips.len())?;
            for strip in &track.strips {
                self.w.write_vec2(strip.range)?;
                // groups are not used
                self.w.write_int(0)?;
                self.w.write_count(strip.object.graph_count())?;
                self.write_graphs(strip.object.graphs())?;
            }
        }
        Ok(())
    }

    fn write_graphs<'g>(
        &mut self,
        graphs: impl Iterator<Item = (GraphCode, &'g [Keyframe])>,
    ) -> Result<()> {
        for (code, keys) in graphs {
            self.w.write_int(code.to_i32())?;
            self.w.write_count(keys.len())?;
            for key in keys {
                self.w.write_floats(&key.to_floats())?;
            }
        }
        Ok(())
    }
}
