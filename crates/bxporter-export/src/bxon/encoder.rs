//! Self-describing tree encoder
//!
//! Builds one [`MapNode`] per resource kind under the root and refers to
//! other entities by name instead of id.

use bxporter_core::{Error, Result, ResultExt};
use bxporter_scene::{Armature, Camera, Curve, Lamp, Material, Mesh, Object, Texture, TextureSlot};
use glam::Vec3;
use tracing::{debug, warn};

use super::node::{ArrayNode, MapNode, Node};
use super::writer;
use crate::animation::{ChannelGroups, Track};
use crate::collect::Collection;
use crate::exporter::Encoder;
use crate::log_section;
use crate::registry::Entry;

/// Writes `.bxon` files
#[derive(Debug, Clone, Copy, Default)]
pub struct BxonEncoder;

impl Encoder for BxonEncoder {
    fn name(&self) -> &'static str {
        "bxon"
    }

    fn extension(&self) -> &'static str {
        "bxon"
    }

    fn encode(&self, collection: &Collection<'_>, out: &mut Vec<u8>) -> Result<()> {
        let root = build_tree(collection)?;
        writer::flush(&Node::Map(root), out)
    }
}

/// Build the whole document tree
pub fn build_tree(c: &Collection<'_>) -> Result<MapNode> {
    let mut root = MapNode::new();

    log_section!("bxon", "textures", c.textures.len());
    let mut textures = MapNode::new();
    for entry in &c.textures {
        textures
            .put(entry.key.as_str(), texture_node(entry.data)?)
            .with_context(|| format!("texture \"{}\"", entry.key))?;
    }
    root.put("texture", textures)?;

    log_section!("bxon", "materials", c.materials.len());
    let mut materials = MapNode::new();
    for entry in &c.materials {
        let node = material_node(c, entry.data).with_context(|| format!("material \"{}\"", entry.key))?;
        materials.put(entry.key.as_str(), node)?;
    }
    root.put("material", materials)?;

    log_section!("bxon", "meshes", c.meshes.len());
    let mut meshes = MapNode::new();
    for entry in &c.meshes {
        let node = mesh_node(c, entry).with_context(|| format!("mesh \"{}\"", entry.key))?;
        meshes.put(entry.key.as_str(), node)?;
    }
    root.put("mesh", meshes)?;

    log_section!("bxon", "cameras", c.cameras.len());
    let mut cameras = MapNode::new();
    for entry in &c.cameras {
        let node = camera_node(entry.data).with_context(|| format!("camera \"{}\"", entry.key))?;
        cameras.put(entry.key.as_str(), node)?;
    }
    root.put("camera", cameras)?;

    log_section!("bxon", "armatures", c.armatures.len());
    let mut armatures = MapNode::new();
    for entry in &c.armatures {
        let node = armature_node(c, entry).with_context(|| format!("armature \"{}\"", entry.key))?;
        armatures.put(entry.key.as_str(), node)?;
    }
    root.put("armature", armatures)?;

    log_section!("bxon", "curves", c.curves.len());
    let mut curves = MapNode::new();
    for entry in &c.curves {
        let node = curve_node(entry.data).with_context(|| format!("curve \"{}\"", entry.key))?;
        curves.put(entry.key.as_str(), node)?;
    }
    root.put("curve", curves)?;

    log_section!("bxon", "lamps", c.lamps.len());
    let mut lamps = MapNode::new();
    for entry in &c.lamps {
        let node = lamp_node(entry.data).with_context(|| format!("lamp \"{}\"", entry.key))?;
        lamps.put(entry.key.as_str(), node)?;
    }
    root.put("lamp", lamps)?;

    log_section!("bxon", "objects", c.objects.len());
    let mut objects = MapNode::new();
    for entry in &c.objects {
        let node = object_node(c, entry).with_context(|| format!("object \"{}\"", entry.key))?;
        objects.put(entry.key.as_str(), node)?;
    }
    root.put("object", objects)?;

    Ok(root)
}

/// Single-element float array
fn vector(values: &[f32]) -> Result<ArrayNode> {
    let mut array = ArrayNode::floats(values.len()).with_count(1);
    array.push_floats(values)?;
    Ok(array)
}

fn texture_node(texture: &Texture) -> Result<MapNode> {
    debug!(texture = %texture.name, "Texture");
    let mut node = MapNode::new();
    node.put("type", "image")?;
    node.put("filename", texture.image_basename().unwrap_or_default())?;
    Ok(node)
}

fn material_node(c: &Collection<'_>, material: &Material) -> Result<MapNode> {
    debug!(material = %material.name, "Material");
    let mut node = MapNode::new();
    node.put("diffuse", vector(&material.diffuse_color)?)?;
    node.put("alpha", material.alpha)?;
    node.put("specular", vector(&material.specular_color)?)?;
    node.put("diffuse_intensity", material.diffuse_intensity)?;
    node.put("specular_intensity", material.specular_intensity)?;
    node.put("ambient", material.ambient)?;
    if material.uses_alpha_blend() {
        node.put("transparency_method", "alpha_blend")?;
    }

    let mut slots = MapNode::new();
    for slot in &material.texture_slots {
        let slot_node = slot_node(c, slot).with_context(|| format!("slot \"{}\"", slot.name))?;
        slots.put(slot.name.as_str(), slot_node)?;
    }
    node.put("texture_slots", slots)?;
    Ok(node)
}

fn slot_node(c: &Collection<'_>, slot: &TextureSlot) -> Result<MapNode> {
    let texture = c.textures.require("Texture", &slot.texture)?;

    let mut node = MapNode::new();
    node.put("mapping", slot.texture_mapping().tree_name())?;
    node.put("projection", slot.mapping.tree_name())?;
    node.put("offset", vector(&slot.offset)?)?;
    node.put("scale", vector(&slot.scale)?)?;
    if !slot.uv_layer.is_empty() {
        node.put("uv_layer", slot.uv_layer.as_str())?;
    }

    let mut properties = MapNode::new();
    for (filter, factor) in slot.influence.factors() {
        properties.put(filter.tree_name(), factor)?;
    }
    node.put("properties", properties)?;
    node.put("texture", texture.key.as_str())?;
    Ok(node)
}

/// Faces of one corner count with their material indices and uvs
struct FaceSet {
    corners: usize,
    faces: ArrayNode,
    materials: ArrayNode,
    uvs: ArrayNode,
}

impl FaceSet {
    fn new(mesh: &Mesh, corners: usize) -> Self {
        let count = mesh.polygons.iter().filter(|p| p.vertices.len() == corners).count();
        Self {
            corners,
            faces: ArrayNode::ints(corners).with_count(count),
            materials: ArrayNode::ints(1).with_count(count),
            uvs: ArrayNode::floats(2).with_count(count * corners * mesh.uv_layers.len()),
        }
    }

    fn put_into(self, node: &mut MapNode, with_materials: bool, with_uvs: bool) -> Result<()> {
        if self.faces.count() == 0 {
            return Ok(());
        }
        let prefix = format!("faces{}", self.corners);
        if with_materials {
            node.put(format!("{}mat", prefix), self.materials)?;
        }
        if with_uvs {
            node.put(format!("{}uv", prefix), self.uvs)?;
        }
        node.put(prefix, self.faces)?;
        Ok(())
    }
}

fn mesh_node(c: &Collection<'_>, entry: &Entry<'_, Mesh>) -> Result<MapNode> {
    let mesh = entry.data;
    debug!(mesh = %mesh.name, vertices = mesh.vertex_count(), "Mesh");

    let mut node = MapNode::new();
    let mut positions = ArrayNode::floats(3).with_count(mesh.vertex_count());
    let mut normals = ArrayNode::floats(3).with_count(mesh.vertex_count());
    for vertex in &mesh.vertices {
        positions.push_floats(&vertex.co)?;
        normals.push_floats(&vertex.normal)?;
    }
    node.put("positions", positions)?;
    node.put("normals", normals)?;

    if !mesh.materials.is_empty() {
        let mut materials = ArrayNode::nodes();
        for slot in &mesh.materials {
            // empty slots keep their position so material indices stay valid
            let name = match slot {
                Some(name) => c.materials.require("Material", name)?.key.as_str(),
                None => "",
            };
            materials.push_node(name)?;
        }
        node.put("materials", materials)?;
    }

    let groups = c.vertex_groups(entry);
    if !groups.is_empty() {
        let mut names = ArrayNode::nodes();
        for group in groups {
            names.push_node(group.as_str())?;
        }
        node.put("vertex_groups", names)?;

        let mut weights = ArrayNode::nodes();
        for vertex in &mesh.vertices {
            let mut pairs = ArrayNode::nodes();
            for weight in &vertex.groups {
                pairs.push_node(weight.group)?;
                pairs.push_node(weight.weight)?;
            }
            weights.push_node(pairs)?;
        }
        node.put("vertex_weights", weights)?;
    }

    let mut tris = FaceSet::new(mesh, 3);
    let mut quads = FaceSet::new(mesh, 4);
    let mut loop_index = 0;
    let mut skipped = 0;
    for polygon in &mesh.polygons {
        let corners = polygon.vertices.len();
        let set = match corners {
            3 => Some(&mut tris),
            4 => Some(&mut quads),
            _ => None,
        };

        if let Some(set) = set {
            let indices: Vec<i32> = polygon.vertices.iter().map(|&v| v as i32).collect();
            set.faces.push_ints(&indices)?;
            set.materials.push_ints(&[polygon.material_index])?;
            for corner in 0..corners {
                for layer in &mesh.uv_layers {
                    set.uvs.push_floats(&layer.data[loop_index + corner])?;
                }
            }
        } else {
            skipped += 1;
        }
        loop_index += corners;
    }
    if skipped > 0 {
        warn!(mesh = %mesh.name, polygons = skipped, "Skipping polygons with more than four corners");
    }

    let with_materials = mesh.materials.len() > 1;
    let with_uvs = !mesh.uv_layers.is_empty();
    tris.put_into(&mut node, with_materials, with_uvs)?;
    quads.put_into(&mut node, with_materials, with_uvs)?;

    Ok(node)
}

fn camera_node(camera: &Camera) -> Result<MapNode> {
    debug!(camera = %camera.name, "Camera");
    let mut node = MapNode::new();
    node.put("fov", camera.fov_degrees())?;
    node.put("start", camera.clip_start)?;
    node.put("end", camera.clip_end)?;
    Ok(node)
}

fn armature_node(c: &Collection<'_>, entry: &Entry<'_, Armature>) -> Result<MapNode> {
    let armature = entry.data;
    debug!(armature = %armature.name, bones = armature.bone_count(), "Armature");

    let mut bones = MapNode::new();
    for bone in &armature.bones {
        let mut bone_node = MapNode::new();
        let origin = match &bone.parent {
            Some(parent) => {
                let parent_bone = armature
                    .find_bone(parent)
                    .ok_or_else(|| Error::not_found("Bone", parent.clone()))?;
                bone_node.put("parent", parent.as_str())?;
                Vec3::from(parent_bone.tail_local)
            }
            None => Vec3::ZERO,
        };
        let head = Vec3::from(bone.head_local) - origin;
        let tail = Vec3::from(bone.tail_local) - origin;
        bone_node.put("head", vector(&head.to_array())?)?;
        bone_node.put("tail", vector(&tail.to_array())?)?;
        bones
            .put(bone.name.as_str(), bone_node)
            .with_context(|| format!("bone \"{}\"", bone.name))?;
    }

    let mut node = MapNode::new();
    node.put("bones", bones)?;

    let tracks = c.skeletal_tracks(entry);
    if !tracks.is_empty() {
        node.put("animation", skeletal_animation_node(&tracks)?)?;
    }
    Ok(node)
}

fn curve_node(curve: &Curve) -> Result<MapNode> {
    debug!(curve = %curve.name, "Curve");
    let mut splines = ArrayNode::nodes();
    for spline in &curve.splines {
        let count = spline.bezier_points.len();
        let mut left = ArrayNode::floats(3).with_count(count);
        let mut center = ArrayNode::floats(3).with_count(count);
        let mut right = ArrayNode::floats(3).with_count(count);
        for point in &spline.bezier_points {
            left.push_floats(&point.handle_left)?;
            center.push_floats(&point.co)?;
            right.push_floats(&point.handle_right)?;
        }

        let mut spline_node = MapNode::new();
        spline_node.put("left", left)?;
        spline_node.put("center", center)?;
        spline_node.put("right", right)?;
        splines.push_node(spline_node)?;
    }

    let mut node = MapNode::new();
    node.put("resolution", curve.resolution_u)?;
    node.put("splines", splines)?;
    Ok(node)
}

fn lamp_node(lamp: &Lamp) -> Result<MapNode> {
    debug!(lamp = %lamp.name, "Lamp");
    let mut node = MapNode::new();
    node.put("color", vector(&lamp.color)?)?;
    node.put("energy", lamp.energy)?;
    node.put("distance", lamp.distance)?;
    Ok(node)
}

fn object_node(c: &Collection<'_>, entry: &Entry<'_, Object>) -> Result<MapNode> {
    let object = entry.data;
    let kind = object.data.kind();
    debug!(object = %object.name, kind = ?kind, "Object");

    let mut datablock = MapNode::new();
    datablock.put("type", kind.tree_name())?;
    if let Some(name) = object.data.datablock_name() {
        datablock.put("id", name)?;
    }

    let mut node = MapNode::new();
    node.put("datablock", datablock)?;
    if let Some(parent) = &object.parent {
        let parent = c.objects.require("Object", parent)?;
        node.put("parent", parent.key.as_str())?;
    }

    let transform = object.transform();
    let q = transform.rotation;
    node.put("position", vector(&transform.position.to_array())?)?;
    node.put("quaternion", vector(&[q.w, q.x, q.y, q.z])?)?;
    node.put("scale", vector(&transform.scale.to_array())?)?;

    let tracks = c.object_tracks(entry);
    if !tracks.is_empty() {
        node.put("animation", object_animation_node(&tracks)?)?;
    }
    Ok(node)
}

fn graphs_node(groups: &ChannelGroups) -> Result<ArrayNode> {
    let mut graphs = ArrayNode::nodes();
    for (code, keys) in groups.graphs() {
        let mut keyframes = ArrayNode::floats(6).with_count(keys.len());
        for key in keys {
            keyframes.push_floats(&key.to_floats())?;
        }

        let mut graph = MapNode::new();
        graph.put("code", code.to_i32())?;
        graph.put("keyframes", keyframes)?;
        graphs.push_node(graph)?;
    }
    Ok(graphs)
}

fn track_node(track: &Track, strips: ArrayNode) -> Result<MapNode> {
    let mut node = MapNode::new();
    node.put("name", track.name.as_str())?;
    node.put("strips", strips)?;
    Ok(node)
}

fn object_animation_node(tracks: &[&Track]) -> Result<ArrayNode> {
    let mut animation = ArrayNode::nodes();
    for track in tracks {
        let mut strips = ArrayNode::nodes();
        for strip in &track.strips {
            let mut strip_node = MapNode::new();
            strip_node.put("range", vector(&strip.range)?)?;
            strip_node.put("graphs", graphs_node(&strip.object)?)?;
            strips.push_node(strip_node)?;
        }
        animation.push_node(track_node(track, strips)?)?;
    }
    Ok(animation)
}

fn skeletal_animation_node(tracks: &[&Track]) -> Result<ArrayNode> {
    let mut animation = ArrayNode::nodes();
    for track in tracks {
        let mut strips = ArrayNode::nodes();
        for strip in &track.strips {
            let mut bones = MapNode::new();
            for bone in &strip.bones {
                bones.put(bone.name.as_str(), graphs_node(&bone.groups)?)?;
            }

            let mut strip_node = MapNode::new();
            strip_node.put("range", vector(&strip.range)?)?;
            strip_node.put("bones", bones)?;
            strips.push_node(strip_node)?;
        }
        animation
            .push_node(track_node(track, strips)?)
            .with_context(|| format!("track \"{}\"", track.name))?;
    }
    Ok(animation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::ExportOptions;
    use bxporter_scene::{Bone, ObjectData, Polygon, Scene, UvLayer, Vertex};

    fn make_quad_mesh() -> Mesh {
        let mut mesh = Mesh::new("Plane");
        for co in [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]] {
            mesh.vertices.push(Vertex::new(co, [0.0, 0.0, 1.0]));
        }
        mesh.polygons.push(Polygon::new(vec![0, 1, 2, 3], 0));
        mesh.polygons.push(Polygon::new(vec![0, 1, 2], 0));
        mesh.uv_layers.push(UvLayer {
            name: "UVMap".into(),
            data: vec![[0.0, 0.0]; 7],
        });
        mesh
    }

    #[test]
    fn test_mesh_splits_tris_and_quads() {
        let scene = Scene {
            objects: vec![Object::new("Plane", ObjectData::Mesh("Plane".into()))],
            meshes: vec![make_quad_mesh()],
            ..Default::default()
        };
        let collection = Collection::collect(&scene, &ExportOptions::default()).unwrap();
        let root = Node::Map(build_tree(&collection).unwrap());

        let mesh = root.path(&["mesh", "Plane"]).unwrap();
        let faces3 = mesh.get("faces3").and_then(Node::as_array).unwrap();
        let faces4 = mesh.get("faces4").and_then(Node::as_array).unwrap();
        assert_eq!((faces3.count(), faces3.stride()), (1, 3));
        assert_eq!((faces4.count(), faces4.stride()), (1, 4));
        assert_eq!(mesh.get("faces4uv").and_then(Node::as_array).unwrap().count(), 4);
        assert!(mesh.get("faces3mat").is_none());
    }

    #[test]
    fn test_root_keys_in_section_order() {
        let collection = Collection::new();
        let root = build_tree(&collection).unwrap();
        let keys: Vec<&str> = root.keys().collect();
        assert_eq!(
            keys,
            vec!["texture", "material", "mesh", "camera", "armature", "curve", "lamp", "object"]
        );
    }

    #[test]
    fn test_bone_head_relative_to_parent_tail() {
        let mut armature = Armature::new("Rig");
        armature.bones.push(Bone::new("Root", [0.0, 0.0, 0.0], [0.0, 0.0, 1.0]));
        armature
            .bones
            .push(Bone::new("Spine", [0.0, 0.0, 1.0], [0.0, 0.0, 3.0]).with_parent("Root"));
        let scene = Scene {
            objects: vec![Object::new("Rig", ObjectData::Armature("Rig".into()))],
            armatures: vec![armature],
            ..Default::default()
        };
        let collection = Collection::collect(&scene, &ExportOptions::default()).unwrap();
        let root = Node::Map(build_tree(&collection).unwrap());

        let spine = root.path(&["armature", "Rig", "bones", "Spine"]).unwrap();
        assert_eq!(spine.get("parent").and_then(Node::as_str), Some("Root"));
        let head = spine.get("head").and_then(Node::as_array).unwrap();
        let tail = spine.get("tail").and_then(Node::as_array).unwrap();
        assert_eq!(head.as_floats(), Some(&[0.0f32, 0.0, 0.0][..]));
        assert_eq!(tail.as_floats(), Some(&[0.0f32, 0.0, 2.0][..]));
    }

    #[test]
    fn test_empty_object_has_no_datablock_id() {
        let scene = Scene {
            objects: vec![Object::new("Pivot", ObjectData::Empty)],
            ..Default::default()
        };
        let collection = Collection::collect(&scene, &ExportOptions::default()).unwrap();
        let root = Node::Map(build_tree(&collection).unwrap());

        let datablock = root.path(&["object", "Pivot", "datablock"]).unwrap();
        assert_eq!(datablock.get("type").and_then(Node::as_str), Some("empty"));
        assert!(datablock.get("id").is_none());
        let quat = root.path(&["object", "Pivot", "quaternion"]).and_then(Node::as_array).unwrap();
        assert_eq!(quat.as_floats(), Some(&[1.0f32, 0.0, 0.0, 0.0][..]));
    }
}
