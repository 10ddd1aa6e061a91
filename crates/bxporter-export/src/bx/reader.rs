//! Fixed-schema decoder

use std::io::{self, Read};

use byteorder::{LittleEndian, ReadBytesExt};
use bxporter_core::{
    Color, DatablockKind, Error, GraphCode, Result, ResultExt, TextureFilter, TextureMapping,
    TextureProjection,
};
use bxporter_scene::{BezierPoint, Spline};

use super::document::*;
use super::{BX_MAGIC, BX_VERSION};
use crate::collect::SectionCounts;

/// Upper bound on counts before allocating, guards corrupt files
const MAX_COUNT: usize = 1 << 28;

/// Little-endian primitive reader tracking its position
pub struct BxReader<R: Read> {
    inner: R,
    pos: u64,
}

impl<R: Read> BxReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, pos: 0 }
    }

    /// Get the current read position.
    pub fn pos(&self) -> u64 {
        self.pos
    }

    fn eof(&self, err: io::Error) -> Error {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            Error::UnexpectedEof { offset: self.pos }
        } else {
            Error::Io(err)
        }
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        let v = self.inner.read_u8().map_err(|e| self.eof(e))?;
        self.pos += 1;
        Ok(v != 0)
    }

    pub fn read_int(&mut self) -> Result<i32> {
        let v = self.inner.read_i32::<LittleEndian>().map_err(|e| self.eof(e))?;
        self.pos += 4;
        Ok(v)
    }

    /// Read a non-negative i32 count
    pub fn read_count(&mut self) -> Result<usize> {
        let at = self.pos;
        let v = self.read_int()?;
        usize::try_from(v)
            .ok()
            .filter(|&n| n <= MAX_COUNT)
            .ok_or_else(|| Error::invalid_data(format!("bad count {} at offset {}", v, at)))
    }

    pub fn read_float(&mut self) -> Result<f32> {
        let v = self.inner.read_f32::<LittleEndian>().map_err(|e| self.eof(e))?;
        self.pos += 4;
        Ok(v)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[f32; N]> {
        let mut out = [0.0; N];
        for v in &mut out {
            *v = self.read_float()?;
        }
        Ok(out)
    }

    pub fn read_vec2(&mut self) -> Result<[f32; 2]> {
        self.read_array()
    }

    pub fn read_vec3(&mut self) -> Result<[f32; 3]> {
        self.read_array()
    }

    pub fn read_vec4(&mut self) -> Result<[f32; 4]> {
        self.read_array()
    }

    pub fn read_str(&mut self) -> Result<String> {
        let len = self.read_count()?;
        let mut buf = vec![0u8; len];
        self.inner.read_exact(&mut buf).map_err(|e| self.eof(e))?;
        self.pos += len as u64;
        String::from_utf8(buf).map_err(|e| Error::invalid_data(format!("string is not UTF-8: {}", e)))
    }

    pub fn read_col4ub(&mut self) -> Result<Color> {
        let mut buf = [0u8; 4];
        self.inner.read_exact(&mut buf).map_err(|e| self.eof(e))?;
        self.pos += 4;
        Ok(Color::new(buf[0], buf[1], buf[2], buf[3]))
    }

    fn read_list<T>(&mut self, mut f: impl FnMut(&mut Self) -> Result<T>) -> Result<Vec<T>> {
        let count = self.read_count()?;
        let mut items = Vec::with_capacity(count.min(4096));
        for _ in 0..count {
            items.push(f(self)?);
        }
        Ok(items)
    }

    /// Decode a whole file
    pub fn read_document(&mut self) -> Result<BxDocument> {
        let magic = self.read_str()?;
        if magic != BX_MAGIC {
            return Err(Error::InvalidMagic {
                expected: BX_MAGIC.as_bytes().to_vec(),
                found: magic.into_bytes(),
            });
        }

        let version = self.read_int()?;
        if version != BX_VERSION {
            return Err(Error::UnsupportedVersion {
                version: version as u32,
                supported: BX_VERSION as u32,
            });
        }

        let mut counts = [0usize; 8];
        for count in &mut counts {
            *count = self.read_count()?;
        }
        let counts = SectionCounts::from_array(counts);

        let mut doc = BxDocument {
            version: version as u32,
            counts,
            ..Default::default()
        };

        for i in 0..counts.textures {
            doc.textures.push(self.read_texture().with_context(|| format!("texture {}", i))?);
        }
        for i in 0..counts.materials {
            doc.materials.push(self.read_material().with_context(|| format!("material {}", i))?);
        }
        for i in 0..counts.meshes {
            doc.meshes.push(self.read_mesh().with_context(|| format!("mesh {}", i))?);
        }
        for i in 0..counts.cameras {
            doc.cameras.push(self.read_camera().with_context(|| format!("camera {}", i))?);
        }
        for i in 0..counts.armatures {
            doc.armatures.push(self.read_armature().with_context(|| format!("armature {}", i))?);
        }
        for i in 0..counts.curves {
            doc.curves.push(self.read_curve().with_context(|| format!("curve {}", i))?);
        }
        for i in 0..counts.lamps {
            doc.lamps.push(self.read_lamp().with_context(|| format!("lamp {}", i))?);
        }
        for i in 0..counts.objects {
            doc.objects.push(self.read_object().with_context(|| format!("object {}", i))?);
        }

        Ok(doc)
    }

    fn read_texture(&mut self) -> Result<BxTexture> {
        Ok(BxTexture {
            name: self.read_str()?,
            filename: self.read_str()?,
        })
    }

    fn read_material(&mut self) -> Result<BxMaterial> {
        Ok(BxMaterial {
            name: self.read_str()?,
            diffuse: self.read_vec4()?,
            specular: self.read_vec4()?,
            diffuse_intensity: self.read_float()?,
            specular_intensity: self.read_float()?,
            ambient: self.read_float()?,
            flags: self.read_int()?,
            slots: self.read_list(Self::read_slot)?,
        })
    }

    fn read_slot(&mut self) -> Result<BxTextureSlot> {
        let name = self.read_str()?;
        let mapping = self.read_int()?;
        let mapping = TextureMapping::from_i32(mapping)
            .ok_or_else(|| Error::invalid_data(format!("unknown texture mapping {}", mapping)))?;
        let projection = self.read_int()?;
        let projection = TextureProjection::from_i32(projection)
            .ok_or_else(|| Error::invalid_data(format!("unknown texture projection {}", projection)))?;
        let offset = self.read_vec3()?;
        let scale = self.read_vec3()?;
        let uv_layer = self.read_str()?;
        let properties = self.read_list(|r| {
            let filter = r.read_int()?;
            let filter = TextureFilter::from_i32(filter)
                .ok_or_else(|| Error::invalid_data(format!("unknown texture filter {}", filter)))?;
            Ok((filter, r.read_float()?))
        })?;
        let texture = self.read_int()?;

        Ok(BxTextureSlot {
            name,
            mapping,
            projection,
            offset,
            scale,
            uv_layer,
            properties,
            texture,
        })
    }

    fn read_mesh(&mut self) -> Result<BxMesh> {
        let name = self.read_str()?;
        let vertex_count = self.read_count()?;
        let polygon_count = self.read_count()?;
        let material_count = self.read_count()?;
        let uv_count = self.read_count()?;
        let vertex_groups = self.read_int()?;
        let has_colors = self.read_bool()?;
        let shape_keys = self.read_int()?;

        let mut materials = Vec::with_capacity(material_count.min(4096));
        for _ in 0..material_count {
            materials.push(self.read_int()?);
        }
        let mut uv_layers = Vec::with_capacity(uv_count.min(4096));
        for _ in 0..uv_count {
            uv_layers.push(self.read_str()?);
        }

        let mut vertices = Vec::with_capacity(vertex_count.min(1 << 16));
        for _ in 0..vertex_count {
            let co = self.read_vec3()?;
            let normal = self.read_vec3()?;
            // per-vertex group count, always zero
            self.read_int()?;
            vertices.push(BxVertex { co, normal });
        }

        let mut polygons = Vec::with_capacity(polygon_count.min(1 << 16));
        for _ in 0..polygon_count {
            let corner_count = self.read_count()?;
            let material_index = self.read_int()?;
            let mut corners = Vec::with_capacity(corner_count.min(64));
            for _ in 0..corner_count {
                let vertex = self.read_int()?;
                let mut uvs = Vec::with_capacity(uv_count);
                for _ in 0..uv_count {
                    uvs.push(self.read_vec2()?);
                }
                let color = if has_colors {
                    Some(self.read_col4ub()?)
                } else {
                    None
                };
                corners.push(BxCorner { vertex, uvs, color });
            }
            polygons.push(BxPolygon {
                material_index,
                corners,
            });
        }

        Ok(BxMesh {
            name,
            materials,
            uv_layers,
            vertex_groups,
            has_colors,
            shape_keys,
            vertices,
            polygons,
        })
    }

    fn read_camera(&mut self) -> Result<BxCamera> {
        Ok(BxCamera {
            name: self.read_str()?,
            fov: self.read_float()?,
            clip_start: self.read_float()?,
            clip_end: self.read_float()?,
        })
    }

    fn read_armature(&mut self) -> Result<BxArmature> {
        let name = self.read_str()?;
        let bones = self.read_list(|r| {
            Ok(BxBone {
                name: r.read_str()?,
                parent: r.read_int()?,
                head: r.read_vec3()?,
                tail: r.read_vec3()?,
            })
        })?;
        let tracks = self.read_list(|r| {
            let name = r.read_str()?;
            let strips = r.read_list(|r| {
                let range = r.read_vec2()?;
                let bones = r.read_list(|r| {
                    Ok(BxBoneGraphs {
                        name: r.read_str()?,
                        graphs: r.read_list(Self::read_graph)?,
                    })
                })?;
                Ok(BxSkeletalStrip { range, bones })
            })?;
            Ok(BxSkeletalTrack { name, strips })
        })?;

        Ok(BxArmature {
            name,
            bones,
            tracks,
        })
    }

    fn read_curve(&mut self) -> Result<BxCurve> {
        let name = self.read_str()?;
        let resolution = self.read_int()?;
        let splines = self.read_list(|r| {
            let bezier_points = r.read_list(|r| {
                Ok(BezierPoint {
                    handle_left: r.read_vec3()?,
                    co: r.read_vec3()?,
                    handle_right: r.read_vec3()?,
                })
            })?;
            Ok(Spline { bezier_points })
        })?;

        Ok(BxCurve {
            name,
            resolution,
            splines,
        })
    }

    fn read_lamp(&mut self) -> Result<BxLamp> {
        Ok(BxLamp {
            name: self.read_str()?,
            color: self.read_vec3()?,
            energy: self.read_float()?,
            distance: self.read_float()?,
        })
    }

    fn read_object(&mut self) -> Result<BxObject> {
        let name = self.read_str()?;
        let code = self.read_int()?;
        let kind = DatablockKind::from_i32(code)
            .filter(|k| !matches!(k, DatablockKind::Material | DatablockKind::Texture))
            .ok_or_else(|| Error::invalid_data(format!("unknown object datablock kind {}", code)))?;
        let datablock = if kind.has_datablock() {
            Some(self.read_int()?)
        } else {
            None
        };
        let parent = self.read_int()?;
        let position = self.read_vec3()?;
        let rotation = self.read_vec4()?;
        let scale = self.read_vec3()?;
        let tracks = self.read_list(|r| {
            let name = r.read_str()?;
            let strips = r.read_list(|r| {
                Ok(BxStrip {
                    range: r.read_vec2()?,
                    use_groups: r.read_int()?,
                    graphs: r.read_list(Self::read_graph)?,
                })
            })?;
            Ok(BxTrack { name, strips })
        })?;

        Ok(BxObject {
            name,
            kind,
            datablock,
            parent,
            position,
            rotation,
            scale,
            tracks,
        })
    }

    fn read_graph(&mut self) -> Result<BxGraph> {
        let code = self.read_int()?;
        let code = GraphCode::from_i32(code)
            .ok_or_else(|| Error::invalid_data(format!("unknown graph code {}", code)))?;
        let keyframes = self.read_list(|r| r.read_array::<6>())?;
        Ok(BxGraph { code, keyframes })
    }
}

/// Decode a `.bx` byte buffer
pub fn decode(bytes: &[u8]) -> Result<BxDocument> {
    BxReader::new(bytes).read_document()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bx::writer::BxWriter;

    fn header(version: i32, counts: [i32; 8]) -> Vec<u8> {
        let mut w = BxWriter::new(Vec::new());
        w.write_str(BX_MAGIC).unwrap();
        w.write_int(version).unwrap();
        for c in counts {
            w.write_int(c).unwrap();
        }
        w.into_inner()
    }

    #[test]
    fn test_empty_document() {
        let doc = decode(&header(BX_VERSION, [0; 8])).unwrap();
        assert_eq!(doc.version, 202);
        assert_eq!(doc.counts, SectionCounts::default());
    }

    #[test]
    fn test_bad_magic() {
        let mut w = BxWriter::new(Vec::new());
        w.write_str("BXDATO").unwrap();
        let err = decode(&w.into_inner()).unwrap_err();
        assert!(matches!(err, Error::InvalidMagic { .. }));
    }

    #[test]
    fn test_bad_version() {
        let err = decode(&header(201, [0; 8])).unwrap_err();
        assert!(matches!(err, Error::UnsupportedVersion { version: 201, supported: 202 }));
    }

    #[test]
    fn test_truncated_section() {
        let bytes = header(BX_VERSION, [1, 0, 0, 0, 0, 0, 0, 0]);
        let err = decode(&bytes).unwrap_err();
        assert!(err.is_decode_error());
        assert!(matches!(err.root_cause(), Error::UnexpectedEof { .. }));
    }

    #[test]
    fn test_negative_count() {
        let err = decode(&header(BX_VERSION, [0, 0, -3, 0, 0, 0, 0, 0])).unwrap_err();
        assert!(matches!(err, Error::InvalidData { .. }));
    }
}
