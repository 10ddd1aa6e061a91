//! Tree flush
//!
//! Flushing happens in two passes. [`measure`] walks the tree once and
//! records every payload size bottom-up, so the second pass can write each
//! length prefix before the bytes it describes.

use std::io::Write;

use byteorder::{LittleEndian, WriteBytesExt};
use bxporter_core::{Error, Result, ResultExt};

use super::node::{tags, ArrayData, ArrayNode, MapNode, Native, Node};
use super::{BXON_MAGIC, BXON_VERSION};

/// Payload sizes of a node and its children
#[derive(Debug)]
struct Measured {
    /// Bytes after the node's own header
    payload: usize,
    children: Vec<Measured>,
}

/// Size of a u32 length prefix
const LEN: usize = 4;

fn to_u32(value: usize, what: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| Error::consistency(format!("{} {} does not fit 32 bits", what, value)))
}

/// Bytes the node occupies including its tag and header
fn encoded_len(node: &Node, measured: &Measured) -> usize {
    let header = match node {
        Node::Native(_) => 0,
        Node::Map(_) => LEN * 2,
        Node::Array(_) => LEN * 3,
    };
    1 + header + measured.payload
}

fn scalar_size(data: &ArrayData) -> usize {
    match data {
        ArrayData::Bool(_) => 1,
        ArrayData::Int(_) | ArrayData::Float(_) => 4,
        ArrayData::Nodes(_) => 0,
    }
}

/// First pass: compute payload sizes and validate declared counts
fn measure(node: &Node) -> Result<Measured> {
    match node {
        Node::Native(native) => {
            let payload = match native {
                Native::Bool(_) => 1,
                Native::Int(_) | Native::Float(_) => 4,
                Native::String(s) => LEN + s.len(),
            };
            Ok(Measured {
                payload,
                children: Vec::new(),
            })
        }
        Node::Map(map) => measure_map(map),
        Node::Array(array) => measure_array(array),
    }
}

fn measure_map(map: &MapNode) -> Result<Measured> {
    let mut payload = 0;
    let mut children = Vec::with_capacity(map.len());
    for (key, child) in map.iter() {
        let measured = measure(child).with_context(|| format!("key \"{}\"", key))?;
        payload += LEN + key.len() + encoded_len(child, &measured);
        children.push(measured);
    }
    to_u32(payload, "map payload")?;
    Ok(Measured { payload, children })
}

fn measure_array(array: &ArrayNode) -> Result<Measured> {
    array.check_complete()?;
    match array.data() {
        ArrayData::Nodes(nodes) => {
            let mut payload = 0;
            let mut children = Vec::with_capacity(nodes.len());
            for (idx, child) in nodes.iter().enumerate() {
                let measured = measure(child).with_context(|| format!("element {}", idx))?;
                payload += encoded_len(child, &measured);
                children.push(measured);
            }
            to_u32(payload, "array payload")?;
            Ok(Measured { payload, children })
        }
        data => {
            let scalars = array.count() * array.stride();
            let payload = scalars * scalar_size(data);
            to_u32(payload, "array payload")?;
            Ok(Measured {
                payload,
                children: Vec::new(),
            })
        }
    }
}

/// Second pass: emit bytes using the measured sizes
struct Emitter<W: Write> {
    inner: W,
}

impl<W: Write> Emitter<W> {
    fn write_len(&mut self, value: usize) -> Result<()> {
        self.inner.write_u32::<LittleEndian>(value as u32)?;
        Ok(())
    }

    fn write_string(&mut self, s: &str) -> Result<()> {
        self.write_len(s.len())?;
        self.inner.write_all(s.as_bytes())?;
        Ok(())
    }

    fn emit(&mut self, node: &Node, measured: &Measured) -> Result<()> {
        self.inner.write_u8(node.tag())?;
        match node {
            Node::Native(Native::Bool(v)) => self.inner.write_u8(u8::from(*v))?,
            Node::Native(Native::Int(v)) => self.inner.write_i32::<LittleEndian>(*v)?,
            Node::Native(Native::Float(v)) => self.inner.write_f32::<LittleEndian>(*v)?,
            Node::Native(Native::String(s)) => self.write_string(s)?,
            Node::Map(map) => {
                self.write_len(map.len())?;
                self.write_len(measured.payload)?;
                for ((key, child), child_measured) in map.iter().zip(&measured.children) {
                    self.write_string(key)?;
                    self.emit(child, child_measured)?;
                }
            }
            Node::Array(array) => {
                self.write_len(array.count())?;
                self.write_len(array.stride())?;
                self.write_len(measured.payload)?;
                self.emit_elements(array, measured)?;
            }
        }
        Ok(())
    }

    fn emit_elements(&mut self, array: &ArrayNode, measured: &Measured) -> Result<()> {
        match array.data() {
            ArrayData::Nodes(nodes) => {
                for (child, child_measured) in nodes.iter().zip(&measured.children) {
                    self.emit(child, child_measured)?;
                }
            }
            ArrayData::Bool(values) => {
                for &v in values {
                    self.inner.write_u8(u8::from(v))?;
                }
            }
            ArrayData::Int(values) => {
                for &v in values {
                    self.inner.write_i32::<LittleEndian>(v)?;
                }
            }
            ArrayData::Float(values) => {
                for &v in values {
                    self.inner.write_f32::<LittleEndian>(v)?;
                }
            }
        }
        Ok(())
    }
}

/// Write the file header followed by `root`
///
/// Nothing is written when the tree fails validation.
pub fn flush<W: Write>(root: &Node, out: W) -> Result<()> {
    let measured = measure(root)?;

    let mut emitter = Emitter { inner: out };
    emitter.inner.write_all(BXON_MAGIC)?;
    emitter.inner.write_u32::<LittleEndian>(BXON_VERSION)?;
    emitter.emit(root, &measured)?;
    emitter.inner.flush()?;
    Ok(())
}

/// Flush `root` into a new buffer
pub fn to_vec(root: &Node) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    flush(root, &mut out)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_layout() {
        let bytes = to_vec(&Node::from(7)).unwrap();
        assert_eq!(&bytes[..4], b"BXON");
        assert_eq!(&bytes[4..8], &1u32.to_le_bytes());
        assert_eq!(bytes[8], tags::INT);
        assert_eq!(&bytes[9..], &7i32.to_le_bytes());
    }

    #[test]
    fn test_map_payload_size() {
        let mut map = MapNode::new();
        map.put("fov", 1.0f32).unwrap();
        let bytes = to_vec(&Node::from(map)).unwrap();

        let body = &bytes[8..];
        assert_eq!(body[0], tags::MAP);
        assert_eq!(&body[1..5], &1u32.to_le_bytes());
        // key length, key, float tag, float
        assert_eq!(&body[5..9], &(4u32 + 3 + 1 + 4).to_le_bytes());
        assert_eq!(body.len(), 9 + 12);
    }

    #[test]
    fn test_typed_array_layout() {
        let mut faces = ArrayNode::ints(3).with_count(2);
        faces.push_ints(&[0, 1, 2]).unwrap();
        faces.push_ints(&[2, 3, 0]).unwrap();
        let bytes = to_vec(&Node::from(faces)).unwrap();

        let body = &bytes[8..];
        assert_eq!(body[0], tags::ARRAY | tags::INT);
        assert_eq!(&body[1..5], &2u32.to_le_bytes());
        assert_eq!(&body[5..9], &3u32.to_le_bytes());
        assert_eq!(&body[9..13], &24u32.to_le_bytes());
        assert_eq!(body.len(), 13 + 24);
    }

    #[test]
    fn test_underflow_fails_before_writing() {
        let mut root = MapNode::new();
        let mut positions = ArrayNode::floats(3).with_count(2);
        positions.push_floats(&[0.0, 0.0, 0.0]).unwrap();
        root.put("positions", positions).unwrap();

        let mut out = Vec::new();
        let err = flush(&Node::from(root), &mut out).unwrap_err();
        assert!(err.is_consistency_violation());
        assert!(err.to_string().contains("positions"));
        assert!(out.is_empty());
    }
}
