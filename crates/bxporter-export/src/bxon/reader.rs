//! `.bxon` decoding
//!
//! Every map and array carries its payload size, so the reader checks each
//! container consumed exactly the bytes it announced.

use std::io::{self, Read};

use byteorder::{LittleEndian, ReadBytesExt};
use bxporter_core::{Error, Result, ResultExt};

use super::node::{tags, ArrayData, ArrayNode, MapNode, Native, Node};
use super::{BXON_MAGIC, BXON_VERSION};

/// Upper bound for any count or length read from a file
const MAX_LEN: usize = 1 << 28;

/// Little-endian tree reader tracking its position
pub struct BxonReader<R: Read> {
    inner: R,
    pos: u64,
}

impl<R: Read> BxonReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, pos: 0 }
    }

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

    fn read_u8(&mut self) -> Result<u8> {
        let v = self.inner.read_u8().map_err(|e| self.eof(e))?;
        self.pos += 1;
        Ok(v)
    }

    fn read_u32(&mut self) -> Result<u32> {
        let v = self.inner.read_u32::<LittleEndian>().map_err(|e| self.eof(e))?;
        self.pos += 4;
        Ok(v)
    }

    fn read_i32(&mut self) -> Result<i32> {
        let v = self.inner.read_i32::<LittleEndian>().map_err(|e| self.eof(e))?;
        self.pos += 4;
        Ok(v)
    }

    fn read_f32(&mut self) -> Result<f32> {
        let v = self.inner.read_f32::<LittleEndian>().map_err(|e| self.eof(e))?;
        self.pos += 4;
        Ok(v)
    }

    fn read_len(&mut self) -> Result<usize> {
        let len = self.read_u32()? as usize;
        if len > MAX_LEN {
            return Err(Error::invalid_data(format!(
                "length {} at offset {} is out of range",
                len,
                self.pos - 4
            )));
        }
        Ok(len)
    }

    fn read_bool(&mut self) -> Result<bool> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(Error::invalid_data(format!("bool byte {:#04x}", other))),
        }
    }

    fn read_string(&mut self) -> Result<String> {
        let len = self.read_len()?;
        let mut buf = vec![0u8; len];
        self.inner.read_exact(&mut buf).map_err(|e| self.eof(e))?;
        self.pos += len as u64;
        String::from_utf8(buf).map_err(|e| Error::invalid_data(format!("string is not UTF-8: {}", e)))
    }

    /// Read the header and the root node
    pub fn read_file(&mut self) -> Result<Node> {
        let mut magic = [0u8; 4];
        self.inner.read_exact(&mut magic).map_err(|e| self.eof(e))?;
        self.pos += 4;
        if &magic != BXON_MAGIC {
            return Err(Error::InvalidMagic {
                expected: BXON_MAGIC.to_vec(),
                found: magic.to_vec(),
            });
        }

        let version = self.read_u32()?;
        if version != BXON_VERSION {
            return Err(Error::UnsupportedVersion {
                version,
                supported: BXON_VERSION,
            });
        }

        self.read_node()
    }

    /// Read one tagged node
    pub fn read_node(&mut self) -> Result<Node> {
        let tag = self.read_u8()?;
        match tag {
            tags::BOOL => Ok(Node::Native(Native::Bool(self.read_bool()?))),
            tags::INT => Ok(Node::Native(Native::Int(self.read_i32()?))),
            tags::FLOAT => Ok(Node::Native(Native::Float(self.read_f32()?))),
            tags::STRING => Ok(Node::Native(Native::String(self.read_string()?))),
            tags::MAP => self.read_map().map(Node::Map),
            t if t & !tags::ELEMENT_MASK == tags::ARRAY => {
                self.read_array(t & tags::ELEMENT_MASK).map(Node::Array)
            }
            other => Err(Error::invalid_data(format!(
                "unknown node tag {:#04x} at offset {}",
                other,
                self.pos - 1
            ))),
        }
    }

    fn read_map(&mut self) -> Result<MapNode> {
        let count = self.read_len()?;
        let payload = self.read_len()?;
        let start = self.pos;

        let mut map = MapNode::new();
        for _ in 0..count {
            let key = self.read_string()?;
            let node = self.read_node().with_context(|| format!("key \"{}\"", key))?;
            map.put(key, node)
                .map_err(|e| Error::invalid_data(e.root_cause().to_string()))?;
        }

        self.check_payload(start, payload)?;
        Ok(map)
    }

    fn read_array(&mut self, element: u8) -> Result<ArrayNode> {
        let count = self.read_len()?;
        let stride = self.read_len()?;
        let payload = self.read_len()?;
        let start = self.pos;

        let scalars = count
            .checked_mul(stride)
            .filter(|&n| n <= MAX_LEN)
            .ok_or_else(|| Error::invalid_data(format!("array of {} x {} is out of range", count, stride)))?;

        let data = match element {
            tags::NODES => {
                if stride != 1 {
                    return Err(Error::invalid_data(format!("node array with stride {}", stride)));
                }
                let mut nodes = Vec::with_capacity(count.min(1024));
                for idx in 0..count {
                    nodes.push(self.read_node().with_context(|| format!("element {}", idx))?);
                }
                ArrayData::Nodes(nodes)
            }
            tags::BOOL => ArrayData::Bool(self.read_scalars(scalars, Self::read_bool)?),
            tags::INT => ArrayData::Int(self.read_scalars(scalars, Self::read_i32)?),
            tags::FLOAT => ArrayData::Float(self.read_scalars(scalars, Self::read_f32)?),
            other => {
                return Err(Error::invalid_data(format!(
                    "array element tag {:#04x} cannot be packed",
                    other
                )))
            }
        };

        self.check_payload(start, payload)?;
        Ok(ArrayNode::from_parts(data, stride, count))
    }

    fn read_scalars<T>(&mut self, n: usize, mut read: impl FnMut(&mut Self) -> Result<T>) -> Result<Vec<T>> {
        let mut values = Vec::with_capacity(n.min(1 << 16));
        for _ in 0..n {
            values.push(read(self)?);
        }
        Ok(values)
    }

    fn check_payload(&self, start: u64, payload: usize) -> Result<()> {
        let consumed = self.pos - start;
        if consumed != payload as u64 {
            return Err(Error::invalid_data(format!(
                "container announced {} payload bytes but holds {}",
                payload, consumed
            )));
        }
        Ok(())
    }
}

/// Decode a whole `.bxon` file
pub fn decode(bytes: &[u8]) -> Result<Node> {
    let mut reader = BxonReader::new(bytes);
    let root = reader.read_file()?;
    if reader.pos() != bytes.len() as u64 {
        return Err(Error::invalid_data(format!(
            "{} trailing bytes after the root node",
            bytes.len() as u64 - reader.pos()
        )));
    }
    Ok(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bxon::writer::to_vec;

    #[test]
    fn test_nested_round_trip() {
        let mut splines = ArrayNode::nodes();
        let mut spline = MapNode::new();
        let mut left = ArrayNode::floats(3).with_count(1);
        left.push_floats(&[1.0, 2.0, 3.0]).unwrap();
        spline.put("left", left).unwrap();
        splines.push_node(spline).unwrap();

        let mut root = MapNode::new();
        root.put("resolution", 12).unwrap();
        root.put("cyclic", false).unwrap();
        root.put("splines", splines).unwrap();

        let node = decode(&to_vec(&Node::from(root)).unwrap()).unwrap();
        assert_eq!(node.get("resolution").and_then(Node::as_int), Some(12));
        assert_eq!(node.get("cyclic").and_then(Node::as_bool), Some(false));

        let splines = node.get("splines").and_then(Node::as_array).unwrap();
        assert_eq!(splines.count(), 1);
        let left = splines.as_nodes().unwrap()[0].get("left").and_then(Node::as_array).unwrap();
        assert_eq!(left.stride(), 3);
        assert_eq!(left.as_floats(), Some(&[1.0f32, 2.0, 3.0][..]));
    }

    #[test]
    fn test_bad_magic() {
        let err = decode(b"BXDA\x01\x00\x00\x00").unwrap_err();
        assert!(matches!(err, Error::InvalidMagic { .. }));
    }

    #[test]
    fn test_bad_version() {
        let err = decode(b"BXON\x02\x00\x00\x00\x02\x00\x00\x00\x00").unwrap_err();
        assert!(matches!(err, Error::UnsupportedVersion { version: 2, supported: 1 }));
    }

    #[test]
    fn test_payload_mismatch_detected() {
        let mut map = MapNode::new();
        map.put("a", 1).unwrap();
        let mut bytes = to_vec(&Node::from(map)).unwrap();
        // payload size field of the root map
        bytes[13] = bytes[13].wrapping_add(1);

        let err = decode(&bytes).unwrap_err();
        assert!(err.is_decode_error());
    }

    #[test]
    fn test_truncated() {
        let bytes = to_vec(&Node::from("texture")).unwrap();
        let err = decode(&bytes[..bytes.len() - 2]).unwrap_err();
        assert!(matches!(err.root_cause(), Error::UnexpectedEof { .. }));
    }

    #[test]
    fn test_unknown_tag() {
        let err = decode(b"BXON\x01\x00\x00\x00\x07").unwrap_err();
        assert!(err.is_decode_error());
    }
}
