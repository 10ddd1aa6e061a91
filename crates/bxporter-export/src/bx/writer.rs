//! Primitive stream writer for fixed-schema files

use std::io::Write;

use byteorder::{LittleEndian, WriteBytesExt};
use bxporter_core::{Color, Error, Result};
use glam::{Quat, Vec3};

/// Forward-only little-endian writer tracking its position
pub struct BxWriter<W: Write> {
    inner: W,
    pos: u64,
}

impl<W: Write> BxWriter<W> {
    /// Wrap a sink
    pub fn new(inner: W) -> Self {
        Self { inner, pos: 0 }
    }

    /// Get the current write position.
    #[inline]
    pub fn pos(&self) -> u64 {
        self.pos
    }

    /// Unwrap the sink
    pub fn into_inner(self) -> W {
        self.inner
    }

    /// Write a bool as one byte
    pub fn write_bool(&mut self, value: bool) -> Result<()> {
        self.inner.write_u8(u8::from(value))?;
        self.pos += 1;
        Ok(())
    }

    /// Write an i32 value (little-endian).
    pub fn write_int(&mut self, value: i32) -> Result<()> {
        self.inner.write_i32::<LittleEndian>(value)?;
        self.pos += 4;
        Ok(())
    }

    /// Write a length or count as i32
    pub fn write_count(&mut self, value: usize) -> Result<()> {
        let value = i32::try_from(value)
            .map_err(|_| Error::consistency(format!("count {} does not fit a 32-bit field", value)))?;
        self.write_int(value)
    }

    /// Write an f32 value (little-endian).
    pub fn write_float(&mut self, value: f32) -> Result<()> {
        self.inner.write_f32::<LittleEndian>(value)?;
        self.pos += 4;
        Ok(())
    }

    pub fn write_floats(&mut self, values: &[f32]) -> Result<()> {
        for &v in values {
            self.write_float(v)?;
        }
        Ok(())
    }

    pub fn write_vec2(&mut self, v: [f32; 2]) -> Result<()> {
        self.write_floats(&v)
    }

    pub fn write_vec3(&mut self, v: [f32; 3]) -> Result<()> {
        self.write_floats(&v)
    }

    pub fn write_vec4(&mut self, v: [f32; 4]) -> Result<()> {
        self.write_floats(&v)
    }

    /// Write a glam vector as vec3
    pub fn write_glam_vec3(&mut self, v: Vec3) -> Result<()> {
        self.write_vec3(v.to_array())
    }

    /// Write a quaternion as vec4 in x, y, z, w order
    pub fn write_quat(&mut self, q: Quat) -> Result<()> {
        self.write_vec4(q.to_array())
    }

    /// Write an i32 byte length followed by the UTF-8 bytes
    pub fn write_str(&mut self, s: &str) -> Result<()> {
        self.write_count(s.len())?;
        self.inner.write_all(s.as_bytes())?;
        self.pos += s.len() as u64;
        Ok(())
    }

    /// Write four unsigned bytes
    pub fn write_col4ub(&mut self, color: Color) -> Result<()> {
        self.inner.write_all(&[color.r, color.g, color.b, color.a])?;
        self.pos += 4;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitive_layout() {
        let mut w = BxWriter::new(Vec::new());
        w.write_bool(true).unwrap();
        w.write_int(-1).unwrap();
        w.write_float(1.0).unwrap();
        w.write_str("BX").unwrap();
        w.write_col4ub(Color::new(1, 2, 3, 4)).unwrap();

        assert_eq!(w.pos(), 1 + 4 + 4 + 6 + 4);
        let bytes = w.into_inner();
        assert_eq!(bytes[0], 1);
        assert_eq!(&bytes[1..5], &[0xFF, 0xFF, 0xFF, 0xFF]);
        assert_eq!(&bytes[5..9], &1.0f32.to_le_bytes());
        assert_eq!(&bytes[9..15], &[2, 0, 0, 0, b'B', b'X']);
        assert_eq!(&bytes[15..], &[1, 2, 3, 4]);
    }

    #[test]
    fn test_quat_order() {
        let mut w = BxWriter::new(Vec::new());
        w.write_quat(Quat::from_xyzw(0.1, 0.2, 0.3, 0.9)).unwrap();
        let bytes = w.into_inner();
        assert_eq!(&bytes[12..16], &0.9f32.to_le_bytes());
    }

    #[test]
    fn test_utf8_length_is_bytes() {
        let mut w = BxWriter::new(Vec::new());
        w.write_str("Würfel").unwrap();
        let bytes = w.into_inner();
        assert_eq!(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]), 7);
    }
}
