//! Fixed-schema `.bx` format
//!
//! A `.bx` file is a flat little-endian stream with no tags and no offsets:
//! a magic string, the format version, eight section counts and then the
//! sections themselves in the same order as the counts. A reader must know
//! the layout of every record to walk the file.
//!
//! - [`BxWriter`] writes the primitives
//! - [`BxEncoder`] lays out the sections of a [`Collection`](crate::collect::Collection)
//! - [`reader::decode`] parses a file back into a [`BxDocument`]

mod document;
mod encoder;
pub mod reader;
pub mod writer;

pub use document::*;
pub use encoder::BxEncoder;
pub use reader::{decode, BxReader};
pub use writer::BxWriter;

/// Magic string at the start of every file
pub const BX_MAGIC: &str = "BXDATA";

/// Format version written after the magic
pub const BX_VERSION: i32 = 202;
