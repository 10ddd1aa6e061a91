//! Self-describing `.bxon` format
//!
//! A `.bxon` file is a tree of tagged nodes. Maps and arrays carry their
//! entry count and payload size, and typed arrays also carry their stride,
//! so any reader can walk or skip a subtree without knowing the schema.

mod encoder;
pub mod node;
pub mod reader;
pub mod writer;

pub use encoder::{build_tree, BxonEncoder};
pub use node::{tags, ArrayData, ArrayNode, MapNode, Native, Node};
pub use reader::{decode, BxonReader};
pub use writer::{flush, to_vec};

/// Magic bytes at the start of every file
pub const BXON_MAGIC: &[u8; 4] = b"BXON";

/// Format version written after the magic
pub const BXON_VERSION: u32 = 1;
