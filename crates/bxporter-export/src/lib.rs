//! bxporter-export
//!
//! Collects the selected part of a scene snapshot into per-kind registries,
//! flattens its animation and encodes the result.
//!
//! # Supported Formats
//!
//! | Format | Extension | Description |
//! |--------|-----------|-------------|
//! | BX     | `.bx`     | Fixed-schema little-endian records (version 202) |
//! | BXON   | `.bxon`   | Self-describing typed tree (version 1) |
//!
//! # Example
//!
//! ```rust,ignore
//! use bxporter_export::{Exporter, ExportOptions, ExportFormat};
//!
//! let scene = Scene::from_path("scene.json")?;
//! let exporter = Exporter::new(ExportOptions::with_format(ExportFormat::Bxon));
//! let summary = exporter.export(&scene, File::create("scene.bxon")?)?;
//!
//! println!("Wrote {} bytes", summary.bytes);
//! ```

pub mod animation;
pub mod bx;
pub mod bxon;
pub mod collect;
pub mod exporter;
pub mod logging;
pub mod options;
pub mod registry;

// Re-export main types
pub use animation::{ChannelKind, Flattener, Keyframe, Strip, Track};
pub use bx::{BxDocument, BxEncoder};
pub use bxon::{BxonEncoder, Node};
pub use collect::{Collection, SectionCounts};
pub use exporter::{encoder_for, Encoder, ExportSummary, Exporter};
pub use options::{ExportFormat, ExportOptions};
pub use registry::{Entry, Registry};
