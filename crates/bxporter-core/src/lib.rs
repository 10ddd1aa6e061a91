//! bXporter Core Library
//!
//! This crate provides the error type and the format vocabulary (datablock
//! kinds, graph codes, texture enumerations) shared by the scene model and the
//! exporters.

pub mod error;
pub mod types;

pub use error::{Error, Result, ResultExt};
pub use types::*;

/// Re-export commonly used items
pub mod prelude {
    pub use crate::error::{Error, Result, ResultExt};
    pub use crate::types::*;
}
