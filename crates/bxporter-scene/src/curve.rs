//! Bezier curve datablocks

use serde::{Deserialize, Serialize};

/// A curve made of bezier splines
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Curve {
    /// Curve name
    pub name: String,
    /// Subdivisions per segment
    #[serde(default = "default_resolution")]
    pub resolution_u: i32,
    #[serde(default)]
    pub splines: Vec<Spline>,
}

fn default_resolution() -> i32 {
    12
}

impl Curve {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            resolution_u: default_resolution(),
            splines: Vec::new(),
        }
    }

    /// Total control points over all splines
    pub fn point_count(&self) -> usize {
        self.splines.iter().map(|s| s.bezier_points.len()).sum()
    }
}

/// One bezier spline
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Spline {
    pub bezier_points: Vec<BezierPoint>,
}

/// A control point with its two handles
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BezierPoint {
    pub handle_left: [f32; 3],
    pub co: [f32; 3],
    pub handle_right: [f32; 3],
}
