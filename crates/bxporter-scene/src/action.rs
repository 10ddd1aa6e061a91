//! Actions: named sets of animation curves

use serde::{Deserialize, Serialize};

/// A named set of F-curves
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Action {
    /// Action name
    pub name: String,
    /// First and last frame covered by the action
    #[serde(default)]
    pub frame_range: [f32; 2],
    #[serde(default)]
    pub fcurves: Vec<FCurve>,
}

impl Action {
    pub fn new(name: impl Into<String>, frame_range: [f32; 2]) -> Self {
        Self {
            name: name.into(),
            frame_range,
            fcurves: Vec::new(),
        }
    }
}

/// A scalar curve driving one component of one property
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FCurve {
    /// Property path, e.g. `location` or `pose.bones["Arm"].rotation_quaternion`
    pub data_path: String,
    /// Component of the property
    #[serde(default)]
    pub array_index: usize,
    #[serde(default)]
    pub keyframe_points: Vec<KeyframePoint>,
}

impl FCurve {
    pub fn new(data_path: impl Into<String>, array_index: usize) -> Self {
        Self {
            data_path: data_path.into(),
            array_index,
            keyframe_points: Vec::new(),
        }
    }

    /// Builder-style keyframe append
    pub fn with_key(mut self, point: KeyframePoint) -> Self {
        self.keyframe_points.push(point);
        self
    }
}

/// A keyframe with its bezier handles, each point is (frame, value)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyframePoint {
    pub handle_left: [f32; 2],
    pub co: [f32; 2],
    pub handle_right: [f32; 2],
}

impl KeyframePoint {
    pub fn new(handle_left: [f32; 2], co: [f32; 2], handle_right: [f32; 2]) -> Self {
        Self {
            handle_left,
            co,
            handle_right,
        }
    }

    /// Keyframe at `(frame, value)` with flat handles one frame either side
    pub fn flat(frame: f32, value: f32) -> Self {
        Self::new([frame - 1.0, value], [frame, value], [frame + 1.0, value])
    }
}
