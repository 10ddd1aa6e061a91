//! Lamp and camera datablocks

use serde::{Deserialize, Serialize};

/// Sensor-fitting constant of the host camera model
const LENS_SENSOR_FACTOR: f32 = 1.325_483_4;

/// A light source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lamp {
    /// Lamp name
    pub name: String,
    /// Light color (normalized rgb)
    #[serde(default = "white")]
    pub color: [f32; 3],
    #[serde(default = "one")]
    pub energy: f32,
    /// Falloff distance
    #[serde(default = "default_distance")]
    pub distance: f32,
}

impl Lamp {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: white(),
            energy: one(),
            distance: default_distance(),
        }
    }
}

/// A camera
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Camera {
    /// Camera name
    pub name: String,
    /// Focal length in millimeters
    #[serde(default = "default_lens")]
    pub lens: f32,
    #[serde(default = "default_clip_start")]
    pub clip_start: f32,
    #[serde(default = "default_clip_end")]
    pub clip_end: f32,
}

impl Camera {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lens: default_lens(),
            clip_start: default_clip_start(),
            clip_end: default_clip_end(),
        }
    }

    /// Field of view in degrees derived from the focal length
    pub fn fov_degrees(&self) -> f32 {
        2.0 * (16.0 / (self.lens * LENS_SENSOR_FACTOR)).atan().to_degrees()
    }
}

fn white() -> [f32; 3] {
    [1.0, 1.0, 1.0]
}

fn one() -> f32 {
    1.0
}

fn default_distance() -> f32 {
    25.0
}

fn default_lens() -> f32 {
    35.0
}

fn default_clip_start() -> f32 {
    0.1
}

fn default_clip_end() -> f32 {
    100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fov_from_lens() {
        let mut cam = Camera::new("Cam");
        // 35mm lens gives roughly 38 degrees
        assert!((cam.fov_degrees() - 38.057).abs() < 0.01);

        cam.lens = 16.0 / LENS_SENSOR_FACTOR;
        assert!((cam.fov_degrees() - 90.0).abs() < 1e-3);
    }

    #[test]
    fn test_defaults_from_json() {
        let lamp: Lamp = serde_json::from_str(r#"{"name": "Sun", "energy": 2.5}"#).unwrap();
        assert_eq!(lamp.color, [1.0, 1.0, 1.0]);
        assert_eq!(lamp.energy, 2.5);

        let cam: Camera = serde_json::from_str(r#"{"name": "Cam", "lens": 50}"#).unwrap();
        assert_eq!(cam.lens, 50.0);
        assert_eq!(cam.clip_end, 100.0);
    }
}
