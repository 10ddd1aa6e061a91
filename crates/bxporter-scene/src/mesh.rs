// bxporter-scene/src/mesh.rs
//! Polygon mesh datablocks

use bxporter_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// A polygon mesh
///
/// Per-corner data (uv layers, vertex colors) is stored in loop order: the
/// corners of polygon 0 first, then polygon 1 and so on.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Mesh {
    /// Mesh name
    pub name: String,
    /// All vertices
    #[serde(default)]
    pub vertices: Vec<Vertex>,
    /// Polygons, any corner count
    #[serde(default)]
    pub polygons: Vec<Polygon>,
    /// Material slots; an empty slot is `None`
    #[serde(default)]
    pub materials: Vec<Option<String>>,
    /// UV layers
    #[serde(default)]
    pub uv_layers: Vec<UvLayer>,
    /// Vertex color layers; only the first is exported
    #[serde(default)]
    pub vertex_colors: Vec<ColorLayer>,
}

impl Mesh {
    /// Create a new empty mesh
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Get vertex count
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Get polygon count
    pub fn polygon_count(&self) -> usize {
        self.polygons.len()
    }

    /// Total number of polygon corners
    pub fn loop_count(&self) -> usize {
        self.polygons.iter().map(|p| p.vertices.len()).sum()
    }

    /// Index of the first loop of every polygon
    pub fn loop_starts(&self) -> Vec<usize> {
        let mut starts = Vec::with_capacity(self.polygons.len());
        let mut next = 0;
        for polygon in &self.polygons {
            starts.push(next);
            next += polygon.vertices.len();
        }
        starts
    }

    /// Check if mesh has vertex colors
    pub fn has_colors(&self) -> bool {
        !self.vertex_colors.is_empty()
    }

    /// The exported color layer
    pub fn active_colors(&self) -> Option<&ColorLayer> {
        self.vertex_colors.first()
    }

    /// Validate indices and per-loop layer lengths
    pub fn validate(&self) -> Result<()> {
        let vertex_count = self.vertices.len();
        for (idx, polygon) in self.polygons.iter().enumerate() {
            if let Some(&bad) = polygon.vertices.iter().find(|&&v| v as usize >= vertex_count) {
                return Err(Error::consistency(format!(
                    "mesh \"{}\": polygon {} references vertex {} of {}",
                    self.name, idx, bad, vertex_count
                )));
            }
        }

        let loops = self.loop_count();
        for layer in &self.uv_layers {
            if layer.data.len() != loops {
                return Err(Error::consistency(format!(
                    "mesh \"{}\": uv layer \"{}\" has {} entries, expected {}",
                    self.name,
                    layer.name,
                    layer.data.len(),
                    loops
                )));
            }
        }
        for layer in &self.vertex_colors {
            if layer.data.len() != loops {
                return Err(Error::consistency(format!(
                    "mesh \"{}\": color layer \"{}\" has {} entries, expected {}",
                    self.name,
                    layer.name,
                    layer.data.len(),
                    loops
                )));
            }
        }
        Ok(())
    }
}

/// A single mesh vertex
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    /// Position
    pub co: [f32; 3],
    /// Normal vector
    #[serde(default)]
    pub normal: [f32; 3],
    /// Vertex group memberships
    #[serde(default)]
    pub groups: Vec<VertexWeight>,
}

impl Vertex {
    /// Vertex with a position and normal and no group weights
    pub fn new(co: [f32; 3], normal: [f32; 3]) -> Self {
        Self {
            co,
            normal,
            groups: Vec::new(),
        }
    }
}

/// Membership of a vertex in a vertex group of the using object
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VertexWeight {
    /// Index into the object's vertex group names
    pub group: i32,
    /// Influence weight
    pub weight: f32,
}

/// A polygon
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    /// Vertex indices, one per corner
    pub vertices: Vec<u32>,
    /// Index into the mesh material slots
    #[serde(default)]
    pub material_index: i32,
}

impl Polygon {
    pub fn new(vertices: Vec<u32>, material_index: i32) -> Self {
        Self {
            vertices,
            material_index,
        }
    }
}

/// Per-loop texture coordinates
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UvLayer {
    pub name: String,
    pub data: Vec<[f32; 2]>,
}

/// Per-loop vertex colors (normalized rgb)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColorLayer {
    pub name: String,
    pub data: Vec<[f32; 3]>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_quad_and_tri() -> Mesh {
        let mut mesh = Mesh::new("Shape");
        for i in 0..5 {
            mesh.vertices.push(Vertex::new([i as f32, 0.0, 0.0], [0.0, 0.0, 1.0]));
        }
        mesh.polygons.push(Polygon::new(vec![0, 1, 2, 3], 0));
        mesh.polygons.push(Polygon::new(vec![1, 4, 2], 0));
        mesh
    }

    #[test]
    fn test_loop_starts() {
        let mesh = make_quad_and_tri();
        assert_eq!(mesh.loop_count(), 7);
        assert_eq!(mesh.loop_starts(), vec![0, 4]);
    }

    #[test]
    fn test_validate_catches_bad_vertex_index() {
        let mut mesh = make_quad_and_tri();
        assert!(mesh.validate().is_ok());

        mesh.polygons.push(Polygon::new(vec![0, 1, 9], 0));
        let err = mesh.validate().unwrap_err();
        assert!(err.is_consistency_violation());
    }

    #[test]
    fn test_validate_checks_uv_length() {
        let mut mesh = make_quad_and_tri();
        mesh.uv_layers.push(UvLayer {
            name: "UVMap".into(),
            data: vec![[0.0, 0.0]; 6],
        });
        assert!(mesh.validate().is_err());

        mesh.uv_layers[0].data.push([1.0, 1.0]);
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_deserialize_defaults() {
        let mesh: Mesh = serde_json::from_str(
            r#"{"name": "Tri", "vertices": [{"co": [0,0,0]}, {"co": [1,0,0]}, {"co": [0,1,0]}],
                "polygons": [{"vertices": [0, 1, 2]}]}"#,
        )
        .unwrap();

        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.polygons[0].material_index, 0);
        assert!(mesh.materials.is_empty());
        assert!(!mesh.has_colors());
    }
}
