// Shared data structures for the map geometry pipeline
use nalgebra::Point3;
use serde::{Deserialize, Serialize};

/// One feature's geometry as returned by the map query, in projected map
/// coordinates. `y` is northing, `z` is usually 0.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawShape {
    pub points: Vec<Point3<f64>>,
}

impl RawShape {
    pub fn new(points: Vec<Point3<f64>>) -> Self {
        RawShape { points }
    }

    pub fn from_xyz(coords: &[[f64; 3]]) -> Self {
        RawShape {
            points: coords.iter().map(|c| Point3::new(c[0], c[1], c[2])).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Sub-sampled shape as flat `(x, z, y)` triples in render axis order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecimatedShape {
    coords: Vec<f32>,
}

impl DecimatedShape {
    /// Panics if `coords` is not made of whole triples.
    pub fn from_coords(coords: Vec<f32>) -> Self {
        assert!(coords.len() % 3 == 0, "decimated shape must hold whole triples");
        DecimatedShape { coords }
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.coords
    }

    pub fn len(&self) -> usize {
        self.coords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    pub fn point_count(&self) -> usize {
        self.coords.len() / 3
    }

    pub fn points(&self) -> impl Iterator<Item = [f32; 3]> + '_ {
        self.coords.chunks_exact(3).map(|c| [c[0], c[1], c[2]])
    }
}

/// A decimated shape after recentering and scaling, height pinned to the plane.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedShape {
    coords: Vec<f32>,
}

impl NormalizedShape {
    pub(crate) fn from_coords(coords: Vec<f32>) -> Self {
        NormalizedShape { coords }
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.coords
    }

    pub fn len(&self) -> usize {
        self.coords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    pub fn point_count(&self) -> usize {
        self.coords.len() / 3
    }
}

/// Render-ready scene: every normalized shape concatenated into one vertex
/// buffer plus the start offset (in floats) of each shape.
///
/// Built once per query result and never modified afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct PackedScene {
    pub vertices: Vec<f32>,
    pub offsets: Vec<u32>,
    pub scale: f32,
    pub center: (f32, f32),
}

impl PackedScene {
    pub fn shape_count(&self) -> usize {
        self.offsets.len()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / 3
    }

    /// Float length of shape `index`.
    pub fn shape_len(&self, index: usize) -> Option<usize> {
        let start = *self.offsets.get(index)? as usize;
        let end = self
            .offsets
            .get(index + 1)
            .map(|&o| o as usize)
            .unwrap_or(self.vertices.len());
        Some(end - start)
    }

    pub fn shape(&self, index: usize) -> Option<&[f32]> {
        let start = *self.offsets.get(index)? as usize;
        let len = self.shape_len(index)?;
        Some(&self.vertices[start..start + len])
    }

    /// Raw bytes of the vertex buffer, ready for a GL buffer upload.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn summary(&self) -> SceneSummary {
        SceneSummary {
            ready: true,
            shape_count: self.shape_count(),
            vertex_count: self.vertex_count(),
            float_count: self.vertices.len(),
            scale: self.scale,
            center_x: self.center.0,
            center_y: self.center.1,
            error: None,
        }
    }
}

/// What JS gets back after a scene request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneSummary {
    pub ready: bool,
    pub shape_count: usize,
    pub vertex_count: usize,
    pub float_count: usize,
    pub scale: f32,
    pub center_x: f32,
    pub center_y: f32,
    pub error: Option<String>,
}

impl SceneSummary {
    pub fn empty() -> Self {
        SceneSummary::default()
    }

    pub fn failed(message: String) -> Self {
        SceneSummary {
            error: Some(message),
            ..SceneSummary::default()
        }
    }
}
