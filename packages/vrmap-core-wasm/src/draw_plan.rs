use serde::{Deserialize, Serialize};

use crate::models::PackedScene;

/// Vertices needed for a triangle fan to cover any area.
pub const MIN_FAN_VERTICES: u32 = 3;

/// One `drawArrays(TRIANGLE_FAN, first_vertex, vertex_count)` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawRange {
    pub first_vertex: u32,
    pub vertex_count: u32,
}

impl DrawRange {
    pub fn is_drawable(&self) -> bool {
        self.vertex_count >= MIN_FAN_VERTICES
    }
}

/// Per-shape draw ranges for a packed scene, built once at publication and
/// handed to the renderer instead of having it re-derive them every frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FanDrawPlan {
    ranges: Vec<DrawRange>,
}

impl FanDrawPlan {
    pub fn from_scene(scene: &PackedScene) -> Self {
        let ranges = (0..scene.shape_count())
            .map(|i| DrawRange {
                first_vertex: scene.offsets[i] / 3,
                vertex_count: (scene.shape_len(i).unwrap_or(0) / 3) as u32,
            })
            .collect();
        FanDrawPlan { ranges }
    }

    pub fn ranges(&self) -> &[DrawRange] {
        &self.ranges
    }

    /// Ranges worth a draw call; points and segments are skipped.
    pub fn drawable(&self) -> impl Iterator<Item = &DrawRange> {
        self.ranges.iter().filter(|r| r.is_drawable())
    }

    /// `[first, count, first, count, ...]` for handing to JS as one typed array.
    pub fn to_flat(&self) -> Vec<u32> {
        self.ranges
            .iter()
            .flat_map(|r| [r.first_vertex, r.vertex_count])
            .collect()
    }
}
