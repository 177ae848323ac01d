use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

// Defaults match the map explorer scene: a 2000 unit floor viewed from above,
// shapes hovering on a plane 5 units up, every 100th source vertex kept.
pub const DEFAULT_STRIDE: usize = 100;
pub const DEFAULT_TARGET_EXTENT: f32 = 2000.0;
pub const DEFAULT_HEIGHT_PLANE: f32 = 5.0;
pub const DEFAULT_DAMPING: f32 = 5.0;

/// Tuning for the reduce / normalize / pack pipeline.
///
/// Deserialized from the `config` field of a scene request; any field left
/// out falls back to its default.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PipelineConfig {
    /// Keep every `stride`-th source vertex.
    pub stride: usize,
    /// Planar size the whole batch is fitted into.
    pub target_extent: f32,
    /// Fixed height every normalized vertex is placed at.
    pub height_plane: f32,
    /// Divisor applied to the fitted scale to leave a visual margin.
    pub damping: f32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            stride: DEFAULT_STRIDE,
            target_extent: DEFAULT_TARGET_EXTENT,
            height_plane: DEFAULT_HEIGHT_PLANE,
            damping: DEFAULT_DAMPING,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.stride == 0 {
            return Err(PipelineError::InvalidConfig("stride must be at least 1".into()));
        }
        if !self.target_extent.is_finite() || self.target_extent <= 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "targetExtent must be positive, got {}",
                self.target_extent
            )));
        }
        if !self.damping.is_finite() || self.damping <= 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "damping must be positive, got {}",
                self.damping
            )));
        }
        if !self.height_plane.is_finite() {
            return Err(PipelineError::InvalidConfig(format!(
                "heightPlane must be finite, got {}",
                self.height_plane
            )));
        }
        Ok(())
    }
}
