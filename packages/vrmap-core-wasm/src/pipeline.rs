use crate::config::PipelineConfig;
use crate::console_log;
use crate::decimate::reduce;
use crate::error::PipelineError;
use crate::models::{PackedScene, RawShape};
use crate::normalize::normalize_and_pack;

/// Run reduce -> normalize -> pack over one query result.
///
/// Runs synchronously to completion; nothing is published here.
pub fn build_scene(shapes: &[RawShape], config: &PipelineConfig) -> Result<PackedScene, PipelineError> {
    config.validate()?;

    let raw_points: usize = shapes.iter().map(RawShape::len).sum();
    let decimated = reduce(shapes, config.stride);
    let kept_points: usize = decimated.iter().map(|s| s.point_count()).sum();
    console_log!(
        "Decimated {} shapes: {} -> {} points (stride {})",
        shapes.len(),
        raw_points,
        kept_points,
        config.stride
    );

    let scene = normalize_and_pack(
        &decimated,
        config.target_extent,
        config.height_plane,
        config.damping,
    )?;
    console_log!(
        "Packed {} floats, scale {}, center ({}, {})",
        scene.vertices.len(),
        scene.scale,
        scene.center.0,
        scene.center.1
    );

    Ok(scene)
}
