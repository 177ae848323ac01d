// Fit a batch of decimated shapes into the scene and pack them for fan drawing
use geo_types::{coord, Rect};

use crate::error::PipelineError;
use crate::models::{DecimatedShape, NormalizedShape, PackedScene};

/// Parameters shared by every shape of one batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizeParams {
    pub scale: f32,
    pub center: (f32, f32),
    pub height_plane: f32,
}

/// Reject batches that cannot be normalized, before anything is computed.
///
/// The bounding rectangle is seeded from the first point of the first shape,
/// so that point has to exist.
pub fn validate_batch(shapes: &[DecimatedShape]) -> Result<(), PipelineError> {
    match shapes.first() {
        None => return Err(PipelineError::EmptyInput),
        Some(first) if first.is_empty() => return Err(PipelineError::EmptyInput),
        Some(_) => {}
    }

    for (shape_index, shape) in shapes.iter().enumerate() {
        for (point_index, p) in shape.points().enumerate() {
            if !p[0].is_finite() || !p[2].is_finite() {
                return Err(PipelineError::NonFiniteCoordinate {
                    shape: shape_index,
                    point: point_index,
                });
            }
        }
    }
    Ok(())
}

/// Planar extent of the batch over the X (index 0) and Y (index 2) components.
pub fn bounding_rect(shapes: &[DecimatedShape]) -> Result<Rect<f32>, PipelineError> {
    let seed = shapes
        .first()
        .and_then(|shape| shape.points().next())
        .ok_or(PipelineError::EmptyInput)?;

    let (mut min_x, mut max_x) = (seed[0], seed[0]);
    let (mut min_y, mut max_y) = (seed[2], seed[2]);

    for shape in shapes {
        for p in shape.points() {
            min_x = min_x.min(p[0]);
            max_x = max_x.max(p[0]);
            min_y = min_y.min(p[2]);
            max_y = max_y.max(p[2]);
        }
    }

    Ok(Rect::new(
        coord! { x: min_x, y: min_y },
        coord! { x: max_x, y: max_y },
    ))
}

/// Uniform scale fitting `rect` into `target_extent`, divided by `damping`.
///
/// A zero-length side does not constrain the scale. When both sides are
/// zero the scale is neutral (1.0).
pub fn fit_scale(rect: &Rect<f32>, target_extent: f32, damping: f32) -> f32 {
    let candidates = [rect.width(), rect.height()];
    let fitted = candidates
        .iter()
        .filter(|&&side| side > 0.0)
        .map(|&side| target_extent / side)
        .fold(None, |acc: Option<f32>, s| Some(acc.map_or(s, |a| a.min(s))));

    match fitted {
        Some(scale) if scale.is_finite() => scale / damping,
        _ => 1.0,
    }
}

/// Midpoint of the rectangle. Halves are added so extremes near `f32::MAX`
/// do not overflow.
pub fn rect_center(rect: &Rect<f32>) -> (f32, f32) {
    let min = rect.min();
    let max = rect.max();
    (min.x / 2.0 + max.x / 2.0, min.y / 2.0 + max.y / 2.0)
}

/// Recenter, scale and flatten one shape into a new buffer.
pub fn normalize_shape(shape: &DecimatedShape, params: &NormalizeParams) -> NormalizedShape {
    let (center_x, center_y) = params.center;
    let mut coords = Vec::with_capacity(shape.len());
    for p in shape.points() {
        coords.push((p[0] - center_x) * params.scale);
        coords.push(params.height_plane);
        coords.push((p[2] - center_y) * params.scale);
    }
    NormalizedShape::from_coords(coords)
}

/// Offsets are handed to the renderer as `u32`, so the packed buffer must
/// stay addressable with one.
pub fn check_packed_len(total: usize) -> Result<u32, PipelineError> {
    u32::try_from(total).map_err(|_| PipelineError::BufferTooLarge { floats: total })
}

/// Concatenate shapes in order, recording where each one starts.
pub fn pack(
    shapes: &[NormalizedShape],
    scale: f32,
    center: (f32, f32),
) -> Result<PackedScene, PipelineError> {
    let total: usize = shapes.iter().map(NormalizedShape::len).sum();
    check_packed_len(total)?;

    let mut vertices = Vec::with_capacity(total);
    let mut offsets = Vec::with_capacity(shapes.len());
    let mut offset: u32 = 0;

    for shape in shapes {
        offsets.push(offset);
        vertices.extend_from_slice(shape.as_slice());
        // bounded by the total checked above
        offset += shape.len() as u32;
    }

    Ok(PackedScene {
        vertices,
        offsets,
        scale,
        center,
    })
}

/// Two passes: derive scale and center from the whole batch, then transform
/// and pack. The decimated input is left untouched.
pub fn normalize_and_pack(
    shapes: &[DecimatedShape],
    target_extent: f32,
    height_plane: f32,
    damping: f32,
) -> Result<PackedScene, PipelineError> {
    validate_batch(shapes)?;

    let rect = bounding_rect(shapes)?;
    let params = NormalizeParams {
        scale: fit_scale(&rect, target_extent, damping),
        center: rect_center(&rect),
        height_plane,
    };

    let normalized: Vec<NormalizedShape> = shapes
        .iter()
        .map(|shape| normalize_shape(shape, &params))
        .collect();

    pack(&normalized, params.scale, params.center)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-3;

    fn shape(points: &[[f32; 3]]) -> DecimatedShape {
        DecimatedShape::from_coords(points.iter().flat_map(|p| p.iter().copied()).collect())
    }

    fn planar_extent(scene: &PackedScene) -> (f32, f32, f32, f32) {
        let mut min_x = f32::INFINITY;
        let mut max_x = f32::NEG_INFINITY;
        let mut min_y = f32::INFINITY;
        let mut max_y = f32::NEG_INFINITY;
        for p in scene.vertices.chunks_exact(3) {
            min_x = min_x.min(p[0]);
            max_x = max_x.max(p[0]);
            min_y = min_y.min(p[2]);
            max_y = max_y.max(p[2]);
        }
        (min_x, max_x, min_y, max_y)
    }

    fn sample_batch() -> Vec<DecimatedShape> {
        vec![
            shape(&[[-8_000.0, 0.0, 4_200.0], [-7_500.0, 0.0, 4_900.0], [-7_900.0, 0.0, 5_100.0]]),
            shape(&[[-6_100.0, 0.3, 3_000.0], [-5_000.0, 0.0, 3_400.0]]),
            shape(&[[-9_300.0, 12.0, 6_000.0]]),
        ]
    }

    #[test]
    fn test_unit_square_scenario() {
        let square = shape(&[[0.0, 0.0, 0.0], [100.0, 0.0, 0.0], [100.0, 0.0, 100.0], [0.0, 0.0, 100.0]]);
        let scene = normalize_and_pack(&[square], 2000.0, 5.0, 5.0).unwrap();

        assert!((scene.scale - 4.0).abs() < EPS);
        assert_eq!(scene.center, (50.0, 50.0));
        let expected = [
            -200.0, 5.0, -200.0, 200.0, 5.0, -200.0, 200.0, 5.0, 200.0, -200.0, 5.0, 200.0,
        ];
        for (got, want) in scene.vertices.iter().zip(expected.iter()) {
            assert!((got - want).abs() < EPS, "{} != {}", got, want);
        }
        assert_eq!(scene.offsets, vec![0]);
    }

    #[test]
    fn test_bounding_rect_covers_all_shapes() {
        let rect = bounding_rect(&sample_batch()).unwrap();
        assert_eq!(rect.min().x, -9_300.0);
        assert_eq!(rect.max().x, -5_000.0);
        assert_eq!(rect.min().y, 3_000.0);
        assert_eq!(rect.max().y, 6_000.0);
    }

    #[test]
    fn test_offsets_are_running_sums() {
        let batch = sample_batch();
        let scene = normalize_and_pack(&batch, 2000.0, 5.0, 5.0).unwrap();

        assert_eq!(scene.offsets.len(), batch.len());
        assert_eq!(scene.offsets[0], 0);
        for i in 1..batch.len() {
            assert_eq!(scene.offsets[i] as usize, scene.offsets[i - 1] as usize + batch[i - 1].len());
        }
        let total: usize = batch.iter().map(DecimatedShape::len).sum();
        assert_eq!(scene.vertices.len(), total);
    }

    #[test]
    fn test_result_is_centered_flat_and_bounded() {
        let scene = normalize_and_pack(&sample_batch(), 2000.0, 5.0, 5.0).unwrap();
        let (min_x, max_x, min_y, max_y) = planar_extent(&scene);

        assert!(((min_x + max_x) / 2.0).abs() < EPS);
        assert!(((min_y + max_y) / 2.0).abs() < EPS);
        for p in scene.vertices.chunks_exact(3) {
            assert_eq!(p[1], 5.0);
            assert!(p[0].abs() <= 1000.0 + EPS);
            assert!(p[2].abs() <= 1000.0 + EPS);
        }
        // Damping of 5 leaves the widest axis at a fifth of the extent
        assert!(((max_x - min_x) - 400.0).abs() < 0.05);
    }

    #[test]
    fn test_input_is_not_mutated() {
        let batch = sample_batch();
        let before = batch.clone();
        normalize_and_pack(&batch, 2000.0, 5.0, 5.0).unwrap();
        assert_eq!(batch, before);
    }

    #[test]
    fn test_empty_batches_are_rejected() {
        assert_eq!(normalize_and_pack(&[], 2000.0, 5.0, 5.0), Err(PipelineError::EmptyInput));
        let leading_empty = vec![DecimatedShape::default(), shape(&[[1.0, 0.0, 1.0]])];
        assert_eq!(
            normalize_and_pack(&leading_empty, 2000.0, 5.0, 5.0),
            Err(PipelineError::EmptyInput)
        );
        let all_empty = vec![DecimatedShape::default(), DecimatedShape::default()];
        assert_eq!(normalize_and_pack(&all_empty, 2000.0, 5.0, 5.0), Err(PipelineError::EmptyInput));
    }

    #[test]
    fn test_trailing_empty_shape_gets_zero_length_range() {
        let batch = vec![shape(&[[0.0, 0.0, 0.0], [10.0, 0.0, 10.0]]), DecimatedShape::default()];
        let scene = normalize_and_pack(&batch, 2000.0, 5.0, 5.0).unwrap();
        assert_eq!(scene.offsets, vec![0, 6]);
        assert_eq!(scene.shape_len(1), Some(0));
    }

    #[test]
    fn test_identical_points_collapse_to_origin() {
        let batch = vec![
            shape(&[[42.0, 3.0, -7.0], [42.0, 1.0, -7.0]]),
            shape(&[[42.0, 0.0, -7.0]]),
        ];
        let scene = normalize_and_pack(&batch, 2000.0, 5.0, 5.0).unwrap();

        assert!(scene.scale.is_finite());
        for p in scene.vertices.chunks_exact(3) {
            assert_eq!(p, &[0.0f32, 5.0, 0.0][..]);
        }
    }

    #[test]
    fn test_collinear_extent_uses_the_nonzero_axis() {
        let rect = bounding_rect(&[shape(&[[0.0, 0.0, 10.0], [200.0, 0.0, 10.0]])]).unwrap();
        assert_eq!(rect.height(), 0.0);
        assert!((fit_scale(&rect, 2000.0, 5.0) - 2.0).abs() < EPS);
    }

    #[test]
    fn test_non_finite_coordinates_are_reported() {
        let batch = vec![
            shape(&[[0.0, 0.0, 0.0]]),
            shape(&[[1.0, 0.0, 1.0], [f32::NAN, 0.0, 1.0]]),
        ];
        assert_eq!(
            validate_batch(&batch),
            Err(PipelineError::NonFiniteCoordinate { shape: 1, point: 1 })
        );
    }

    #[test]
    fn test_height_slot_ignores_source_value() {
        let batch = vec![shape(&[[0.0, 999.0, 0.0], [10.0, -4.0, 10.0]])];
        let scene = normalize_and_pack(&batch, 100.0, -2.5, 1.0).unwrap();
        assert!(scene.vertices.chunks_exact(3).all(|p| p[1] == -2.5));
    }

    #[test]
    fn test_repeated_point_near_f32_max_stays_finite() {
        let batch = vec![shape(&[[3.0e38, 0.0, 3.0e38]; 3])];
        let scene = normalize_and_pack(&batch, 2000.0, 5.0, 5.0).unwrap();

        assert!(scene.center.0.is_finite() && scene.center.1.is_finite());
        for p in scene.vertices.chunks_exact(3) {
            assert_eq!(p, &[0.0f32, 5.0, 0.0][..]);
        }
    }

    #[test]
    fn test_huge_same_sign_range_stays_finite() {
        let batch = vec![shape(&[[1.0e38, 0.0, -3.0e38], [3.0e38, 0.0, -1.0e38]])];
        let scene = normalize_and_pack(&batch, 2000.0, 5.0, 5.0).unwrap();

        assert!((scene.center.0 - 2.0e38).abs() <= 1.0e32);
        assert!((scene.center.1 + 2.0e38).abs() <= 1.0e32);
        assert!(scene.scale.is_finite() && scene.scale > 0.0);
        assert!(scene.vertices.iter().all(|v| v.is_finite()));
        let (min_x, max_x, min_y, max_y) = planar_extent(&scene);
        assert!(min_x < 0.0 && max_x > 0.0);
        assert!(min_y < 0.0 && max_y > 0.0);
    }

    #[test]
    fn test_packed_len_must_fit_u32() {
        assert_eq!(check_packed_len(12), Ok(12));
        assert_eq!(check_packed_len(u32::MAX as usize), Ok(u32::MAX));
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_packed_len_over_u32_is_rejected() {
        let too_many = u32::MAX as usize + 1;
        assert_eq!(
            check_packed_len(too_many),
            Err(PipelineError::BufferTooLarge { floats: too_many })
        );
    }

    #[test]
    fn test_pack_offsets_match_lengths() {
        let shapes = vec![
            NormalizedShape::from_coords(vec![0.0; 6]),
            NormalizedShape::from_coords(Vec::new()),
            NormalizedShape::from_coords(vec![1.0; 9]),
        ];
        let scene = pack(&shapes, 1.0, (0.0, 0.0)).unwrap();
        assert_eq!(scene.offsets, vec![0, 6, 6]);
        assert_eq!(scene.vertices.len(), 15);
    }
}
