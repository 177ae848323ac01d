use crate::models::{DecimatedShape, RawShape};

/// Sub-sample one shape, keeping points `0, stride, 2 * stride, ...`.
///
/// Each kept point is written as `(x, z, y)`: the renderer's up axis is the
/// second component, so the map's northing moves to the third slot and the
/// source `z` sits in the height slot until normalization replaces it.
/// A `stride` of 0 is treated as 1.
pub fn decimate_shape(shape: &RawShape, stride: usize) -> DecimatedShape {
    let stride = stride.max(1);
    let kept = (shape.len() + stride - 1) / stride;
    let mut coords = Vec::with_capacity(kept * 3);

    for point in shape.points.iter().step_by(stride) {
        coords.push(point.x as f32);
        coords.push(point.z as f32);
        coords.push(point.y as f32);
    }

    DecimatedShape::from_coords(coords)
}

/// Decimate every shape of a query result, keeping input order.
pub fn reduce(shapes: &[RawShape], stride: usize) -> Vec<DecimatedShape> {
    shapes.iter().map(|shape| decimate_shape(shape, stride)).collect()
}
