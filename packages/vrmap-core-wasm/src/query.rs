// Adapter between the map service's JSON and the geometry pipeline.
// The actual HTTP requests are made on the JS side.
use nalgebra::Point3;
use serde::{Deserialize, Serialize};

use crate::console_log;
use crate::error::PipelineError;
use crate::models::RawShape;

/// Web Mercator, the projection the scene is laid out in.
pub const WEB_MERCATOR_WKID: u32 = 102100;

/// Floor image covers this many map units on each side.
pub const DEFAULT_FLOOR_EXTENT: f64 = 15000.0;
pub const DEFAULT_IMAGE_SIDE: u32 = 4000;
pub const DEFAULT_MAP_CENTER: (f64, f64) = (-8835375.854977166, 5410791.715050752);

fn default_wkid() -> u32 {
    WEB_MERCATOR_WKID
}

/// Feature query against one map-service layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureQuery {
    pub layer_url: String,
    pub where_clause: String,
    #[serde(default = "default_wkid")]
    pub out_wkid: u32,
}

impl FeatureQuery {
    pub fn new(layer_url: &str, where_clause: &str) -> Self {
        FeatureQuery {
            layer_url: layer_url.to_string(),
            where_clause: where_clause.to_string(),
            out_wkid: WEB_MERCATOR_WKID,
        }
    }

    pub fn query_url(&self) -> String {
        format!(
            "{}/query?where={}&returnGeometry=true&outSR={}&outFields=*&f=json",
            self.layer_url.trim_end_matches('/'),
            urlencoding::encode(&self.where_clause),
            self.out_wkid
        )
    }
}

/// Map image request for the floor texture, an envelope around a center point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageExportRequest {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
    pub image_side: u32,
    pub wkid: u32,
}

impl ImageExportRequest {
    pub fn around(center: (f64, f64), width: f64, height: f64, image_side: u32) -> Self {
        ImageExportRequest {
            xmin: center.0 - width / 2.0,
            ymin: center.1 - height / 2.0,
            xmax: center.0 + width / 2.0,
            ymax: center.1 + height / 2.0,
            image_side,
            wkid: WEB_MERCATOR_WKID,
        }
    }

    pub fn export_url(&self, service_url: &str) -> String {
        format!(
            "{}/export?bbox={},{},{},{}&bboxSR={}&imageSR={}&size={},{}&format=png&f=image",
            service_url.trim_end_matches('/'),
            self.xmin,
            self.ymin,
            self.xmax,
            self.ymax,
            self.wkid,
            self.wkid,
            self.image_side,
            self.image_side
        )
    }
}

impl Default for ImageExportRequest {
    fn default() -> Self {
        ImageExportRequest::around(
            DEFAULT_MAP_CENTER,
            DEFAULT_FLOOR_EXTENT,
            DEFAULT_FLOOR_EXTENT,
            DEFAULT_IMAGE_SIDE,
        )
    }
}

#[derive(Deserialize)]
struct FeatureSetJson {
    #[serde(default)]
    features: Vec<FeatureJson>,
    error: Option<ServiceErrorJson>,
}

#[derive(Deserialize)]
struct ServiceErrorJson {
    code: Option<i64>,
    message: Option<String>,
}

#[derive(Deserialize)]
struct FeatureJson {
    geometry: Option<GeometryJson>,
}

// Polygons carry rings, polylines carry paths
#[derive(Deserialize)]
struct GeometryJson {
    rings: Option<Vec<Vec<Vec<f64>>>>,
    paths: Option<Vec<Vec<Vec<f64>>>>,
}

fn to_point(coords: &[f64]) -> Result<Point3<f64>, PipelineError> {
    match coords {
        [x, y] => Ok(Point3::new(*x, *y, 0.0)),
        [x, y, z, ..] => Ok(Point3::new(*x, *y, *z)),
        _ => Err(PipelineError::Parse(format!(
            "point needs at least 2 coordinates, got {}",
            coords.len()
        ))),
    }
}

/// Build a shape from `[x, y]` or `[x, y, z]` coordinate arrays.
pub fn shape_from_points(points: &[Vec<f64>]) -> Result<RawShape, PipelineError> {
    let points = points
        .iter()
        .map(|coords| to_point(coords))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(RawShape::new(points))
}

/// Flatten all parts of a multipart geometry into one point sequence.
fn parts_to_shape(parts: &[Vec<Vec<f64>>]) -> Result<RawShape, PipelineError> {
    let points: Vec<Vec<f64>> = parts.iter().flatten().cloned().collect();
    shape_from_points(&points)
}

/// Decode a feature set into one RawShape per polygon or polyline feature.
///
/// A missing `features` array is an empty result, not an error.
pub fn parse_feature_set(json: &str) -> Result<Vec<RawShape>, PipelineError> {
    let set: FeatureSetJson = serde_json::from_str(json)?;

    if let Some(err) = set.error {
        return Err(PipelineError::Parse(format!(
            "service error {}: {}",
            err.code.unwrap_or_default(),
            err.message.unwrap_or_default()
        )));
    }

    let mut shapes = Vec::with_capacity(set.features.len());
    let mut skipped = 0;
    for feature in &set.features {
        let parts = feature
            .geometry
            .as_ref()
            .and_then(|g| g.rings.as_ref().or(g.paths.as_ref()));
        match parts {
            Some(parts) => shapes.push(parts_to_shape(parts)?),
            None => skipped += 1,
        }
    }

    console_log!(
        "Feature set: {} shapes, {} features without multipath geometry skipped",
        shapes.len(),
        skipped
    );
    Ok(shapes)
}
