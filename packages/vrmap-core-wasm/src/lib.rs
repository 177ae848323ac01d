use js_sys::{Float32Array, Uint32Array, Uint8Array};
use serde::Deserialize;
use serde_wasm_bindgen::to_value;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;

// Create a console module for logging
pub mod console;
// Pipeline configuration and errors
pub mod config;
pub mod error;
// Shared data structures
pub mod models;
// Geometry reducer
#[path = "../geometry_functions/decimate.rs"]
pub mod decimate;
// Scene normalizer and packer
pub mod normalize;
// Reduce -> normalize -> pack driver
pub mod pipeline;
// Per-shape fan draw ranges
pub mod draw_plan;
// Published scene shared with the render loop
pub mod module_state;
// Map service query and image export adapter
pub mod query;

use config::PipelineConfig;
use error::PipelineError;
use module_state::global_scene;
use models::SceneSummary;
use query::{FeatureQuery, ImageExportRequest};

// Enable better panic messages in console during development
#[cfg(feature = "console_error_panic_hook")]
pub use console_error_panic_hook::set_once as set_panic_hook;

#[wasm_bindgen]
extern "C" {
    // JavaScript function to fetch data from URL
    #[wasm_bindgen(js_namespace = wasmJsHelpers, catch)]
    pub fn fetch(url: &str) -> Result<js_sys::Promise, JsValue>;
}

// Use the macro from our console module
#[macro_export]
macro_rules! console_log {
    ($($t:tt)*) => (crate::console::log(&format!($($t)*)))
}

#[macro_export]
macro_rules! console_warn {
    ($($t:tt)*) => (crate::console::warn(&format!($($t)*)))
}

use std::sync::Once;
static INIT: Once = Once::new();

// This sets up the wasm_bindgen start functionality
#[wasm_bindgen(start)]
pub fn start() {
    INIT.call_once(|| {
        // Set the panic hook for better error messages
        #[cfg(feature = "console_error_panic_hook")]
        console_error_panic_hook::set_once();

        console_log!("VR map core initialized");
    });
}

/// Shapes handed over directly by JS, each a list of `[x, y]` or `[x, y, z]`.
#[derive(Deserialize)]
struct SceneRequest {
    shapes: Vec<Vec<Vec<f64>>>,
    #[serde(default)]
    config: PipelineConfig,
}

/// A feature query for the async loader.
#[derive(Deserialize)]
struct QuerySceneRequest {
    query: FeatureQuery,
    #[serde(default)]
    config: PipelineConfig,
}

// Build and publish a scene from shapes already on the JS side.
// Any failure also drops the previously published scene.
#[wasm_bindgen]
pub fn build_scene_from_shapes(input_json: &str) -> Result<JsValue, JsValue> {
    let request: SceneRequest = match serde_json::from_str(input_json) {
        Ok(request) => request,
        Err(e) => {
            global_scene().fail(PipelineError::Parse(e.to_string()));
            return Err(JsValue::from_str(&format!("Failed to parse input: {}", e)));
        }
    };

    let status = global_scene().rebuild_from_points(&request.shapes, &request.config);
    Ok(to_value(&status.summary())?)
}

// Resolve the JS fetch helper to the response text. The helper may resolve to
// the text itself or to already parsed JSON.
async fn fetch_text(url: &str) -> Result<String, JsValue> {
    let promise = fetch(url)?;
    let response = JsFuture::from(promise).await?;
    match response.as_string() {
        Some(text) => Ok(text),
        None => js_sys::JSON::stringify(&response)?
            .as_string()
            .ok_or_else(|| JsValue::from_str("Query response is not JSON")),
    }
}

// Run the feature query through the JS fetch helper, then build and publish.
// A failed request or a service error drops the previously published scene.
#[wasm_bindgen]
pub async fn load_scene_from_query(input_js: JsValue) -> Result<JsValue, JsValue> {
    let request: QuerySceneRequest = match serde_wasm_bindgen::from_value(input_js) {
        Ok(request) => request,
        Err(e) => {
            global_scene().fail(PipelineError::Parse(e.to_string()));
            return Err(e.into());
        }
    };
    let url = request.query.query_url();
    console_log!("Querying features: {}", url);

    let status = match fetch_text(&url).await {
        Ok(body) => global_scene().rebuild_from_feature_set(&body, &request.config),
        Err(e) => {
            let message = e.as_string().unwrap_or_else(|| format!("{:?}", e));
            global_scene().fail(PipelineError::Fetch(message))
        }
    };
    Ok(to_value(&status.summary())?)
}

// Render-loop readiness check; false means draw the floor only
#[wasm_bindgen]
pub fn is_scene_ready() -> bool {
    global_scene().is_ready()
}

#[wasm_bindgen]
pub fn get_scene_summary() -> Result<JsValue, JsValue> {
    let summary = global_scene()
        .current()
        .map(|published| published.scene.summary())
        .unwrap_or_else(SceneSummary::empty);
    Ok(to_value(&summary)?)
}

// Packed vertex buffer of the published scene, undefined when not ready
#[wasm_bindgen]
pub fn get_scene_vertices() -> Option<Float32Array> {
    global_scene()
        .current()
        .map(|published| Float32Array::from(published.scene.vertices.as_slice()))
}

// Same buffer as raw little-endian bytes, for a direct bufferData upload
#[wasm_bindgen]
pub fn get_scene_vertex_bytes() -> Option<Uint8Array> {
    global_scene()
        .current()
        .map(|published| Uint8Array::from(published.scene.as_bytes()))
}

// Per-shape start offsets in floats
#[wasm_bindgen]
pub fn get_scene_offsets() -> Option<Uint32Array> {
    global_scene()
        .current()
        .map(|published| Uint32Array::from(published.scene.offsets.as_slice()))
}

// Flat [firstVertex, vertexCount, ...] pairs for TRIANGLE_FAN draws
#[wasm_bindgen]
pub fn get_scene_draw_ranges() -> Option<Uint32Array> {
    global_scene()
        .current()
        .map(|published| Uint32Array::from(published.plan.to_flat().as_slice()))
}

#[wasm_bindgen]
pub fn clear_scene() {
    global_scene().clear();
}

#[wasm_bindgen]
pub fn feature_query_url(layer_url: &str, where_clause: &str) -> String {
    FeatureQuery::new(layer_url, where_clause).query_url()
}

// Floor texture request around a map center
#[wasm_bindgen]
pub fn floor_image_url(service_url: &str, center_x: f64, center_y: f64, extent: f64, image_side: u32) -> String {
    ImageExportRequest::around((center_x, center_y), extent, extent, image_side).export_url(service_url)
}

#[wasm_bindgen]
pub fn default_floor_image_url(service_url: &str) -> String {
    ImageExportRequest::default().export_url(service_url)
}

// Default pipeline settings, so the JS side can show or tweak them
#[wasm_bindgen]
pub fn get_default_config() -> Result<JsValue, JsValue> {
    Ok(to_value(&PipelineConfig::default())?)
}
