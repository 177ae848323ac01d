//! Browser tests for the JS-facing exports. Run with `wasm-pack test --headless --firefox`.
#![cfg(target_arch = "wasm32")]

use vrmap_core_wasm::models::SceneSummary;
use vrmap_core_wasm::{
    build_scene_from_shapes, clear_scene, get_scene_draw_ranges, get_scene_offsets,
    get_scene_vertex_bytes, get_scene_vertices, is_scene_ready,
};
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

const SQUARE_REQUEST: &str = r#"{
    "shapes": [[[0, 0], [100, 0], [100, 100], [0, 100]]],
    "config": {"stride": 1}
}"#;

#[wasm_bindgen_test]
fn square_scene_round_trips_through_js() {
    let summary = build_scene_from_shapes(SQUARE_REQUEST).unwrap();
    let summary: SceneSummary = serde_wasm_bindgen::from_value(summary).unwrap();
    assert!(summary.ready);
    assert_eq!(summary.scale, 4.0);
    assert!(is_scene_ready());

    let vertices = get_scene_vertices().unwrap().to_vec();
    assert_eq!(vertices.len(), 12);
    assert_eq!(&vertices[0..3], &[-200.0f32, 5.0, -200.0][..]);
    assert_eq!(get_scene_offsets().unwrap().to_vec(), vec![0]);
    assert_eq!(get_scene_draw_ranges().unwrap().to_vec(), vec![0, 4]);

    let bytes = get_scene_vertex_bytes().unwrap().to_vec();
    assert_eq!(bytes.len(), 48);
    assert_eq!(&bytes[0..4], &(-200.0f32).to_le_bytes()[..]);

    clear_scene();
    assert!(!is_scene_ready());
    assert!(get_scene_vertices().is_none());
}

#[wasm_bindgen_test]
fn empty_request_leaves_floor_only() {
    let summary = build_scene_from_shapes(r#"{"shapes": []}"#).unwrap();
    let summary: SceneSummary = serde_wasm_bindgen::from_value(summary).unwrap();
    assert!(!summary.ready);
    assert!(summary.error.is_none());
    assert!(!is_scene_ready());
}

#[wasm_bindgen_test]
fn malformed_request_is_an_error_and_drops_scene() {
    build_scene_from_shapes(SQUARE_REQUEST).unwrap();
    assert!(is_scene_ready());

    assert!(build_scene_from_shapes("{").is_err());
    assert!(!is_scene_ready());
}

#[wasm_bindgen_test]
fn malformed_point_reports_error_and_drops_scene() {
    build_scene_from_shapes(SQUARE_REQUEST).unwrap();
    assert!(is_scene_ready());

    let summary = build_scene_from_shapes(r#"{"shapes": [[[0, 0], [1]]]}"#).unwrap();
    let summary: SceneSummary = serde_wasm_bindgen::from_value(summary).unwrap();
    assert!(!summary.ready);
    assert!(summary.error.is_some());
    assert!(!is_scene_ready());
    assert!(get_scene_vertex_bytes().is_none());
}
