use wasm_bindgen::prelude::*;

use crate::config::HierarchyConfig;
use crate::hierarchy::LevelHierarchyBuilder;
use crate::io::{points_from_str, polygons_to_geojson};

#[wasm_bindgen]
pub fn init_panic_hook() {
    console_error_panic_hook::set_once();
}

/// Takes a GeoJSON string of points and returns the natural city polygons
/// of every level as a FeatureCollection string.
#[wasm_bindgen]
pub fn natural_cities(geojson_str: &str, depth: u32, min_cluster_size: u32) -> Result<String, JsValue> {
    let points = points_from_str(geojson_str)
        .map_err(|e| JsValue::from_str(&format!("Failed to read points: {}", e)))?;

    let config = HierarchyConfig::new(depth as usize, min_cluster_size as usize);
    let hierarchy = LevelHierarchyBuilder::new(config)
        .build(&points)
        .map_err(|e| JsValue::from_str(&format!("Natural cities failed: {}", e)))?;

    Ok(polygons_to_geojson(&hierarchy).to_string())
}
