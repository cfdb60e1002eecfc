use std::str::FromStr;

use geojson::GeoJson;
use wasm_bindgen::prelude::*;

use crate::geojson_io;
use crate::TopologyMap;

#[wasm_bindgen]
pub fn init_panic_hook() {
    console_error_panic_hook::set_once();
}

/// Builds the topology of a GeoJSON document's line work and returns its
/// polygons as a GeoJSON feature collection.
#[wasm_bindgen]
pub fn build_topology(geojson_str: &str) -> Result<String, JsValue> {
    let geojson = GeoJson::from_str(geojson_str)
        .map_err(|e| JsValue::from_str(&format!("Failed to parse GeoJSON: {}", e)))?;

    let mut map = TopologyMap::default();
    geojson_io::import(&mut map, &geojson)
        .map_err(|e| JsValue::from_str(&format!("Import failed: {}", e)))?;
    map.settle()
        .map_err(|e| JsValue::from_str(&format!("Topology build failed: {}", e)))?;

    Ok(geojson_io::export_polygons(&map).to_string())
}
