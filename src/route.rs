use hayago_core::{
    Coordinate,
    geometry::{measure::path_length_km, parse_route_geometry, route_feature},
};
use pyo3::prelude::*;
use pyo3_stub_gen::derive::gen_stub_pyfunction;
use serde_json::{Map, json};

use crate::geometry::coordinate;

fn parse(route_geojson: &str) -> PyResult<Vec<Coordinate>> {
    parse_route_geometry(route_geojson).map_err(|e| {
        PyErr::new::<pyo3::exceptions::PyValueError, _>(format!("Failed to read route: {e}"))
    })
}

/// Route positions as `(lat, lon)` tuples, from a `GeoJSON` `LineString` or `Feature`
#[gen_stub_pyfunction]
#[pyfunction]
pub fn route_coordinates(route_geojson: &str) -> PyResult<Vec<(f64, f64)>> {
    Ok(parse(route_geojson)?
        .into_iter()
        .map(|c| (c.latitude, c.longitude))
        .collect())
}

/// Length of a `GeoJSON` route in kilometers
#[gen_stub_pyfunction]
#[pyfunction]
pub fn route_distance(route_geojson: &str) -> PyResult<f64> {
    Ok(path_length_km(&parse(route_geojson)?))
}

/// Builds the logged route `Feature` from `(lat, lon)` points in travel order
#[gen_stub_pyfunction]
#[pyfunction]
#[pyo3(signature = (points, trip_id=None))]
pub fn logged_route_geojson(points: Vec<(f64, f64)>, trip_id: Option<String>) -> PyResult<String> {
    let route = points
        .into_iter()
        .map(|(lat, lon)| coordinate(lat, lon))
        .collect::<PyResult<Vec<_>>>()?;

    let mut properties = Map::new();
    if let Some(trip_id) = trip_id {
        properties.insert("trip_id".to_string(), json!(trip_id));
    }
    properties.insert("points".to_string(), json!(route.len()));
    properties.insert("distance_km".to_string(), json!(path_length_km(&route)));

    let feature = route_feature(&route, properties).map_err(|e| {
        PyErr::new::<pyo3::exceptions::PyValueError, _>(format!("Failed to build route: {e}"))
    })?;
    serde_json::to_string(&feature).map_err(|e| {
        PyErr::new::<pyo3::exceptions::PyValueError, _>(format!("Failed to encode route: {e}"))
    })
}
