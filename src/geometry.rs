use hayago_core::{
    Bounds, Coordinate, FareConfig,
    geometry::measure::{bearing_deg, fare, haversine_km},
};
use pyo3::prelude::*;
use pyo3_stub_gen::derive::gen_stub_pyfunction;

pub(crate) fn coordinate(lat: f64, lon: f64) -> PyResult<Coordinate> {
    Coordinate::new(lat, lon)
        .map_err(|e| PyErr::new::<pyo3::exceptions::PyValueError, _>(format!("{e}")))
}

/// Great-circle distance between two points in kilometers
#[gen_stub_pyfunction]
#[pyfunction]
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> PyResult<f64> {
    Ok(haversine_km(coordinate(lat1, lon1)?, coordinate(lat2, lon2)?))
}

/// Initial bearing from the first point to the second, degrees clockwise from north
#[gen_stub_pyfunction]
#[pyfunction]
pub fn calculate_bearing(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> PyResult<f64> {
    Ok(bearing_deg(coordinate(lat1, lon1)?, coordinate(lat2, lon2)?))
}

/// Returns `(True, "Valid coordinates")` or `(False, reason)`
#[gen_stub_pyfunction]
#[pyfunction]
pub fn validate_coordinates(latitude: f64, longitude: f64) -> (bool, String) {
    match Coordinate::new(latitude, longitude) {
        Ok(_) => (true, "Valid coordinates".to_string()),
        Err(e) => (false, e.to_string()),
    }
}

/// Box around a point as `(min_lat, min_lon, max_lat, max_lon)`
#[gen_stub_pyfunction]
#[pyfunction]
pub fn bounding_box(latitude: f64, longitude: f64, radius_km: f64) -> PyResult<(f64, f64, f64, f64)> {
    if radius_km.is_nan() || radius_km < 0.0 {
        return Err(PyErr::new::<pyo3::exceptions::PyValueError, _>(
            "radius_km cannot be negative",
        ));
    }
    let bounds = Bounds::around(coordinate(latitude, longitude)?, radius_km);
    Ok((bounds.south, bounds.west, bounds.north, bounds.east))
}

#[gen_stub_pyfunction]
#[pyfunction]
#[pyo3(signature = (distance_km, duration_min, cost_per_km=1.0, cost_per_minute=0.2))]
pub fn estimate_fare(
    distance_km: f64,
    duration_min: f64,
    cost_per_km: f64,
    cost_per_minute: f64,
) -> PyResult<f64> {
    let config = FareConfig {
        cost_per_km,
        cost_per_minute,
    };
    config
        .validate()
        .map_err(|e| PyErr::new::<pyo3::exceptions::PyValueError, _>(format!("{e}")))?;
    Ok(fare(distance_km, duration_min, &config))
}

/// "850m" under a kilometer, "12.3km" above
#[gen_stub_pyfunction]
#[pyfunction]
pub fn format_distance(kilometers: f64) -> String {
    hayago_core::geometry::measure::format_distance(kilometers)
}

/// "45m" under an hour, "1h 5m" above
#[gen_stub_pyfunction]
#[pyfunction]
pub fn format_duration(minutes: f64) -> String {
    hayago_core::geometry::measure::format_duration(minutes)
}
