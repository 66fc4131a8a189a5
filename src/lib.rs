use pyo3::prelude::*;
use pyo3_stub_gen::define_stub_info_gatherer;

use drivers::{PyDriverPosition, nearest_drivers};
use geometry::{
    bounding_box, calculate_bearing, estimate_fare, format_distance, format_duration,
    haversine_distance, validate_coordinates,
};
use route::{logged_route_geojson, route_coordinates, route_distance};

pub mod drivers;
pub mod geometry;
pub mod route;

/// Geometry helpers for trips and driver tracking, implemented in Rust.
#[pymodule]
fn hayago(m: &Bound<'_, PyModule>) -> PyResult<()> {
    pyo3_log::init();

    m.add_function(wrap_pyfunction!(haversine_distance, m)?)?;
    m.add_function(wrap_pyfunction!(calculate_bearing, m)?)?;
    m.add_function(wrap_pyfunction!(validate_coordinates, m)?)?;
    m.add_function(wrap_pyfunction!(bounding_box, m)?)?;

    m.add_function(wrap_pyfunction!(estimate_fare, m)?)?;
    m.add_function(wrap_pyfunction!(format_distance, m)?)?;
    m.add_function(wrap_pyfunction!(format_duration, m)?)?;

    m.add_function(wrap_pyfunction!(route_coordinates, m)?)?;
    m.add_function(wrap_pyfunction!(route_distance, m)?)?;
    m.add_function(wrap_pyfunction!(logged_route_geojson, m)?)?;

    m.add_class::<PyDriverPosition>()?;
    m.add_function(wrap_pyfunction!(nearest_drivers, m)?)?;
    Ok(())
}

define_stub_info_gatherer!(stub_info);
