use hayago_core::{Coordinate, geometry::measure::haversine_km};
use pyo3::prelude::*;
use pyo3_stub_gen::derive::{gen_stub_pyclass, gen_stub_pyfunction, gen_stub_pymethods};
use rayon::prelude::*;

use crate::geometry::coordinate;

/// Last known position of a driver
#[gen_stub_pyclass]
#[pyclass(name = "DriverPosition")]
#[derive(Clone)]
pub struct PyDriverPosition {
    pub driver_id: String,
    pub position: Coordinate,
}

#[pymethods]
#[gen_stub_pymethods]
impl PyDriverPosition {
    #[new]
    pub fn new(driver_id: String, lat: f64, lon: f64) -> PyResult<Self> {
        Ok(PyDriverPosition {
            driver_id,
            position: coordinate(lat, lon)?,
        })
    }

    #[getter]
    fn driver_id(&self) -> String {
        self.driver_id.clone()
    }

    /// Position as (lat, lon)
    #[getter]
    fn coordinates(&self) -> (f64, f64) {
        (self.position.latitude, self.position.longitude)
    }

    fn __repr__(&self) -> String {
        format!(
            "DriverPosition(driver_id={:?}, lat={}, lon={})",
            self.driver_id, self.position.latitude, self.position.longitude
        )
    }
}

/// Drivers within `radius_km` of a point as `(driver_id, distance_km)`, nearest first
#[gen_stub_pyfunction]
#[pyfunction]
#[pyo3(signature = (lat, lon, drivers, radius_km=5.0, limit=20))]
pub fn nearest_drivers(
    lat: f64,
    lon: f64,
    drivers: Vec<PyDriverPosition>,
    radius_km: f64,
    limit: usize,
) -> PyResult<Vec<(String, f64)>> {
    let center = coordinate(lat, lon)?;

    let mut found: Vec<(String, f64)> = drivers
        .par_iter()
        .filter_map(|driver| {
            let distance = haversine_km(center, driver.position);
            (distance <= radius_km).then(|| (driver.driver_id.clone(), distance))
        })
        .collect();

    found.sort_by(|a, b| a.1.total_cmp(&b.1));
    found.truncate(limit);
    Ok(found)
}
