use thiserror::Error;

use crate::model::TripStatus;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Lookup failed: {0}")]
    LookupFailed(String),
    #[error("Geolocation unavailable: {0}")]
    GeolocationUnavailable(String),
    #[error("Malformed geometry: {0}")]
    MalformedGeometry(String),
    #[error("No available drivers found in the area")]
    NoDriversAvailable,
    #[error("Invalid coordinate: {0}")]
    InvalidCoordinate(String),
    #[error("Invalid data: {0}")]
    InvalidData(String),
    #[error("GeoJSON error: {0}")]
    GeoJsonError(String),
    #[error("Map overlay has been destroyed")]
    Detached,
    #[error("{action} is not available while the trip is {status}")]
    ActionNotAllowed {
        action: &'static str,
        status: TripStatus,
    },
}
