//! Data model for trips and map overlays

pub mod coordinate;
pub mod overlay;
pub mod trip;

pub use coordinate::Coordinate;
pub use overlay::{
    DriverMarker, DriverRecord, DriverStatus, Marker, MarkerIcon, MarkerOptions, Route,
    RouteOptions, RouteStyle,
};
pub use trip::{EstimateResponse, TripEnd, TripEstimate, TripRecord, TripStatus, TripUpdate};
