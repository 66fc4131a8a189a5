//! Map overlay state and trip form orchestration for a ride-hailing client.
//!
//! [`MapOverlay`] keeps keyed markers, routes and live driver markers in sync
//! with a [`Viewport`] and polls for nearby drivers. [`TripForm`] reacts to
//! trip record edits, calls the remote services and redraws the overlay.

pub mod config;
mod error;
pub mod geometry;
pub mod map;
pub mod model;
pub mod prelude;
pub mod services;
pub mod trip;

pub use config::{FareConfig, MapConfig};
pub use error::Error;
pub use geometry::Bounds;
pub use map::{HeadlessViewport, LayerId, MapOverlay, RefreshOutcome, Viewport};
pub use model::{
    Coordinate, DriverMarker, DriverRecord, DriverStatus, EstimateResponse, Marker, MarkerIcon,
    MarkerOptions, Route, RouteOptions, RouteStyle, TripEnd, TripEstimate, TripRecord,
    TripStatus, TripUpdate,
};
pub use trip::{MemoryTripStore, TripAction, TripForm, TripServices};

