pub use crate::{Error, FareConfig, MapConfig};

// Overlay
pub use crate::map::{HeadlessViewport, LayerKind, LayerSpec, MapOverlay, RefreshOutcome, Viewport};
pub use crate::model::{DriverRecord, DriverStatus, Marker, MarkerOptions, Route, RouteOptions};

// Trip form
pub use crate::model::{Coordinate, TripEnd, TripEstimate, TripRecord, TripStatus, TripUpdate};
pub use crate::trip::{MemoryTripStore, TripAction, TripForm, TripServices};

// Remote service contracts
pub use crate::services::{
    AddressLookup, DriverMatching, GeocodedAddress, GeolocationProvider, MatchOutcome,
    MatchRequest, NearbyDriverLookup, Notice, NoticeLevel, Notifier, ReverseLookup,
    TripEstimation, TripRecordStore,
};

// Geometry
pub use crate::geometry::measure::{haversine_km, path_length_km};
pub use crate::geometry::{Bounds, parse_route_geometry, route_to_geojson};
