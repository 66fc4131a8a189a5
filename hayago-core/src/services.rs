//! Contracts of the remote services the map and the trip form talk to.
//!
//! Every call is a suspension point. Implementations resolve to a plain
//! `Result`, callers decide how a failure is surfaced.

use futures::future::BoxFuture;

use crate::{Coordinate, DriverRecord, Error, TripEstimate, TripRecord, TripUpdate};

/// Forward geocoding result
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodedAddress {
    pub coordinate: Coordinate,
    pub display_name: String,
}

pub trait AddressLookup: Send + Sync {
    fn geocode<'a>(&'a self, address: &'a str) -> BoxFuture<'a, Result<GeocodedAddress, Error>>;
}

pub trait ReverseLookup: Send + Sync {
    fn reverse_geocode(&self, at: Coordinate) -> BoxFuture<'_, Result<String, Error>>;
}

pub trait TripEstimation: Send + Sync {
    fn estimate(
        &self,
        pickup: Coordinate,
        dropoff: Coordinate,
    ) -> BoxFuture<'_, Result<TripEstimate, Error>>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchRequest {
    pub pickup: Coordinate,
    pub dropoff: Option<Coordinate>,
    pub customer: Option<String>,
    pub pickup_address: Option<String>,
    pub dropoff_address: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    Matched { driver_id: Option<String> },
    NoneAvailable,
}

pub trait DriverMatching: Send + Sync {
    fn match_driver(&self, request: MatchRequest) -> BoxFuture<'_, Result<MatchOutcome, Error>>;
}

pub trait NearbyDriverLookup: Send + Sync {
    /// Drivers around `center`, nearest first
    fn find_nearby(
        &self,
        center: Coordinate,
        radius_km: f64,
    ) -> BoxFuture<'_, Result<Vec<DriverRecord>, Error>>;
}

/// Access to the trip record behind a form
pub trait TripRecordStore: Send + Sync {
    fn snapshot(&self) -> TripRecord;

    fn apply(&self, update: TripUpdate);

    /// Re-reads the record from the server after a status change
    fn reload(&self) -> BoxFuture<'_, Result<(), Error>>;

    fn start_navigation<'a>(&'a self, trip_id: &'a str) -> BoxFuture<'a, Result<(), Error>>;

    fn complete_trip<'a>(&'a self, trip_id: &'a str) -> BoxFuture<'a, Result<(), Error>>;
}

pub trait GeolocationProvider: Send + Sync {
    fn current_position(&self) -> BoxFuture<'_, Result<Coordinate, Error>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    /// Transient confirmation toast
    Alert,
    /// Message the user has to dismiss
    Message,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn alert(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Alert,
            message: message.into(),
        }
    }

    pub fn message(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Message,
            message: message.into(),
        }
    }
}

/// Non-blocking user feedback channel
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}
