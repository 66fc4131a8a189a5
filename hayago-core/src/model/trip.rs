//! Trip record fields the form controller reads and writes

use std::fmt;

use log::warn;
use serde::{Deserialize, Serialize};

use super::{Coordinate, MarkerIcon};
use crate::geometry::parse_route_geometry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TripStatus {
    #[default]
    Pending,
    Accepted,
    #[serde(rename = "On Route")]
    OnRoute,
    Completed,
    Cancelled,
}

impl fmt::Display for TripStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TripStatus::Pending => "Pending",
            TripStatus::Accepted => "Accepted",
            TripStatus::OnRoute => "On Route",
            TripStatus::Completed => "Completed",
            TripStatus::Cancelled => "Cancelled",
        };
        f.write_str(name)
    }
}

/// One end of a trip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TripEnd {
    Pickup,
    Dropoff,
}

impl TripEnd {
    /// Key of the marker drawn for this end
    pub fn key(self) -> &'static str {
        match self {
            TripEnd::Pickup => "pickup",
            TripEnd::Dropoff => "dropoff",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "pickup" => Some(TripEnd::Pickup),
            "dropoff" => Some(TripEnd::Dropoff),
            _ => None,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            TripEnd::Pickup => "Pickup Location",
            TripEnd::Dropoff => "Dropoff Location",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TripEnd::Pickup => "Pickup",
            TripEnd::Dropoff => "Dropoff",
        }
    }

    pub fn icon(self) -> MarkerIcon {
        match self {
            TripEnd::Pickup => MarkerIcon::badge("P", "#28a745"),
            TripEnd::Dropoff => MarkerIcon::badge("D", "#dc3545"),
        }
    }
}

/// Result of the remote trip estimation
#[derive(Debug, Clone, PartialEq)]
pub struct TripEstimate {
    pub distance_km: f64,
    pub duration_min: f64,
    pub cost: f64,
    /// Planned route, latitude first. `None` when the service sent an
    /// unreadable geometry; the previously planned route then stays.
    pub route: Option<Vec<Coordinate>>,
}

/// Estimation payload as returned by the business application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimateResponse {
    pub estimated_distance: f64,
    pub estimated_duration: f64,
    pub estimated_cost: f64,
    #[serde(default)]
    pub route_geojson: Option<String>,
}

impl EstimateResponse {
    /// Decodes the route geometry, swapping `[lng, lat]` positions.
    ///
    /// A missing geometry gives an empty route. An unreadable one is logged
    /// and leaves `route` unset; distance, duration and cost are kept either way.
    pub fn into_estimate(self) -> TripEstimate {
        let route = match self.route_geojson.as_deref() {
            Some(text) if !text.trim().is_empty() => match parse_route_geometry(text) {
                Ok(route) => Some(route),
                Err(e) => {
                    warn!("Ignoring estimate route: {e}");
                    None
                }
            },
            _ => Some(Vec::new()),
        };
        TripEstimate {
            distance_km: self.estimated_distance,
            duration_min: self.estimated_duration,
            cost: self.estimated_cost,
            route,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TripRecord {
    pub trip_id: String,
    pub status: TripStatus,
    pub customer: Option<String>,
    pub driver: Option<String>,
    pub pickup_address: Option<String>,
    pub pickup_latitude: Option<f64>,
    pub pickup_longitude: Option<f64>,
    pub dropoff_address: Option<String>,
    pub dropoff_latitude: Option<f64>,
    pub dropoff_longitude: Option<f64>,
    pub estimated_distance: Option<f64>,
    pub estimated_duration: Option<f64>,
    pub estimated_cost: Option<f64>,
    pub planned_route: Option<Vec<Coordinate>>,
    pub logged_route_geojson: Option<String>,
    pub actual_distance: Option<f64>,
    pub actual_duration: Option<f64>,
}

impl TripRecord {
    pub fn new(trip_id: impl Into<String>) -> Self {
        Self {
            trip_id: trip_id.into(),
            ..Self::default()
        }
    }

    pub fn address(&self, end: TripEnd) -> Option<&str> {
        let address = match end {
            TripEnd::Pickup => self.pickup_address.as_deref(),
            TripEnd::Dropoff => self.dropoff_address.as_deref(),
        };
        address.filter(|a| !a.trim().is_empty())
    }

    /// Coordinate of one end, if both of its fields are set and valid
    pub fn coordinate(&self, end: TripEnd) -> Option<Coordinate> {
        let (lat, lng) = match end {
            TripEnd::Pickup => (self.pickup_latitude, self.pickup_longitude),
            TripEnd::Dropoff => (self.dropoff_latitude, self.dropoff_longitude),
        };
        Coordinate::new(lat?, lng?).ok()
    }

    pub fn pickup(&self) -> Option<Coordinate> {
        self.coordinate(TripEnd::Pickup)
    }

    pub fn dropoff(&self) -> Option<Coordinate> {
        self.coordinate(TripEnd::Dropoff)
    }

    /// True once all four coordinate fields are present
    pub fn has_both_ends(&self) -> bool {
        self.pickup().is_some() && self.dropoff().is_some()
    }

    pub fn apply(&mut self, update: TripUpdate) {
        match update {
            TripUpdate::Coordinate(TripEnd::Pickup, coord) => {
                self.pickup_latitude = Some(coord.latitude);
                self.pickup_longitude = Some(coord.longitude);
            }
            TripUpdate::Coordinate(TripEnd::Dropoff, coord) => {
                self.dropoff_latitude = Some(coord.latitude);
                self.dropoff_longitude = Some(coord.longitude);
            }
            TripUpdate::Address(TripEnd::Pickup, address) => self.pickup_address = Some(address),
            TripUpdate::Address(TripEnd::Dropoff, address) => self.dropoff_address = Some(address),
            TripUpdate::Estimate(estimate) => {
                self.estimated_distance = Some(estimate.distance_km);
                self.estimated_duration = Some(estimate.duration_min);
                self.estimated_cost = Some(estimate.cost);
                if let Some(route) = estimate.route {
                    self.planned_route = Some(route);
                }
            }
            TripUpdate::Status(status) => self.status = status,
        }
    }
}

/// Field writes issued against a trip record
#[derive(Debug, Clone, PartialEq)]
pub enum TripUpdate {
    Coordinate(TripEnd, Coordinate),
    Address(TripEnd, String),
    Estimate(TripEstimate),
    Status(TripStatus),
}
