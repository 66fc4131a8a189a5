//! Geographic coordinate in degrees, latitude first

use std::fmt;

use geo::{Coord, Point};
use serde::{Deserialize, Serialize};

use crate::Error;

/// WGS84 position, latitude first like the map widgets expect.
///
/// Deserialising goes through [`Coordinate::new`], so out of range values
/// are rejected at the wire.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinate")]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Deserialize)]
struct RawCoordinate {
    latitude: f64,
    longitude: f64,
}

impl TryFrom<RawCoordinate> for Coordinate {
    type Error = Error;

    fn try_from(raw: RawCoordinate) -> Result<Self, Self::Error> {
        Self::new(raw.latitude, raw.longitude)
    }
}

impl Coordinate {
    /// Creates a coordinate, rejecting non-finite or out of range values
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidCoordinate` when latitude is outside [-90, 90]
    /// or longitude is outside [-180, 180]
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, Error> {
        validate(latitude, longitude)?;
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Builds a coordinate from a `[longitude, latitude]` position as found in `GeoJSON`
    pub fn from_lng_lat(position: &[f64]) -> Result<Self, Error> {
        match position {
            [lng, lat, ..] => Self::new(*lat, *lng),
            _ => Err(Error::InvalidCoordinate(format!(
                "position needs at least two values, got {}",
                position.len()
            ))),
        }
    }

    /// `[longitude, latitude]` ordering for `GeoJSON` output
    pub fn to_lng_lat(self) -> [f64; 2] {
        [self.longitude, self.latitude]
    }

    pub fn to_point(self) -> Point<f64> {
        Point::new(self.longitude, self.latitude)
    }
}

fn validate(latitude: f64, longitude: f64) -> Result<(), Error> {
    if !latitude.is_finite() || !longitude.is_finite() {
        return Err(Error::InvalidCoordinate(format!(
            "coordinates must be finite, got ({latitude}, {longitude})"
        )));
    }
    if !(-90.0..=90.0).contains(&latitude) {
        return Err(Error::InvalidCoordinate(
            "Latitude must be between -90 and 90 degrees".to_string(),
        ));
    }
    if !(-180.0..=180.0).contains(&longitude) {
        return Err(Error::InvalidCoordinate(
            "Longitude must be between -180 and 180 degrees".to_string(),
        ));
    }
    Ok(())
}

impl TryFrom<Point<f64>> for Coordinate {
    type Error = Error;

    fn try_from(point: Point<f64>) -> Result<Self, Self::Error> {
        Self::new(point.y(), point.x())
    }
}

impl From<Coordinate> for Point<f64> {
    fn from(value: Coordinate) -> Self {
        value.to_point()
    }
}

impl From<Coordinate> for Coord<f64> {
    fn from(value: Coordinate) -> Self {
        Coord {
            x: value.longitude,
            y: value.latitude,
        }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.latitude, self.longitude)
    }
}
