//! Route geometry interchange. Positions on the wire are `[longitude, latitude]`,
//! overlays use latitude first, so every conversion goes through here.

use geo::{Coord, LineString};
use geojson::{Feature, Geometry, Value as GeoJsonValue};
use serde::Deserialize;
use serde_json::{Map, Value, json};

use crate::{Coordinate, Error};

#[derive(Deserialize)]
struct RawLineString {
    #[serde(rename = "type")]
    kind: Option<String>,
    coordinates: Vec<Vec<f64>>,
}

/// Parses a `GeoJSON` `LineString` (or a `Feature` wrapping one) into
/// latitude-first coordinates.
///
/// The `type` member may be omitted, only `coordinates` is required.
///
/// # Errors
///
/// Returns `Error::MalformedGeometry` for invalid JSON, a non-line geometry,
/// short positions or out of range values.
pub fn parse_route_geometry(text: &str) -> Result<Vec<Coordinate>, Error> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| Error::MalformedGeometry(e.to_string()))?;
    route_from_value(value)
}

/// Same as [`parse_route_geometry`] for an already decoded JSON value
pub fn route_from_value(value: Value) -> Result<Vec<Coordinate>, Error> {
    let value = match value {
        Value::Object(mut object) if object.get("type") == Some(&json!("Feature")) => object
            .remove("geometry")
            .filter(|geometry| !geometry.is_null())
            .ok_or_else(|| Error::MalformedGeometry("feature has no geometry".to_string()))?,
        other => other,
    };

    let raw: RawLineString =
        serde_json::from_value(value).map_err(|e| Error::MalformedGeometry(e.to_string()))?;

    if let Some(kind) = raw.kind.as_deref()
        && kind != "LineString"
    {
        return Err(Error::MalformedGeometry(format!(
            "expected a LineString, found {kind}"
        )));
    }

    raw.coordinates
        .iter()
        .enumerate()
        .map(|(idx, position)| {
            Coordinate::from_lng_lat(position)
                .map_err(|e| Error::MalformedGeometry(format!("position {idx}: {e}")))
        })
        .collect()
}

/// Builds a `GeoJSON` `LineString` geometry from latitude-first coordinates
pub fn route_to_geojson(coordinates: &[Coordinate]) -> Geometry {
    let coords: Vec<Coord<f64>> = coordinates.iter().map(|&c| c.into()).collect();
    Geometry::new(GeoJsonValue::from(&LineString::new(coords)))
}

pub fn route_to_geojson_string(coordinates: &[Coordinate]) -> Result<String, Error> {
    serde_json::to_string(&route_to_geojson(coordinates))
        .map_err(|e| Error::GeoJsonError(e.to_string()))
}

/// Wraps a route into a `Feature` carrying the given properties
pub fn route_feature(
    coordinates: &[Coordinate],
    properties: Map<String, Value>,
) -> Result<Feature, Error> {
    let value = json!({
        "type": "Feature",
        "geometry": route_to_geojson(coordinates),
        "properties": properties,
    });

    serde_json::from_value::<Feature>(value).map_err(|e| Error::GeoJsonError(e.to_string()))
}
