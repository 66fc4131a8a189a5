//! Geometry helpers: route interchange, bounding boxes and distances

mod bounds;
mod interchange;
pub mod measure;

pub use bounds::Bounds;
pub use interchange::{
    parse_route_geometry, route_feature, route_from_value, route_to_geojson,
    route_to_geojson_string,
};
