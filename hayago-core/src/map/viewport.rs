//! The seam between overlay bookkeeping and whatever draws the map

use crate::{Bounds, Coordinate, DriverRecord, MarkerOptions, RouteStyle};

/// Handle of a layer installed on a viewport
pub type LayerId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerKind {
    Marker,
    Polyline,
    Driver,
    CurrentLocation,
}

/// Description of a visual element handed to the viewport
#[derive(Debug, Clone, PartialEq)]
pub enum LayerSpec {
    Marker {
        coordinate: Coordinate,
        options: MarkerOptions,
    },
    Polyline {
        coordinates: Vec<Coordinate>,
        style: RouteStyle,
        popup: Option<String>,
    },
    Driver {
        record: DriverRecord,
        color: &'static str,
        popup: String,
    },
    CurrentLocation {
        coordinate: Coordinate,
        popup: String,
    },
}

impl LayerSpec {
    /// Driver marker coloured by status, with the driver's details as popup
    pub fn driver(record: DriverRecord) -> Self {
        LayerSpec::Driver {
            color: record.status.color(),
            popup: record.popup_content(),
            record,
        }
    }

    pub fn current_location(coordinate: Coordinate) -> Self {
        LayerSpec::CurrentLocation {
            coordinate,
            popup: "Your current location".to_string(),
        }
    }

    pub fn kind(&self) -> LayerKind {
        match self {
            LayerSpec::Marker { .. } => LayerKind::Marker,
            LayerSpec::Polyline { .. } => LayerKind::Polyline,
            LayerSpec::Driver { .. } => LayerKind::Driver,
            LayerSpec::CurrentLocation { .. } => LayerKind::CurrentLocation,
        }
    }

    /// Position of point-like layers
    pub fn anchor(&self) -> Option<Coordinate> {
        match self {
            LayerSpec::Marker { coordinate, .. }
            | LayerSpec::CurrentLocation { coordinate, .. } => Some(*coordinate),
            LayerSpec::Driver { record, .. } => Some(record.coordinate),
            LayerSpec::Polyline { .. } => None,
        }
    }
}

/// Map canvas owned by exactly one `MapOverlay`
pub trait Viewport: Send + 'static {
    fn add_layer(&mut self, layer: LayerSpec) -> LayerId;

    /// Removing an unknown layer is a no-op
    fn remove_layer(&mut self, id: LayerId);

    fn set_view(&mut self, center: Coordinate, zoom: f64);

    /// Fits the view to `bounds`, keeping `padding` pixels free on every side
    fn fit_bounds(&mut self, bounds: Bounds, padding: f64);

    fn open_popup(&mut self, at: Coordinate, content: String);

    fn center(&self) -> Coordinate;

    fn zoom(&self) -> f64;

    /// Frees the canvas; the viewport is not used afterwards
    fn release(&mut self);
}
