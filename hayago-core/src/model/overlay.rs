//! Overlay objects tracked by a `MapOverlay`

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Coordinate;
use crate::map::LayerId;

/// Small round badge drawn instead of the default pin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerIcon {
    pub label: String,
    pub color: String,
}

impl MarkerIcon {
    pub fn badge(label: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            color: color.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerOptions {
    pub title: String,
    pub popup: Option<String>,
    pub draggable: bool,
    pub icon: Option<MarkerIcon>,
}

impl Default for MarkerOptions {
    fn default() -> Self {
        Self {
            title: "Marker".to_string(),
            popup: None,
            draggable: false,
            icon: None,
        }
    }
}

impl MarkerOptions {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_popup(mut self, popup: impl Into<String>) -> Self {
        self.popup = Some(popup.into());
        self
    }

    #[must_use]
    pub fn with_icon(mut self, icon: MarkerIcon) -> Self {
        self.icon = Some(icon);
        self
    }

    #[must_use]
    pub fn draggable(mut self) -> Self {
        self.draggable = true;
        self
    }
}

/// Point marker installed under a caller chosen key
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub key: String,
    pub coordinate: Coordinate,
    pub options: MarkerOptions,
    /// Handle of the viewport layer currently drawing this marker
    pub layer: LayerId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteStyle {
    pub color: String,
    pub weight: f64,
    pub opacity: f64,
}

impl Default for RouteStyle {
    fn default() -> Self {
        Self {
            color: "#007bff".to_string(),
            weight: 4.0,
            opacity: 0.7,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RouteOptions {
    pub style: RouteStyle,
    pub popup: Option<String>,
    /// Fit the viewport to the route once it is drawn
    pub fit_bounds: bool,
}

impl Default for RouteOptions {
    fn default() -> Self {
        Self {
            style: RouteStyle::default(),
            popup: None,
            fit_bounds: true,
        }
    }
}

/// Polyline installed under a caller chosen key
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub key: String,
    pub coordinates: Vec<Coordinate>,
    pub options: RouteOptions,
    /// `None` for an empty route, which is tracked but draws nothing
    pub layer: Option<LayerId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverStatus {
    #[default]
    Available,
    Busy,
    Offline,
}

impl DriverStatus {
    pub fn color(self) -> &'static str {
        match self {
            DriverStatus::Available => "#28a745",
            DriverStatus::Busy => "#ffc107",
            DriverStatus::Offline => "#6c757d",
        }
    }
}

impl fmt::Display for DriverStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DriverStatus::Available => "available",
            DriverStatus::Busy => "busy",
            DriverStatus::Offline => "offline",
        };
        f.write_str(name)
    }
}

/// Driver position as reported by the nearby-driver lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverRecord {
    pub driver_id: String,
    pub coordinate: Coordinate,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: DriverStatus,
    /// km/h
    #[serde(default)]
    pub speed: Option<f64>,
    /// degrees clockwise from north
    #[serde(default)]
    pub heading: Option<f64>,
    #[serde(default)]
    pub last_seen: Option<DateTime<Utc>>,
}

impl DriverRecord {
    pub fn new(driver_id: impl Into<String>, coordinate: Coordinate) -> Self {
        Self {
            driver_id: driver_id.into(),
            coordinate,
            name: None,
            status: DriverStatus::Available,
            speed: None,
            heading: None,
            last_seen: None,
        }
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.driver_id)
    }

    /// Popup text shown when the driver marker is clicked
    pub fn popup_content(&self) -> String {
        let mut lines = vec![
            self.display_name().to_string(),
            format!("Status: {}", self.status),
        ];
        if let Some(speed) = self.speed {
            lines.push(format!("Speed: {speed} km/h"));
        }
        if let Some(heading) = self.heading {
            lines.push(format!("Heading: {heading}°"));
        }
        lines.join("\n")
    }
}

/// Live driver overlay object
#[derive(Debug, Clone, PartialEq)]
pub struct DriverMarker {
    pub record: DriverRecord,
    pub layer: LayerId,
}

impl DriverMarker {
    pub fn driver_id(&self) -> &str {
        &self.record.driver_id
    }

    pub fn coordinate(&self) -> Coordinate {
        self.record.coordinate
    }
}
