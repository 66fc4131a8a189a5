use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Coordinate, Error};

/// Settings of a map view and its driver tracking loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// Initial centre when nothing better is known
    pub center: Coordinate,
    pub zoom: f64,
    /// Zoom used when centring on a single marker
    pub single_marker_zoom: f64,
    /// Zoom used after locating the device
    pub locate_zoom: f64,
    /// Padding in pixels kept around fitted bounds
    pub fit_padding: f64,
    pub driver_search_radius_km: f64,
    pub min_tracking_interval_ms: u64,
    pub default_tracking_interval_ms: u64,
    /// Interval used by the "view on map" modal for active trips
    pub modal_tracking_interval_ms: u64,
    pub geolocation_timeout_ms: u64,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            center: Coordinate {
                latitude: 37.7749,
                longitude: -122.4194,
            },
            zoom: 13.0,
            single_marker_zoom: 15.0,
            locate_zoom: 15.0,
            fit_padding: 20.0,
            driver_search_radius_km: 10.0,
            min_tracking_interval_ms: 1_000,
            default_tracking_interval_ms: 30_000,
            modal_tracking_interval_ms: 10_000,
            geolocation_timeout_ms: 10_000,
        }
    }
}

impl MapConfig {
    pub fn min_tracking_interval(&self) -> Duration {
        Duration::from_millis(self.min_tracking_interval_ms)
    }

    pub fn default_tracking_interval(&self) -> Duration {
        Duration::from_millis(self.default_tracking_interval_ms)
    }

    pub fn modal_tracking_interval(&self) -> Duration {
        Duration::from_millis(self.modal_tracking_interval_ms)
    }

    pub fn geolocation_timeout(&self) -> Duration {
        Duration::from_millis(self.geolocation_timeout_ms)
    }

    /// Clamps a requested polling interval to the enforced minimum
    pub fn tracking_interval(&self, requested: Duration) -> Duration {
        requested.max(self.min_tracking_interval())
    }

    /// # Errors
    ///
    /// Returns `Error::InvalidData` describing the first invalid setting
    pub fn validate(&self) -> Result<(), Error> {
        Coordinate::new(self.center.latitude, self.center.longitude)?;
        if self.driver_search_radius_km <= 0.0 {
            return Err(Error::InvalidData(
                "Driver search radius must be greater than 0".to_string(),
            ));
        }
        if self.min_tracking_interval_ms == 0 {
            return Err(Error::InvalidData(
                "Minimum tracking interval must be greater than 0".to_string(),
            ));
        }
        if self.fit_padding < 0.0 {
            return Err(Error::InvalidData(
                "Fit padding cannot be negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// Pricing used to turn a distance and duration into a fare
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FareConfig {
    pub cost_per_km: f64,
    pub cost_per_minute: f64,
}

impl Default for FareConfig {
    fn default() -> Self {
        Self {
            cost_per_km: 1.0,
            cost_per_minute: 0.2,
        }
    }
}

impl FareConfig {
    /// # Errors
    ///
    /// Returns `Error::InvalidData` for negative prices
    pub fn validate(&self) -> Result<(), Error> {
        if self.cost_per_km < 0.0 {
            return Err(Error::InvalidData(
                "Cost per kilometer cannot be negative".to_string(),
            ));
        }
        if self.cost_per_minute < 0.0 {
            return Err(Error::InvalidData(
                "Cost per minute cannot be negative".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let config: MapConfig =
            serde_json::from_str(r#"{"zoom": 11.0, "driver_search_radius_km": 3.5}"#).unwrap();
        assert_eq!(config.zoom, 11.0);
        assert_eq!(config.driver_search_radius_km, 3.5);
        assert_eq!(config.single_marker_zoom, 15.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn interval_is_clamped_to_minimum() {
        let config = MapConfig::default();
        assert_eq!(
            config.tracking_interval(Duration::from_millis(10)),
            Duration::from_secs(1)
        );
        assert_eq!(
            config.tracking_interval(Duration::from_secs(5)),
            Duration::from_secs(5)
        );
    }

    #[test]
    fn rejects_bad_settings() {
        let config = MapConfig {
            driver_search_radius_km: 0.0,
            ..MapConfig::default()
        };
        assert!(config.validate().is_err());

        let fares = FareConfig {
            cost_per_minute: -0.1,
            ..FareConfig::default()
        };
        assert!(fares.validate().is_err());
    }
}
