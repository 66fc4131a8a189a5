//! In-memory driver location log.
//!
//! Fixes are kept for the lifetime of the process. The store also answers
//! nearby-driver lookups, so a map overlay can poll it directly.

use std::collections::HashMap;

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use futures::{
    FutureExt,
    future::{self, BoxFuture},
};
use hayago_core::{
    Coordinate, DriverRecord, DriverStatus, Error, geometry::measure::haversine_km,
    services::NearbyDriverLookup,
};
use parking_lot::RwLock;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{config::NearbyConfig, error::ApiError};

/// Stored position report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationFix {
    pub id: u64,
    pub driver_id: String,
    pub timestamp: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    pub speed: Option<f64>,
    pub heading: Option<f64>,
    pub accuracy: Option<f64>,
    pub is_offline: bool,
    pub trip_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl LocationFix {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }

    fn to_driver_record(&self) -> DriverRecord {
        DriverRecord {
            driver_id: self.driver_id.clone(),
            coordinate: self.coordinate(),
            name: None,
            status: if self.is_offline {
                DriverStatus::Offline
            } else {
                DriverStatus::Available
            },
            speed: self.speed,
            heading: self.heading,
            last_seen: Some(self.timestamp),
        }
    }
}

/// Position report as posted by a driver device
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LocationPayload {
    pub driver_id: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub timestamp: Option<String>,
    pub speed: Option<f64>,
    pub heading: Option<f64>,
    pub accuracy: Option<f64>,
    #[serde(default)]
    pub is_offline: bool,
    pub trip_id: Option<String>,
}

/// Validated report, ready to be stored
#[derive(Debug, Clone, PartialEq)]
pub struct NewLocation {
    pub driver_id: String,
    pub coordinate: Coordinate,
    pub timestamp: DateTime<Utc>,
    pub speed: Option<f64>,
    pub heading: Option<f64>,
    pub accuracy: Option<f64>,
    pub is_offline: bool,
    pub trip_id: Option<String>,
}

impl LocationPayload {
    /// Checks required fields and ranges. An unreadable timestamp falls back to `now`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::BadRequest` naming the first problem found
    pub fn validate(self, now: DateTime<Utc>) -> Result<NewLocation, ApiError> {
        let driver_id = self
            .driver_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| missing("driver_id"))?;
        let latitude = self.latitude.ok_or_else(|| missing("latitude"))?;
        let longitude = self.longitude.ok_or_else(|| missing("longitude"))?;
        let coordinate = Coordinate::new(latitude, longitude)?;

        Ok(NewLocation {
            driver_id,
            coordinate,
            timestamp: self
                .timestamp
                .as_deref()
                .and_then(parse_timestamp)
                .unwrap_or(now),
            speed: self.speed,
            heading: self.heading,
            accuracy: self.accuracy,
            is_offline: self.is_offline,
            trip_id: self.trip_id,
        })
    }
}

fn missing(field: &str) -> ApiError {
    ApiError::BadRequest(format!("Missing required field: {field}"))
}

/// RFC 3339, or a naive ISO 8601 date-time taken as UTC
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|t| t.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|t| t.and_utc())
        })
}

/// A driver's latest fix and its distance from the search centre
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NearbyDriver {
    #[serde(flatten)]
    pub fix: LocationFix,
    pub distance_km: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub total_locations: usize,
    pub active_drivers: usize,
}

#[derive(Default)]
struct Inner {
    fixes: Vec<LocationFix>,
    next_id: u64,
}

pub struct LocationStore {
    inner: RwLock<Inner>,
    nearby: NearbyConfig,
}

impl LocationStore {
    pub fn new(nearby: NearbyConfig) -> Self {
        Self {
            inner: RwLock::new(Inner {
                fixes: Vec::new(),
                next_id: 1,
            }),
            nearby,
        }
    }

    pub fn nearby_config(&self) -> &NearbyConfig {
        &self.nearby
    }

    pub fn record(&self, location: NewLocation, now: DateTime<Utc>) -> LocationFix {
        let mut inner = self.inner.write();
        let fix = LocationFix {
            id: inner.next_id,
            driver_id: location.driver_id,
            timestamp: location.timestamp,
            latitude: location.coordinate.latitude,
            longitude: location.coordinate.longitude,
            speed: location.speed,
            heading: location.heading,
            accuracy: location.accuracy,
            is_offline: location.is_offline,
            trip_id: location.trip_id,
            created_at: now,
        };
        inner.next_id += 1;
        inner.fixes.push(fix.clone());
        fix
    }

    /// Fixes of one driver at or after `since`, newest first
    pub fn history(&self, driver_id: &str, since: DateTime<Utc>, limit: usize) -> Vec<LocationFix> {
        let inner = self.inner.read();
        let mut fixes: Vec<_> = inner
            .fixes
            .iter()
            .filter(|fix| fix.driver_id == driver_id && fix.timestamp >= since)
            .cloned()
            .collect();
        fixes.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
        fixes.truncate(limit);
        fixes
    }

    pub fn latest(&self, driver_id: &str) -> Option<LocationFix> {
        self.inner
            .read()
            .fixes
            .iter()
            .filter(|fix| fix.driver_id == driver_id)
            .max_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.id.cmp(&b.id)))
            .cloned()
    }

    /// Latest recent fix of every driver within `radius_km` of `center`, nearest first
    pub fn nearby(
        &self,
        center: Coordinate,
        radius_km: f64,
        now: DateTime<Utc>,
    ) -> Vec<NearbyDriver> {
        let since = now - Duration::minutes(self.nearby.recent_minutes);
        let inner = self.inner.read();

        let mut latest: HashMap<&str, &LocationFix> = HashMap::new();
        for fix in inner.fixes.iter().filter(|fix| fix.timestamp >= since) {
            latest
                .entry(fix.driver_id.as_str())
                .and_modify(|current| {
                    if (fix.timestamp, fix.id) > (current.timestamp, current.id) {
                        *current = fix;
                    }
                })
                .or_insert(fix);
        }

        let candidates: Vec<&LocationFix> = latest.into_values().collect();
        let mut found: Vec<NearbyDriver> = candidates
            .par_iter()
            .filter_map(|fix| {
                let distance_km = haversine_km(center, fix.coordinate());
                (distance_km <= radius_km).then(|| NearbyDriver {
                    fix: (*fix).clone(),
                    distance_km,
                })
            })
            .collect();

        found.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
        found.truncate(self.nearby.max_results);
        found
    }

    /// Positions logged for a trip, oldest first
    pub fn trip_route(&self, trip_id: &str) -> Vec<Coordinate> {
        let inner = self.inner.read();
        let mut fixes: Vec<&LocationFix> = inner
            .fixes
            .iter()
            .filter(|fix| fix.trip_id.as_deref() == Some(trip_id))
            .collect();
        fixes.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.id.cmp(&b.id)));
        fixes.into_iter().map(LocationFix::coordinate).collect()
    }

    pub fn stats(&self) -> StoreStats {
        let inner = self.inner.read();
        let mut drivers: Vec<&str> = inner.fixes.iter().map(|f| f.driver_id.as_str()).collect();
        drivers.sort_unstable();
        drivers.dedup();
        StoreStats {
            total_locations: inner.fixes.len(),
            active_drivers: drivers.len(),
        }
    }
}

impl NearbyDriverLookup for LocationStore {
    fn find_nearby(
        &self,
        center: Coordinate,
        radius_km: f64,
    ) -> BoxFuture<'_, Result<Vec<DriverRecord>, Error>> {
        let drivers = self
            .nearby(center, radius_km, Utc::now())
            .iter()
            .map(|found| found.fix.to_driver_record())
            .collect();
        future::ready(Ok(drivers)).boxed()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, minute, 0).unwrap()
    }

    fn fix(driver: &str, lat: f64, lng: f64, time: DateTime<Utc>) -> NewLocation {
        NewLocation {
            driver_id: driver.to_string(),
            coordinate: Coordinate::new(lat, lng).unwrap(),
            timestamp: time,
            speed: None,
            heading: None,
            accuracy: None,
            is_offline: false,
            trip_id: None,
        }
    }

    #[test]
    fn payload_validation() {
        let now = at(0);
        let payload = LocationPayload {
            driver_id: Some("DRV-1".into()),
            latitude: Some(37.77),
            longitude: None,
            ..LocationPayload::default()
        };
        let err = payload.validate(now).unwrap_err();
        assert_eq!(err.to_string(), "Missing required field: longitude");

        let payload = LocationPayload {
            driver_id: Some("DRV-1".into()),
            latitude: Some(91.0),
            longitude: Some(0.0),
            ..LocationPayload::default()
        };
        assert!(matches!(payload.validate(now), Err(ApiError::BadRequest(_))));

        let payload = LocationPayload {
            driver_id: Some("DRV-1".into()),
            latitude: Some(37.77),
            longitude: Some(-122.42),
            timestamp: Some("yesterday-ish".into()),
            ..LocationPayload::default()
        };
        assert_eq!(payload.validate(now).unwrap().timestamp, now);
    }

    #[test]
    fn timestamps_with_and_without_offset() {
        assert_eq!(parse_timestamp("2025-06-01T12:05:00Z"), Some(at(5)));
        assert_eq!(parse_timestamp("2025-06-01T12:05:00"), Some(at(5)));
        assert_eq!(parse_timestamp("2025-06-01T14:05:00+02:00"), Some(at(5)));
        assert_eq!(parse_timestamp("soon"), None);
    }

    #[test]
    fn history_is_newest_first_and_limited() {
        let store = LocationStore::new(NearbyConfig::default());
        for minute in [1, 3, 2] {
            store.record(fix("DRV-1", 37.0, -122.0, at(minute)), at(minute));
        }
        store.record(fix("DRV-2", 37.0, -122.0, at(4)), at(4));

        let history = store.history("DRV-1", at(2), 10);
        let times: Vec<_> = history.iter().map(|f| f.timestamp).collect();
        assert_eq!(times, vec![at(3), at(2)]);
        assert_eq!(store.history("DRV-1", at(0), 1).len(), 1);
        assert_eq!(store.latest("DRV-1").unwrap().timestamp, at(3));
        assert!(store.latest("DRV-9").is_none());
    }

    #[test]
    fn nearby_uses_latest_recent_fix_per_driver() {
        let store = LocationStore::new(NearbyConfig::default());
        let now = at(30);
        // moved out of range since
        store.record(fix("near-then-far", 37.7749, -122.4194, at(26)), now);
        store.record(fix("near-then-far", 38.5, -121.0, at(28)), now);
        // too old
        store.record(fix("stale", 37.7750, -122.4195, at(10)), now);
        store.record(fix("close", 37.7760, -122.4194, at(29)), now);
        store.record(fix("closer", 37.7750, -122.4194, at(29)), now);

        let center = Coordinate::new(37.7749, -122.4194).unwrap();
        let found = store.nearby(center, 5.0, now);
        let ids: Vec<_> = found.iter().map(|d| d.fix.driver_id.as_str()).collect();
        assert_eq!(ids, vec!["closer", "close"]);
        assert!(found[0].distance_km < found[1].distance_km);
    }

    #[test]
    fn nearby_is_capped() {
        let store = LocationStore::new(NearbyConfig {
            max_results: 3,
            ..NearbyConfig::default()
        });
        let now = at(30);
        for i in 0..10 {
            let offset = f64::from(i) * 0.001;
            store.record(fix(&format!("DRV-{i}"), 37.7749 + offset, -122.4194, now), now);
        }
        let center = Coordinate::new(37.7749, -122.4194).unwrap();
        let ids: Vec<_> = store
            .nearby(center, 5.0, now)
            .into_iter()
            .map(|d| d.fix.driver_id)
            .collect();
        assert_eq!(ids, vec!["DRV-0", "DRV-1", "DRV-2"]);
    }

    #[test]
    fn trip_route_is_in_time_order() {
        let store = LocationStore::new(NearbyConfig::default());
        let mut late = fix("DRV-1", 37.8, -122.4, at(5));
        late.trip_id = Some("TRIP-1".into());
        let mut early = fix("DRV-1", 37.7, -122.5, at(1));
        early.trip_id = Some("TRIP-1".into());
        store.record(late, at(5));
        store.record(early, at(5));
        store.record(fix("DRV-1", 0.0, 0.0, at(3)), at(5));

        let route = store.trip_route("TRIP-1");
        assert_eq!(route.len(), 2);
        assert_eq!(route[0].latitude, 37.7);
        assert!(store.trip_route("TRIP-2").is_empty());
        assert_eq!(
            store.stats(),
            StoreStats {
                total_locations: 3,
                active_drivers: 1
            }
        );
    }

    #[tokio::test]
    async fn store_serves_overlay_lookups() {
        let store = LocationStore::new(NearbyConfig::default());
        let now = Utc::now();
        let mut offline = fix("DRV-1", 37.7749, -122.4194, now);
        offline.is_offline = true;
        offline.speed = Some(12.0);
        store.record(offline, now);

        let center = Coordinate::new(37.7749, -122.4194).unwrap();
        let drivers = store.find_nearby(center, 1.0).await.unwrap();
        assert_eq!(drivers.len(), 1);
        assert_eq!(drivers[0].status, DriverStatus::Offline);
        assert_eq!(drivers[0].speed, Some(12.0));
    }
}
