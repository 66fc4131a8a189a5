//! Event handlers of the trip form.
//!
//! Each handler reads the current record from the store, issues at most a
//! few remote calls and pushes the resulting state to the attached map.
//! Responses are applied in arrival order: a late answer to a superseded
//! request still overwrites the record.

use std::{fmt, sync::Arc};

use log::{debug, warn};
use parking_lot::Mutex;

use crate::{
    Coordinate, Error, MarkerOptions, RouteOptions, RouteStyle, TripEnd, TripEstimate, TripRecord,
    TripStatus, TripUpdate,
    config::MapConfig,
    geometry::parse_route_geometry,
    map::{MapOverlay, Viewport},
    services::{
        AddressLookup, DriverMatching, GeolocationProvider, MatchOutcome, MatchRequest,
        NearbyDriverLookup, Notice, Notifier, TripEstimation, TripRecordStore,
    },
};

pub const PLANNED_ROUTE: &str = "planned";
pub const LOGGED_ROUTE: &str = "logged";

/// Remote services the form calls into
#[derive(Clone)]
pub struct TripServices {
    pub addresses: Arc<dyn AddressLookup>,
    pub estimation: Arc<dyn TripEstimation>,
    pub matching: Arc<dyn DriverMatching>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TripAction {
    FindDriver,
    StartTrip,
    CompleteTrip,
    ViewOnMap,
}

impl TripAction {
    pub fn label(self) -> &'static str {
        match self {
            TripAction::FindDriver => "Find Driver",
            TripAction::StartTrip => "Start Trip",
            TripAction::CompleteTrip => "Complete Trip",
            TripAction::ViewOnMap => "View on Map",
        }
    }

    pub fn is_available(self, status: TripStatus) -> bool {
        match self {
            TripAction::FindDriver => status == TripStatus::Pending,
            TripAction::StartTrip => status == TripStatus::Accepted,
            TripAction::CompleteTrip => status == TripStatus::OnRoute,
            TripAction::ViewOnMap => true,
        }
    }
}

impl fmt::Display for TripAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

pub struct TripForm<V: Viewport> {
    store: Arc<dyn TripRecordStore>,
    services: TripServices,
    notifier: Arc<dyn Notifier>,
    config: MapConfig,
    map: Mutex<Option<Arc<MapOverlay<V>>>>,
}

impl<V: Viewport> TripForm<V> {
    pub fn new(
        store: Arc<dyn TripRecordStore>,
        services: TripServices,
        notifier: Arc<dyn Notifier>,
        config: MapConfig,
    ) -> Self {
        Self {
            store,
            services,
            notifier,
            config,
            map: Mutex::new(None),
        }
    }

    pub fn record(&self) -> TripRecord {
        self.store.snapshot()
    }

    /// Map currently embedded in the form, if any
    pub fn map(&self) -> Option<Arc<MapOverlay<V>>> {
        self.map.lock().clone()
    }

    /// Embeds `overlay` in the form, destroying any previous map, and draws the trip on it
    pub fn attach_map(&self, overlay: MapOverlay<V>) -> Arc<MapOverlay<V>> {
        let overlay = Arc::new(overlay);
        let previous = self.map.lock().replace(Arc::clone(&overlay));
        if let Some(previous) = previous {
            previous.destroy();
        }
        self.render_map();
        overlay
    }

    pub fn detach_map(&self) {
        let previous = self.map.lock().take();
        if let Some(previous) = previous {
            previous.destroy();
        }
    }

    /// Geocodes the address of one trip end and stores the coordinate.
    ///
    /// Returns the stored coordinate. Empty addresses are ignored; failures
    /// raise a notice and leave the coordinates as they were.
    pub async fn on_address_changed(&self, end: TripEnd) -> Option<Coordinate> {
        let address = self.store.snapshot().address(end)?.to_string();

        match self.services.addresses.geocode(&address).await {
            Ok(found) => {
                debug!(
                    "{} address {address:?} resolved to {} ({})",
                    end.label(),
                    found.coordinate,
                    found.display_name
                );
                self.store
                    .apply(TripUpdate::Coordinate(end, found.coordinate));
                self.on_coordinates_changed().await;
                Some(found.coordinate)
            }
            Err(e) => {
                debug!("Geocoding {address:?} failed: {e}");
                self.notify(Notice::message(format!(
                    "Could not geocode address: {address}"
                )));
                None
            }
        }
    }

    /// Redraws the map and requests an estimate once both ends are known
    pub async fn on_coordinates_changed(&self) {
        self.render_map();
        if self.store.snapshot().has_both_ends() {
            self.request_estimate().await;
        }
    }

    /// Writes a dragged pickup or dropoff marker position back to the record
    pub async fn on_marker_dragged(&self, key: &str, to: Coordinate) {
        let Some(end) = TripEnd::from_key(key) else {
            return;
        };
        if let Some(map) = self.map() {
            map.marker_moved(key, to);
        }
        self.store.apply(TripUpdate::Coordinate(end, to));
        self.on_coordinates_changed().await;
    }

    /// Asks for distance, duration, cost and route between both trip ends
    pub async fn request_estimate(&self) -> Option<TripEstimate> {
        let trip = self.store.snapshot();
        let (pickup, dropoff) = (trip.pickup()?, trip.dropoff()?);

        match self.services.estimation.estimate(pickup, dropoff).await {
            Ok(estimate) => {
                self.store.apply(TripUpdate::Estimate(estimate.clone()));
                self.render_map();
                self.notify(Notice::alert("Trip estimate updated"));
                Some(estimate)
            }
            Err(Error::MalformedGeometry(reason)) => {
                warn!(
                    "Estimate for trip {} returned an unreadable route: {reason}",
                    trip.trip_id
                );
                None
            }
            Err(e) => {
                debug!("Estimating trip {} failed: {e}", trip.trip_id);
                self.notify(Notice::message("Could not calculate trip estimate"));
                None
            }
        }
    }

    /// Pushes the record's markers and routes to the embedded map
    pub fn render_map(&self) {
        let Some(map) = self.map() else {
            return;
        };
        if let Err(e) = draw_trip(&map, &self.store.snapshot()) {
            debug!("Map refresh skipped: {e}");
        }
    }

    pub fn available_actions(&self) -> Vec<TripAction> {
        let status = self.store.snapshot().status;
        [
            TripAction::FindDriver,
            TripAction::StartTrip,
            TripAction::CompleteTrip,
            TripAction::ViewOnMap,
        ]
        .into_iter()
        .filter(|action| action.is_available(status))
        .collect()
    }

    /// Asks the matching service for a driver near the pickup.
    /// Returns whether a driver was assigned.
    pub async fn find_driver(&self) -> bool {
        let trip = self.store.snapshot();
        if !self.guard(TripAction::FindDriver, trip.status) {
            return false;
        }
        let Some(pickup) = trip.pickup() else {
            self.notify(Notice::message("Please set pickup location first"));
            return false;
        };

        let request = MatchRequest {
            pickup,
            dropoff: trip.dropoff(),
            customer: trip.customer.clone(),
            pickup_address: trip.pickup_address.clone(),
            dropoff_address: trip.dropoff_address.clone(),
        };
        match self.services.matching.match_driver(request).await {
            Ok(MatchOutcome::Matched { driver_id }) => {
                debug!("Trip {} matched to driver {driver_id:?}", trip.trip_id);
                self.notify(Notice::message("Driver matched successfully!"));
                self.reload().await;
                true
            }
            outcome => {
                if let Err(e) = outcome {
                    debug!("Driver matching for trip {} failed: {e}", trip.trip_id);
                }
                self.notify(Notice::message(Error::NoDriversAvailable.to_string()));
                false
            }
        }
    }

    /// Returns whether navigation was started
    pub async fn start_trip(&self) -> bool {
        let trip = self.store.snapshot();
        if !self.guard(TripAction::StartTrip, trip.status) {
            return false;
        }
        match self.store.start_navigation(&trip.trip_id).await {
            Ok(()) => {
                self.notify(Notice::alert("Trip navigation started"));
                self.reload().await;
                true
            }
            Err(e) => {
                debug!("Starting trip {} failed: {e}", trip.trip_id);
                self.notify(Notice::message("Could not start trip navigation"));
                false
            }
        }
    }

    /// Returns whether the trip was completed
    pub async fn complete_trip(&self) -> bool {
        let trip = self.store.snapshot();
        if !self.guard(TripAction::CompleteTrip, trip.status) {
            return false;
        }
        match self.store.complete_trip(&trip.trip_id).await {
            Ok(()) => {
                self.notify(Notice::alert("Trip completed successfully"));
                self.reload().await;
                true
            }
            Err(e) => {
                debug!("Completing trip {} failed: {e}", trip.trip_id);
                self.notify(Notice::message("Could not complete trip"));
                false
            }
        }
    }

    /// Builds the standalone "view on map" overlay for this trip.
    ///
    /// Active trips get live driver tracking. The caller owns the overlay
    /// and destroys it when the view closes.
    ///
    /// # Errors
    ///
    /// Returns an error if driver tracking cannot be started
    pub fn open_map_view(
        &self,
        viewport: V,
        drivers: Arc<dyn NearbyDriverLookup>,
    ) -> Result<MapOverlay<V>, Error> {
        let trip = self.store.snapshot();
        let center = trip.pickup().unwrap_or(self.config.center);
        let overlay = MapOverlay::centered(viewport, self.config.clone(), drivers, center);

        for end in [TripEnd::Pickup, TripEnd::Dropoff] {
            if let Some(coordinate) = trip.coordinate(end) {
                overlay.upsert_marker(end.key(), coordinate, end_marker(&trip, end))?;
            }
        }
        if trip.status == TripStatus::OnRoute {
            overlay.start_driver_tracking(self.config.modal_tracking_interval())?;
        }
        Ok(overlay)
    }

    /// Marks the device position on the embedded map
    pub async fn locate_user(&self, provider: &dyn GeolocationProvider) -> Option<Coordinate> {
        let map = self.map()?;
        match map.locate_user(provider).await {
            Ok(coordinate) => Some(coordinate),
            Err(Error::Detached) => None,
            Err(e) => {
                debug!("Locating the device failed: {e}");
                self.notify(Notice::message("Unable to get your location."));
                None
            }
        }
    }

    fn guard(&self, action: TripAction, status: TripStatus) -> bool {
        if action.is_available(status) {
            return true;
        }
        let refused = Error::ActionNotAllowed {
            action: action.label(),
            status,
        };
        self.notify(Notice::message(refused.to_string()));
        false
    }

    async fn reload(&self) {
        if let Err(e) = self.store.reload().await {
            warn!("Reloading trip record failed: {e}");
        }
        self.render_map();
    }

    fn notify(&self, notice: Notice) {
        self.notifier.notify(notice);
    }
}

impl<V: Viewport> Drop for TripForm<V> {
    fn drop(&mut self) {
        self.detach_map();
    }
}

fn end_marker(trip: &TripRecord, end: TripEnd) -> MarkerOptions {
    let address = trip.address(end).unwrap_or(end.title());
    MarkerOptions::titled(end.title()).with_popup(format!("{}:\n{address}", end.label()))
}

fn route_popup(title: &str, distance: Option<f64>, duration: Option<f64>) -> String {
    let or_na = |value: Option<f64>| value.map_or_else(|| "N/A".to_string(), |v| v.to_string());
    format!(
        "{title}\nDistance: {} km\nDuration: {} min",
        or_na(distance),
        or_na(duration)
    )
}

fn logged_route_options(trip: &TripRecord) -> RouteOptions {
    RouteOptions {
        style: RouteStyle {
            color: "#28a745".to_string(),
            weight: 5.0,
            opacity: 0.8,
        },
        popup: Some(route_popup(
            "Actual Route",
            trip.actual_distance,
            trip.actual_duration,
        )),
        fit_bounds: false,
    }
}

fn draw_trip<V: Viewport>(map: &MapOverlay<V>, trip: &TripRecord) -> Result<(), Error> {
    for end in [TripEnd::Pickup, TripEnd::Dropoff] {
        match trip.coordinate(end) {
            Some(coordinate) => {
                let options = end_marker(trip, end).with_icon(end.icon()).draggable();
                map.upsert_marker(end.key(), coordinate, options)?;
            }
            None => {
                map.remove_marker(end.key());
            }
        }
    }

    match trip.planned_route.as_deref() {
        Some(route) if !route.is_empty() => {
            let options = RouteOptions {
                popup: Some(route_popup(
                    "Planned Route",
                    trip.estimated_distance,
                    trip.estimated_duration,
                )),
                fit_bounds: false,
                ..RouteOptions::default()
            };
            map.upsert_route(PLANNED_ROUTE, route.to_vec(), options)?;
        }
        _ => {
            map.remove_route(PLANNED_ROUTE);
        }
    }

    match trip
        .logged_route_geojson
        .as_deref()
        .filter(|text| !text.trim().is_empty())
    {
        Some(text) => match parse_route_geometry(text) {
            Ok(route) => {
                map.upsert_route(LOGGED_ROUTE, route, logged_route_options(trip))?;
            }
            Err(e) => warn!("Not drawing logged route of trip {}: {e}", trip.trip_id),
        },
        None => {
            map.remove_route(LOGGED_ROUTE);
        }
    }

    map.fit_to_markers()
}
