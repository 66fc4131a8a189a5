//! Keyed overlay collections on top of a [`Viewport`] and the live driver
//! tracking loop.
//!
//! Every collection has replace semantics: installing an object under an
//! existing key first removes the previous layer from the viewport, so a key
//! never maps to more than one live layer. Driver markers are rebuilt
//! wholesale from each lookup response, never diffed.

use std::{
    collections::HashMap,
    sync::{Arc, Weak},
    time::Duration,
};

use log::{debug, warn};
use parking_lot::Mutex;
use tokio::{
    runtime::Handle,
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};

use super::viewport::{LayerId, LayerSpec, Viewport};
use crate::{
    Bounds, Coordinate, DriverMarker, DriverRecord, Error, Marker, MarkerOptions, Route,
    RouteOptions,
    config::MapConfig,
    services::{GeolocationProvider, NearbyDriverLookup, ReverseLookup},
};

/// What a single driver refresh did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Collection rebuilt with this many drivers
    Replaced(usize),
    /// Lookup failed, previous drivers kept
    Failed,
    /// Another rebuild was already in flight
    Skipped,
    /// The overlay was destroyed
    Detached,
}

struct OverlayState<V> {
    viewport: V,
    live: bool,
    markers: HashMap<String, Marker>,
    routes: HashMap<String, Route>,
    drivers: HashMap<String, DriverMarker>,
    current_location: Option<LayerId>,
}

impl<V: Viewport> OverlayState<V> {
    fn ensure_live(&self) -> Result<(), Error> {
        if self.live { Ok(()) } else { Err(Error::Detached) }
    }

    fn clear_drivers(&mut self) {
        for (_, driver) in self.drivers.drain() {
            self.viewport.remove_layer(driver.layer);
        }
    }

    fn install_driver(&mut self, record: DriverRecord) -> DriverMarker {
        let layer = self.viewport.add_layer(LayerSpec::driver(record.clone()));
        let driver = DriverMarker { record, layer };
        if let Some(previous) = self
            .drivers
            .insert(driver.driver_id().to_string(), driver.clone())
        {
            self.viewport.remove_layer(previous.layer);
        }
        driver
    }
}

struct Shared<V> {
    state: Mutex<OverlayState<V>>,
    /// Held for the whole of a driver rebuild, lookup included
    refresh_gate: tokio::sync::Mutex<()>,
    config: MapConfig,
    drivers: Arc<dyn NearbyDriverLookup>,
}

impl<V: Viewport> Shared<V> {
    async fn refresh_drivers(&self) -> RefreshOutcome {
        let Ok(_gate) = self.refresh_gate.try_lock() else {
            debug!("Driver refresh already in flight, skipping");
            return RefreshOutcome::Skipped;
        };

        let center = {
            let state = self.state.lock();
            if !state.live {
                return RefreshOutcome::Detached;
            }
            state.viewport.center()
        };

        match self
            .drivers
            .find_nearby(center, self.config.driver_search_radius_km)
            .await
        {
            Ok(records) => match self.replace_drivers(records) {
                Ok(count) => RefreshOutcome::Replaced(count),
                Err(_) => RefreshOutcome::Detached,
            },
            Err(e) => {
                warn!("Nearby driver lookup around {center} failed, keeping current drivers: {e}");
                RefreshOutcome::Failed
            }
        }
    }

    fn replace_drivers(&self, records: Vec<DriverRecord>) -> Result<usize, Error> {
        let mut state = self.state.lock();
        state.ensure_live()?;
        state.clear_drivers();
        for record in records {
            state.install_driver(record);
        }
        Ok(state.drivers.len())
    }
}

/// Map view with keyed markers, routes and live driver markers
pub struct MapOverlay<V: Viewport> {
    shared: Arc<Shared<V>>,
    tracker: Mutex<Option<JoinHandle<()>>>,
}

impl<V: Viewport> MapOverlay<V> {
    /// Takes ownership of `viewport` and centres it on the configured centre
    pub fn new(viewport: V, config: MapConfig, drivers: Arc<dyn NearbyDriverLookup>) -> Self {
        let center = config.center;
        Self::centered(viewport, config, drivers, center)
    }

    pub fn centered(
        mut viewport: V,
        config: MapConfig,
        drivers: Arc<dyn NearbyDriverLookup>,
        center: Coordinate,
    ) -> Self {
        viewport.set_view(center, config.zoom);
        let state = OverlayState {
            viewport,
            live: true,
            markers: HashMap::new(),
            routes: HashMap::new(),
            drivers: HashMap::new(),
            current_location: None,
        };
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(state),
                refresh_gate: tokio::sync::Mutex::new(()),
                config,
                drivers,
            }),
            tracker: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &MapConfig {
        &self.shared.config
    }

    /// Installs a marker under `key`, replacing any previous one
    ///
    /// # Errors
    ///
    /// Returns `Error::Detached` once the overlay has been destroyed
    pub fn upsert_marker(
        &self,
        key: impl Into<String>,
        coordinate: Coordinate,
        options: MarkerOptions,
    ) -> Result<Marker, Error> {
        let key = key.into();
        let mut guard = self.shared.state.lock();
        let state = &mut *guard;
        state.ensure_live()?;

        if let Some(previous) = state.markers.remove(&key) {
            state.viewport.remove_layer(previous.layer);
        }
        let layer = state.viewport.add_layer(LayerSpec::Marker {
            coordinate,
            options: options.clone(),
        });
        let marker = Marker {
            key: key.clone(),
            coordinate,
            options,
            layer,
        };
        state.markers.insert(key, marker.clone());
        Ok(marker)
    }

    /// Returns whether a marker was removed
    pub fn remove_marker(&self, key: &str) -> bool {
        let mut guard = self.shared.state.lock();
        let state = &mut *guard;
        match state.markers.remove(key) {
            Some(marker) => {
                state.viewport.remove_layer(marker.layer);
                true
            }
            None => false,
        }
    }

    /// Records a marker's new position after the user dragged it
    pub fn marker_moved(&self, key: &str, to: Coordinate) -> Option<Marker> {
        let mut state = self.shared.state.lock();
        if !state.live {
            return None;
        }
        let marker = state.markers.get_mut(key)?;
        marker.coordinate = to;
        Some(marker.clone())
    }

    /// Installs a polyline under `key`, replacing any previous one.
    ///
    /// An empty route is tracked but draws nothing.
    ///
    /// # Errors
    ///
    /// Returns `Error::Detached` once the overlay has been destroyed
    pub fn upsert_route(
        &self,
        key: impl Into<String>,
        coordinates: Vec<Coordinate>,
        options: RouteOptions,
    ) -> Result<Route, Error> {
        let key = key.into();
        let padding = self.shared.config.fit_padding;
        let mut guard = self.shared.state.lock();
        let state = &mut *guard;
        state.ensure_live()?;

        if let Some(layer) = state.routes.remove(&key).and_then(|route| route.layer) {
            state.viewport.remove_layer(layer);
        }

        let layer = (!coordinates.is_empty()).then(|| {
            state.viewport.add_layer(LayerSpec::Polyline {
                coordinates: coordinates.clone(),
                style: options.style.clone(),
                popup: options.popup.clone(),
            })
        });

        if options.fit_bounds
            && let Some(bounds) = Bounds::from_coordinates(&coordinates)
        {
            state.viewport.fit_bounds(bounds, padding);
        }

        let route = Route {
            key: key.clone(),
            coordinates,
            options,
            layer,
        };
        state.routes.insert(key, route.clone());
        Ok(route)
    }

    /// Returns whether a route was removed
    pub fn remove_route(&self, key: &str) -> bool {
        let mut guard = self.shared.state.lock();
        let state = &mut *guard;
        match state.routes.remove(key) {
            Some(route) => {
                if let Some(layer) = route.layer {
                    state.viewport.remove_layer(layer);
                }
                true
            }
            None => false,
        }
    }

    /// Brings every marker into view.
    ///
    /// No markers leaves the view untouched, a single marker is centred at
    /// the single-marker zoom, more are fitted with the configured padding.
    ///
    /// # Errors
    ///
    /// Returns `Error::Detached` once the overlay has been destroyed
    pub fn fit_to_markers(&self) -> Result<(), Error> {
        let config = &self.shared.config;
        let mut state = self.shared.state.lock();
        state.ensure_live()?;

        let coordinates: Vec<Coordinate> = state.markers.values().map(|m| m.coordinate).collect();
        match coordinates.as_slice() {
            [] => {}
            [only] => state.viewport.set_view(*only, config.single_marker_zoom),
            many => {
                if let Some(bounds) = Bounds::from_coordinates(many) {
                    state.viewport.fit_bounds(bounds, config.fit_padding);
                }
            }
        }
        Ok(())
    }

    /// Installs or moves a single driver marker
    ///
    /// # Errors
    ///
    /// Returns `Error::Detached` once the overlay has been destroyed
    pub fn upsert_driver(&self, record: DriverRecord) -> Result<DriverMarker, Error> {
        let mut state = self.shared.state.lock();
        state.ensure_live()?;
        Ok(state.install_driver(record))
    }

    /// Replaces the whole driver collection with `records`, returning its new size
    ///
    /// # Errors
    ///
    /// Returns `Error::Detached` once the overlay has been destroyed
    pub fn replace_drivers(&self, records: Vec<DriverRecord>) -> Result<usize, Error> {
        self.shared.replace_drivers(records)
    }

    /// Looks up drivers around the current view centre and rebuilds the
    /// driver collection. Failures are logged and leave the collection as is.
    pub async fn refresh_drivers(&self) -> RefreshOutcome {
        self.shared.refresh_drivers().await
    }

    /// Starts polling for nearby drivers, replacing any running loop.
    ///
    /// The first lookup happens immediately, once a replaced loop has fully
    /// stopped. Intervals below the configured minimum are raised to it.
    /// Returns the interval in use.
    ///
    /// # Errors
    ///
    /// Returns `Error::Detached` once destroyed, `Error::InvalidData` outside a Tokio runtime
    pub fn start_driver_tracking(&self, interval: Duration) -> Result<Duration, Error> {
        self.shared.state.lock().ensure_live()?;
        let handle = Handle::try_current().map_err(|e| Error::InvalidData(e.to_string()))?;
        let period = self.shared.config.tracking_interval(interval);

        let mut tracker = self.tracker.lock();
        let previous = tracker.take();
        if let Some(previous) = &previous {
            previous.abort();
        }
        *tracker = Some(handle.spawn(track_drivers(
            Arc::downgrade(&self.shared),
            period,
            previous,
        )));
        debug!("Driver tracking started every {period:?}");
        Ok(period)
    }

    /// [`start_driver_tracking`](Self::start_driver_tracking) at the configured default interval
    ///
    /// # Errors
    ///
    /// Same as `start_driver_tracking`
    pub fn start_default_driver_tracking(&self) -> Result<Duration, Error> {
        self.start_driver_tracking(self.shared.config.default_tracking_interval())
    }

    /// Returns whether a tracking loop was running
    pub fn stop_driver_tracking(&self) -> bool {
        match self.tracker.lock().take() {
            Some(task) => {
                task.abort();
                debug!("Driver tracking stopped");
                true
            }
            None => false,
        }
    }

    pub fn is_tracking(&self) -> bool {
        self.tracker
            .lock()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Asks the device for its position and marks it on the map.
    ///
    /// # Errors
    ///
    /// Returns `Error::GeolocationUnavailable` when the provider fails or
    /// does not answer in time, `Error::Detached` if the overlay went away meanwhile
    pub async fn locate_user(
        &self,
        provider: &dyn GeolocationProvider,
    ) -> Result<Coordinate, Error> {
        let timeout = self.shared.config.geolocation_timeout();
        let coordinate = match time::timeout(timeout, provider.current_position()).await {
            Ok(Ok(coordinate)) => coordinate,
            Ok(Err(e @ Error::GeolocationUnavailable(_))) => return Err(e),
            Ok(Err(e)) => return Err(Error::GeolocationUnavailable(e.to_string())),
            Err(_) => {
                return Err(Error::GeolocationUnavailable(format!(
                    "no position within {timeout:?}"
                )));
            }
        };

        let mut guard = self.shared.state.lock();
        let state = &mut *guard;
        state.ensure_live()?;
        if let Some(previous) = state.current_location.take() {
            state.viewport.remove_layer(previous);
        }
        state.current_location = Some(
            state
                .viewport
                .add_layer(LayerSpec::current_location(coordinate)),
        );
        state
            .viewport
            .set_view(coordinate, self.shared.config.locate_zoom);
        Ok(coordinate)
    }

    /// Reverse geocodes a clicked position and shows the address in a popup
    pub async fn describe_location(
        &self,
        at: Coordinate,
        reverse: &dyn ReverseLookup,
    ) -> Option<String> {
        let address = match reverse.reverse_geocode(at).await {
            Ok(address) => address,
            Err(e) => {
                debug!("Reverse geocoding {at} failed: {e}");
                return None;
            }
        };

        let mut state = self.shared.state.lock();
        if !state.live {
            return None;
        }
        state
            .viewport
            .open_popup(at, format!("Location:\n{address}"));
        Some(address)
    }

    /// Stops tracking and releases every layer and the viewport itself.
    /// Safe to call more than once.
    pub fn destroy(&self) {
        self.stop_driver_tracking();

        let mut guard = self.shared.state.lock();
        let state = &mut *guard;
        if !state.live {
            return;
        }
        for (_, marker) in state.markers.drain() {
            state.viewport.remove_layer(marker.layer);
        }
        for (_, route) in state.routes.drain() {
            if let Some(layer) = route.layer {
                state.viewport.remove_layer(layer);
            }
        }
        state.clear_drivers();
        if let Some(layer) = state.current_location.take() {
            state.viewport.remove_layer(layer);
        }
        state.viewport.release();
        state.live = false;
        debug!("Map overlay destroyed");
    }

    pub fn is_destroyed(&self) -> bool {
        !self.shared.state.lock().live
    }

    pub fn marker(&self, key: &str) -> Option<Marker> {
        self.shared.state.lock().markers.get(key).cloned()
    }

    pub fn marker_keys(&self) -> Vec<String> {
        let mut keys: Vec<_> = self.shared.state.lock().markers.keys().cloned().collect();
        keys.sort_unstable();
        keys
    }

    pub fn route(&self, key: &str) -> Option<Route> {
        self.shared.state.lock().routes.get(key).cloned()
    }

    pub fn route_keys(&self) -> Vec<String> {
        let mut keys: Vec<_> = self.shared.state.lock().routes.keys().cloned().collect();
        keys.sort_unstable();
        keys
    }

    pub fn driver(&self, driver_id: &str) -> Option<DriverMarker> {
        self.shared.state.lock().drivers.get(driver_id).cloned()
    }

    pub fn driver_ids(&self) -> Vec<String> {
        let mut ids: Vec<_> = self.shared.state.lock().drivers.keys().cloned().collect();
        ids.sort_unstable();
        ids
    }

    pub fn driver_count(&self) -> usize {
        self.shared.state.lock().drivers.len()
    }

    /// Read access to the underlying viewport
    pub fn with_viewport<R>(&self, f: impl FnOnce(&V) -> R) -> R {
        f(&self.shared.state.lock().viewport)
    }
}

impl<V: Viewport> Drop for MapOverlay<V> {
    fn drop(&mut self) {
        self.destroy();
    }
}

async fn track_drivers<V: Viewport>(
    shared: Weak<Shared<V>>,
    period: Duration,
    previous: Option<JoinHandle<()>>,
) {
    // an aborted loop may still hold the refresh gate until it is dropped
    if let Some(previous) = previous {
        let _ = previous.await;
    }
    let mut ticker = time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let Some(shared) = shared.upgrade() else {
            break;
        };
        if shared.refresh_drivers().await == RefreshOutcome::Detached {
            break;
        }
    }
}
