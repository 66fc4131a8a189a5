//! Viewport without a renderer. Keeps the installed layers and the view in
//! memory, using an equirectangular projection on 256px tiles to turn pixel
//! padding into degrees.

use std::collections::BTreeMap;

use super::viewport::{LayerId, LayerKind, LayerSpec, Viewport};
use crate::{Bounds, Coordinate};

const TILE_SIZE: f64 = 256.0;
const DEFAULT_MAX_ZOOM: f64 = 19.0;

#[derive(Debug, Clone)]
pub struct HeadlessViewport {
    width: f64,
    height: f64,
    max_zoom: f64,
    center: Coordinate,
    zoom: f64,
    layers: BTreeMap<LayerId, LayerSpec>,
    next_layer: LayerId,
    popups: Vec<(Coordinate, String)>,
    added: usize,
    removed: usize,
    released: bool,
}

impl HeadlessViewport {
    /// Canvas of `width` x `height` pixels
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width: width.max(1.0),
            height: height.max(1.0),
            max_zoom: DEFAULT_MAX_ZOOM,
            center: Coordinate {
                latitude: 0.0,
                longitude: 0.0,
            },
            zoom: 0.0,
            layers: BTreeMap::new(),
            next_layer: 1,
            popups: Vec::new(),
            added: 0,
            removed: 0,
            released: false,
        }
    }

    #[must_use]
    pub fn with_max_zoom(mut self, max_zoom: f64) -> Self {
        self.max_zoom = max_zoom;
        self
    }

    pub fn layer(&self, id: LayerId) -> Option<&LayerSpec> {
        self.layers.get(&id)
    }

    pub fn layers(&self) -> impl Iterator<Item = (LayerId, &LayerSpec)> {
        self.layers.iter().map(|(id, spec)| (*id, spec))
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn count(&self, kind: LayerKind) -> usize {
        self.layers.values().filter(|l| l.kind() == kind).count()
    }

    /// Layers ever added, including ones removed since
    pub fn total_added(&self) -> usize {
        self.added
    }

    pub fn total_removed(&self) -> usize {
        self.removed
    }

    pub fn popups(&self) -> &[(Coordinate, String)] {
        &self.popups
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    pub fn degrees_per_pixel(&self) -> f64 {
        degrees_per_pixel(self.zoom)
    }

    /// Area currently visible on the canvas
    pub fn visible_bounds(&self) -> Bounds {
        let dpp = self.degrees_per_pixel();
        let half_lat = self.height / 2.0 * dpp;
        let half_lng = self.width / 2.0 * dpp;
        Bounds {
            south: (self.center.latitude - half_lat).max(-90.0),
            west: (self.center.longitude - half_lng).max(-180.0),
            north: (self.center.latitude + half_lat).min(90.0),
            east: (self.center.longitude + half_lng).min(180.0),
        }
    }
}

impl Default for HeadlessViewport {
    fn default() -> Self {
        Self::new(1024.0, 768.0)
    }
}

fn degrees_per_pixel(zoom: f64) -> f64 {
    360.0 / (TILE_SIZE * zoom.exp2())
}

impl Viewport for HeadlessViewport {
    fn add_layer(&mut self, layer: LayerSpec) -> LayerId {
        let id = self.next_layer;
        self.next_layer += 1;
        self.layers.insert(id, layer);
        self.added += 1;
        id
    }

    fn remove_layer(&mut self, id: LayerId) {
        if self.layers.remove(&id).is_some() {
            self.removed += 1;
        }
    }

    fn set_view(&mut self, center: Coordinate, zoom: f64) {
        self.center = center;
        self.zoom = zoom.clamp(0.0, self.max_zoom);
    }

    fn fit_bounds(&mut self, bounds: Bounds, padding: f64) {
        let usable_width = (self.width - 2.0 * padding).max(1.0);
        let usable_height = (self.height - 2.0 * padding).max(1.0);
        let needed = (bounds.lng_span() / usable_width).max(bounds.lat_span() / usable_height);

        // Whole zoom levels only, like a tiled map snaps
        let zoom = if needed > 0.0 {
            (360.0 / (TILE_SIZE * needed)).log2().floor()
        } else {
            self.max_zoom
        };
        self.center = bounds.center();
        self.zoom = zoom.clamp(0.0, self.max_zoom);
    }

    fn open_popup(&mut self, at: Coordinate, content: String) {
        self.popups.push((at, content));
    }

    fn center(&self) -> Coordinate {
        self.center
    }

    fn zoom(&self) -> f64 {
        self.zoom
    }

    fn release(&mut self) {
        self.removed += self.layers.len();
        self.layers.clear();
        self.released = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MarkerOptions;

    fn coord(lat: f64, lng: f64) -> Coordinate {
        Coordinate::new(lat, lng).unwrap()
    }

    #[test]
    fn fitted_bounds_are_visible_with_padding() {
        let mut viewport = HeadlessViewport::new(800.0, 600.0);
        let bounds = Bounds::from_coordinates(&[coord(0.0, 0.0), coord(10.0, 10.0)]).unwrap();
        viewport.fit_bounds(bounds, 20.0);

        let margin = 20.0 * viewport.degrees_per_pixel();
        assert!(
            viewport
                .visible_bounds()
                .contains_bounds(&bounds.padded(margin, margin))
        );
        assert_eq!(viewport.center(), coord(5.0, 5.0));
    }

    #[test]
    fn degenerate_bounds_use_max_zoom() {
        let mut viewport = HeadlessViewport::default().with_max_zoom(18.0);
        let bounds = Bounds::from_coordinates(&[coord(1.0, 1.0)]).unwrap();
        viewport.fit_bounds(bounds, 20.0);
        assert_eq!(viewport.zoom(), 18.0);
    }

    #[test]
    fn release_drops_every_layer() {
        let mut viewport = HeadlessViewport::default();
        let marker = LayerSpec::Marker {
            coordinate: coord(1.0, 1.0),
            options: MarkerOptions::default(),
        };
        let first = viewport.add_layer(marker.clone());
        let second = viewport.add_layer(marker);
        assert_ne!(first, second);

        viewport.remove_layer(first);
        viewport.remove_layer(first);
        assert_eq!(viewport.total_removed(), 1);

        viewport.release();
        assert!(viewport.is_released());
        assert_eq!(viewport.layer_count(), 0);
        assert_eq!(viewport.total_added(), viewport.total_removed());
    }
}
