//! Map overlay: keyed markers, routes and live driver markers on a viewport

mod headless;
mod overlay;
mod viewport;

pub use headless::HeadlessViewport;
pub use overlay::{MapOverlay, RefreshOutcome};
pub use viewport::{LayerId, LayerKind, LayerSpec, Viewport};
