//! Trip form controller and the in-memory trip record store

mod form;
mod record;

pub use form::{LOGGED_ROUTE, PLANNED_ROUTE, TripAction, TripForm, TripServices};
pub use record::MemoryTripStore;
