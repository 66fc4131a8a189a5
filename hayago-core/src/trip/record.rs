use std::sync::atomic::{AtomicUsize, Ordering};

use futures::{
    FutureExt,
    future::{self, BoxFuture},
};
use parking_lot::Mutex;

use crate::{Error, TripRecord, TripStatus, TripUpdate, services::TripRecordStore};

/// Trip record kept in process memory.
///
/// Status transitions follow the navigation rules of the business
/// application: a trip starts from `Pending` or `Accepted` and completes
/// only while `On Route`.
#[derive(Debug)]
pub struct MemoryTripStore {
    record: Mutex<TripRecord>,
    reloads: AtomicUsize,
}

impl MemoryTripStore {
    pub fn new(record: TripRecord) -> Self {
        Self {
            record: Mutex::new(record),
            reloads: AtomicUsize::new(0),
        }
    }

    /// Number of reloads requested so far
    pub fn reloads(&self) -> usize {
        self.reloads.load(Ordering::SeqCst)
    }

    fn transition(
        &self,
        trip_id: &str,
        action: &'static str,
        allowed: &[TripStatus],
        to: TripStatus,
    ) -> Result<(), Error> {
        let mut record = self.record.lock();
        if record.trip_id != trip_id {
            return Err(Error::LookupFailed(format!("Trip {trip_id} not found")));
        }
        if !allowed.contains(&record.status) {
            return Err(Error::ActionNotAllowed {
                action,
                status: record.status,
            });
        }
        record.status = to;
        Ok(())
    }
}

impl TripRecordStore for MemoryTripStore {
    fn snapshot(&self) -> TripRecord {
        self.record.lock().clone()
    }

    fn apply(&self, update: TripUpdate) {
        self.record.lock().apply(update);
    }

    fn reload(&self) -> BoxFuture<'_, Result<(), Error>> {
        self.reloads.fetch_add(1, Ordering::SeqCst);
        future::ready(Ok(())).boxed()
    }

    fn start_navigation<'a>(&'a self, trip_id: &'a str) -> BoxFuture<'a, Result<(), Error>> {
        let result = self.transition(
            trip_id,
            "Start trip",
            &[TripStatus::Pending, TripStatus::Accepted],
            TripStatus::OnRoute,
        );
        future::ready(result).boxed()
    }

    fn complete_trip<'a>(&'a self, trip_id: &'a str) -> BoxFuture<'a, Result<(), Error>> {
        let result = self.transition(
            trip_id,
            "Complete trip",
            &[TripStatus::OnRoute],
            TripStatus::Completed,
        );
        future::ready(result).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn completing_requires_trip_on_route() {
        let store = MemoryTripStore::new(TripRecord::new("TRIP-7"));
        assert_eq!(
            store.complete_trip("TRIP-7").await,
            Err(Error::ActionNotAllowed {
                action: "Complete trip",
                status: TripStatus::Pending,
            })
        );

        store.start_navigation("TRIP-7").await.unwrap();
        assert_eq!(store.snapshot().status, TripStatus::OnRoute);
        store.complete_trip("TRIP-7").await.unwrap();
        assert_eq!(store.snapshot().status, TripStatus::Completed);
    }

    #[tokio::test]
    async fn unknown_trip_is_a_lookup_failure() {
        let store = MemoryTripStore::new(TripRecord::new("TRIP-7"));
        assert!(matches!(
            store.start_navigation("TRIP-8").await,
            Err(Error::LookupFailed(_))
        ));
        assert_eq!(store.snapshot().status, TripStatus::Pending);
    }
}
