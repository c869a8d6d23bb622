//! Event history for replay after reconnect
//!
//! Retains the most recent events system-wide so that a reconnecting client
//! presenting a previously seen event id can be caught up before live
//! delivery resumes. The history has its own lock, independent of the client
//! registry, so appends never contend with registration.

pub mod ring;

pub use ring::{HistoryEntry, HistoryRing, Replay};

use tokio::sync::{Mutex, MutexGuard};

use crate::registry::event::{Event, EventId};

/// Thread-safe wrapper around a [`HistoryRing`]
#[derive(Debug)]
pub struct EventHistory {
    ring: Mutex<HistoryRing>,
    capacity: usize,
}

impl EventHistory {
    /// Create a history retaining at most `capacity` events
    pub fn new(capacity: usize) -> Self {
        Self {
            ring: Mutex::new(HistoryRing::new(capacity)),
            capacity,
        }
    }

    /// Record an event and return its sequence
    pub async fn append(&self, event: Event) -> u64 {
        self.ring.lock().await.append(event)
    }

    /// Events recorded after `last_seen`, or a gap if it is not retained
    pub async fn events_after(&self, last_seen: &EventId) -> Replay {
        self.ring.lock().await.events_after(last_seen)
    }

    /// Number of retained events
    pub async fn len(&self) -> usize {
        self.ring.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.ring.lock().await.is_empty()
    }

    /// Maximum number of retained events
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Lock the ring for a compound operation
    ///
    /// Registration holds this across the replay lookup and the registry
    /// insert so that no event falls between replay and live delivery.
    pub(crate) async fn lock(&self) -> MutexGuard<'_, HistoryRing> {
        self.ring.lock().await
    }
}
