//! Fixed-capacity event ring with id lookup
//!
//! Every appended event gets the next sequence number. The entry for
//! sequence `s` lives in slot `s % capacity`, so the ring needs no separate
//! head pointer and replay walks sequences directly. An index maps event ids
//! to sequences; it only ever holds ids that are still in the ring.

use std::collections::HashMap;

use crate::registry::event::{Event, EventId};

/// A retained event and the sequence it was assigned
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    /// Strictly increasing, never reused
    pub sequence: u64,
    /// The recorded event
    pub event: Event,
}

/// Result of looking up a resume token
#[derive(Debug, Clone)]
pub enum Replay {
    /// The token is unknown or already evicted; replay is not possible
    Gap,
    /// Events recorded after the token, oldest first
    Events(Vec<Event>),
}

impl Replay {
    /// Whether the lookup fell into a gap
    pub fn is_gap(&self) -> bool {
        matches!(self, Replay::Gap)
    }

    /// Events to replay; empty on a gap
    pub fn into_events(self) -> Vec<Event> {
        match self {
            Replay::Gap => Vec::new(),
            Replay::Events(events) => events,
        }
    }
}

/// Ring buffer of the most recent events
#[derive(Debug)]
pub struct HistoryRing {
    slots: Vec<Option<HistoryEntry>>,
    index: HashMap<EventId, u64>,
    next_sequence: u64,
    len: usize,
}

impl HistoryRing {
    /// Create a ring retaining at most `capacity` events
    ///
    /// A capacity of zero still assigns sequences but retains nothing.
    pub fn new(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);

        Self {
            slots,
            index: HashMap::with_capacity(capacity),
            next_sequence: 1,
            len: 0,
        }
    }

    /// Record an event, evicting the oldest entry when full
    ///
    /// Returns the sequence assigned to the event.
    pub fn append(&mut self, event: Event) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;

        let Some(slot) = self.slot(sequence) else {
            return sequence;
        };

        if let Some(evicted) = self.slots[slot].take() {
            // The id may have been reused by a newer event
            if self.index.get(evicted.event.id()) == Some(&evicted.sequence) {
                self.index.remove(evicted.event.id());
            }
        } else {
            self.len += 1;
        }

        self.index.insert(event.id().clone(), sequence);
        self.slots[slot] = Some(HistoryEntry { sequence, event });

        sequence
    }

    /// Look up every retained event recorded after `last_seen`
    pub fn events_after(&self, last_seen: &EventId) -> Replay {
        let Some(&seen) = self.index.get(last_seen) else {
            return Replay::Gap;
        };

        let events = (seen + 1..self.next_sequence)
            .filter_map(|sequence| self.get(sequence))
            .map(|entry| entry.event.clone())
            .collect();

        Replay::Events(events)
    }

    /// Get the entry for a sequence if it is still retained
    pub fn get(&self, sequence: u64) -> Option<&HistoryEntry> {
        let slot = self.slot(sequence)?;
        self.slots[slot]
            .as_ref()
            .filter(|entry| entry.sequence == sequence)
    }

    /// Sequence assigned by the latest append (0 before the first append)
    pub fn last_sequence(&self) -> u64 {
        self.next_sequence - 1
    }

    /// Number of retained entries
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Maximum number of retained entries
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn slot(&self, sequence: u64) -> Option<usize> {
        let capacity = self.slots.len() as u64;
        if capacity == 0 {
            return None;
        }
        Some((sequence % capacity) as usize)
    }
}
