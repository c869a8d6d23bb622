//! Client record and registration options
//!
//! This module defines the per-client state stored in the registry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::buffer::{ClientBuffer, Delivery};
use super::event::{Event, EventId, TopicFilter};
use crate::stats::metrics::utilization;
use crate::stats::ClientInfo;

/// Unique identifier of one client connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(uuid::Uuid);

impl ClientId {
    pub(super) fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Options supplied by a connecting client
#[derive(Debug, Clone, Default)]
pub struct ClientOptions {
    /// Topics to receive (empty = all)
    pub topics: TopicFilter,
    /// Free-form display name
    pub name: Option<String>,
    /// Free-form labels
    pub tags: Vec<String>,
    /// Resume token from a previous connection
    pub last_event_id: Option<EventId>,
}

impl ClientOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to the given topics only
    pub fn topics<I, S>(mut self, topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.topics = topics.into_iter().collect();
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Resume after the given event
    pub fn resume_after(mut self, last_event_id: impl Into<EventId>) -> Self {
        self.last_event_id = Some(last_event_id.into());
        self
    }
}

/// Entry for a single client in the registry
///
/// Shared between the registry and in-flight broadcasts. Only the buffer's
/// internal state and delivered counter change after creation.
#[derive(Debug)]
pub struct ClientRecord {
    id: ClientId,

    /// Registration order, used to keep snapshots stable
    pub(super) ordinal: u64,

    name: Option<String>,
    tags: Vec<String>,
    topics: TopicFilter,
    connected_at: DateTime<Utc>,

    /// History sequence current at registration; later broadcasts only
    /// deliver events with a higher sequence
    joined_after: u64,

    buffer: ClientBuffer,
}

impl ClientRecord {
    pub(super) fn new(
        ordinal: u64,
        options: ClientOptions,
        joined_after: u64,
        buffer: ClientBuffer,
    ) -> Self {
        Self {
            id: ClientId::new(),
            ordinal,
            name: options.name,
            tags: options.tags,
            topics: options.topics,
            connected_at: Utc::now(),
            joined_after,
            buffer,
        }
    }

    pub fn id(&self) -> ClientId {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn topics(&self) -> &TopicFilter {
        &self.topics
    }

    pub fn connected_at(&self) -> DateTime<Utc> {
        self.connected_at
    }

    /// Number of events accepted into this client's buffer
    pub fn events_delivered(&self) -> u64 {
        self.buffer.delivered()
    }

    /// Number of events waiting to be consumed
    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }

    pub fn buffer_capacity(&self) -> usize {
        self.buffer.capacity()
    }

    /// Whether the client has been unregistered or has overflowed
    pub fn is_closed(&self) -> bool {
        self.buffer.is_closed()
    }

    /// Whether a broadcast event with this sequence is meant for the client
    pub fn wants(&self, event: &Event, sequence: u64) -> bool {
        sequence > self.joined_after && self.topics.matches(event.topic())
    }

    /// Enqueue an event without waiting
    pub(crate) fn deliver(&self, event: Event) -> Delivery {
        self.buffer.try_enqueue(event)
    }

    /// Release the buffer; no delivery can happen after this returns
    pub(super) fn close(&self) {
        self.buffer.close();
    }

    /// Point-in-time copy of the client's metadata
    pub fn info(&self) -> ClientInfo {
        let buffer_len = self.buffer_len();
        let buffer_capacity = self.buffer_capacity();

        ClientInfo {
            client_id: self.id,
            name: self.name.clone(),
            tags: self.tags.clone(),
            topics: self.topics.iter().map(str::to_string).collect(),
            connected_at: self.connected_at,
            events_delivered: self.events_delivered(),
            buffer_len,
            buffer_capacity,
            buffer_utilization: utilization(buffer_len, buffer_capacity),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::Map;

    use super::*;
    use crate::registry::event::{TOPIC_DATA, TOPIC_HEARTBEAT};

    fn record(options: ClientOptions, joined_after: u64) -> ClientRecord {
        let (buffer, _rx) = ClientBuffer::channel(4).unwrap();
        ClientRecord::new(0, options, joined_after, buffer)
    }

    #[test]
    fn test_wants_respects_topics() {
        let record = record(ClientOptions::new().topics(["alert"]), 0);

        let data = Event::new(TOPIC_DATA, Map::new());
        let alert = Event::new("alert", Map::new());
        assert!(!record.wants(&data, 1));
        assert!(record.wants(&alert, 1));
    }

    #[test]
    fn test_wants_skips_events_before_join() {
        let record = record(ClientOptions::new(), 5);
        let event = Event::new(TOPIC_HEARTBEAT, Map::new());

        assert!(!record.wants(&event, 5));
        assert!(record.wants(&event, 6));
    }

    #[test]
    fn test_info_snapshot() {
        let record = record(
            ClientOptions::new()
                .name("dashboard")
                .tags(["ops", "eu"])
                .topics(["data", "heartbeat"]),
            0,
        );

        let info = record.info();
        assert_eq!(info.client_id, record.id());
        assert_eq!(info.name.as_deref(), Some("dashboard"));
        assert_eq!(info.tags, vec!["ops", "eu"]);
        assert_eq!(info.topics, vec!["data", "heartbeat"]);
        assert_eq!(info.events_delivered, 0);
        assert_eq!(info.buffer_len, 0);
        assert_eq!(info.buffer_capacity, 4);
        assert_eq!(info.buffer_utilization, 0.0);
    }

    #[test]
    fn test_client_ids_unique() {
        assert_ne!(ClientId::new(), ClientId::new());
    }
}
