//! Event types for client fan-out
//!
//! This module defines the events that producers hand to the broadcast
//! engine, the identifiers used for replay, and the topic filters clients
//! subscribe with.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

/// Topic for producer-generated sample data
pub const TOPIC_DATA: &str = "data";

/// Topic for periodic liveness events
pub const TOPIC_HEARTBEAT: &str = "heartbeat";

/// Topic for server lifecycle notices
pub const TOPIC_SYSTEM: &str = "system";

/// Reconnect delay suggested to clients when none is set explicitly
pub const DEFAULT_RETRY_HINT: Duration = Duration::from_millis(5000);

/// Opaque event identifier
///
/// Used as the resume token for replay. It carries no ordering; "before" and
/// "after" are decided by the history's sequence numbers only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct EventId(String);

impl EventId {
    /// Generate a fresh random identifier
    pub fn random() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Borrow the identifier text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for EventId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for EventId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Serialize)]
struct EventData {
    id: EventId,
    topic: String,
    payload: Map<String, Value>,
    created_at: DateTime<Utc>,
    #[serde(rename = "retry_ms")]
    #[serde(serialize_with = "serialize_millis")]
    retry_hint: Duration,
}

/// An immutable event to be fanned out to clients
///
/// Cheap to clone: every buffer and the history share one allocation.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct Event {
    inner: Arc<EventData>,
}

impl Event {
    /// Create an event with a random id and the default retry hint
    pub fn new(topic: impl Into<String>, payload: Map<String, Value>) -> Self {
        Self::build(EventId::random(), topic.into(), payload, DEFAULT_RETRY_HINT)
    }

    /// Create an event with a producer-chosen id
    pub fn with_id(
        id: impl Into<EventId>,
        topic: impl Into<String>,
        payload: Map<String, Value>,
    ) -> Self {
        Self::build(id.into(), topic.into(), payload, DEFAULT_RETRY_HINT)
    }

    /// Create an event from a JSON value
    ///
    /// Objects become the payload as-is; any other value is wrapped as
    /// `{"value": ...}`.
    pub fn from_json(topic: impl Into<String>, value: Value) -> Self {
        let payload = match value {
            Value::Object(map) => map,
            other => {
                let mut map = Map::new();
                map.insert("value".to_string(), other);
                map
            }
        };
        Self::new(topic, payload)
    }

    /// Return a copy of this event carrying a different retry hint
    pub fn with_retry_hint(self, retry_hint: Duration) -> Self {
        let data = &self.inner;
        Self {
            inner: Arc::new(EventData {
                id: data.id.clone(),
                topic: data.topic.clone(),
                payload: data.payload.clone(),
                created_at: data.created_at,
                retry_hint,
            }),
        }
    }

    fn build(id: EventId, topic: String, payload: Map<String, Value>, retry: Duration) -> Self {
        Self {
            inner: Arc::new(EventData {
                id,
                topic,
                payload,
                created_at: Utc::now(),
                retry_hint: retry,
            }),
        }
    }

    pub fn id(&self) -> &EventId {
        &self.inner.id
    }

    pub fn topic(&self) -> &str {
        &self.inner.topic
    }

    pub fn payload(&self) -> &Map<String, Value> {
        &self.inner.payload
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.inner.created_at
    }

    /// Suggested reconnect delay for the transport to pass on
    pub fn retry_hint(&self) -> Duration {
        self.inner.retry_hint
    }

    /// Serialize the payload as compact JSON
    pub fn payload_json(&self) -> String {
        // A map of JSON values always serializes.
        serde_json::to_string(&self.inner.payload).unwrap_or_else(|_| "{}".to_string())
    }
}

fn serialize_millis<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_u64(value.as_millis() as u64)
}

/// Set of topics a client subscribes to
///
/// An empty filter matches every topic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TopicFilter(BTreeSet<String>);

impl TopicFilter {
    /// Filter that matches every topic
    pub fn all() -> Self {
        Self::default()
    }

    /// Check whether an event topic passes this filter
    pub fn matches(&self, topic: &str) -> bool {
        self.0.is_empty() || self.0.contains(topic)
    }

    /// Whether the filter accepts every topic
    pub fn is_all(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the subscribed topics in sorted order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Parse a comma separated topic list, ignoring blank entries
    pub fn parse_list(list: &str) -> Self {
        list.split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect()
    }
}

impl<S: Into<String>> FromIterator<S> for TopicFilter {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}
