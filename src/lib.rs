//! Server-sent event fan-out
//!
//! Producers hand events to a [`StreamManager`], which records them in a
//! bounded history and copies them into one bounded buffer per connected
//! client. A client that falls behind far enough to fill its buffer is
//! disconnected instead of slowing everyone else down. Reconnecting clients
//! present the id of the last event they saw and are caught up from history.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use serde_json::json;
//! use sse_fanout::{ClientOptions, Event, StreamManager};
//!
//! # async fn demo() -> sse_fanout::Result<()> {
//! let manager = Arc::new(StreamManager::new());
//! let mut client = manager
//!     .subscribe(ClientOptions::new().topics(["data"]))
//!     .await?;
//!
//! manager
//!     .broadcast(Event::from_json("data", json!({"value": 42})))
//!     .await?;
//!
//! let event = client.next_event().await;
//! assert_eq!(event.map(|e| e.topic().to_string()), Some("data".into()));
//! # Ok(())
//! # }
//! ```
//!
//! The [`server`] module serves the manager over HTTP.

pub mod broadcast;
pub mod error;
pub mod history;
pub mod manager;
pub mod producer;
pub mod registry;
pub mod server;
pub mod stats;

pub use broadcast::{BroadcastEngine, BroadcastReport};
pub use error::{Error, Result};
pub use history::{EventHistory, Replay};
pub use manager::{ClientStream, StreamManager};
pub use producer::{EventSource, HeartbeatSource, Producer, ProducerContext, SampleSource};
pub use registry::{
    BroadcastError, ClientId, ClientOptions, Event, EventId, RegistryConfig, RegistryError,
    Resume, TopicFilter,
};
pub use server::{ServerConfig, StreamServer};
pub use stats::{ClientInfo, ManagerStats};
