//! Client registry for event fan-out
//!
//! The registry tracks connected clients, each with its own bounded buffer
//! and topic filter. Producers never touch a client directly; the broadcast
//! engine takes a snapshot of the registry and performs one non-blocking
//! enqueue per matching client.
//!
//! # Architecture
//!
//! ```text
//!                        Arc<ClientRegistry>
//!                   ┌───────────────────────────┐
//!                   │ clients: HashMap<Id,      │
//!                   │   Arc<ClientRecord {      │
//!                   │     topics,               │
//!                   │     buffer: ClientBuffer, │
//!                   │   }>                      │
//!                   │ >                         │
//!                   └─────────────┬─────────────┘
//!                                 │ snapshot()
//!         ┌───────────────────────┼───────────────────────┐
//!         │                       │                       │
//!         ▼                       ▼                       ▼
//!    [Producer]              [Client A]              [Client B]
//!    broadcast()          receiver.dequeue()      receiver.dequeue()
//!         │                       │                       │
//!         └──► try_enqueue() ──► buffer ──► transport ──► HTTP
//! ```
//!
//! # Shared Events
//!
//! [`Event`] wraps its data in an `Arc`, so fanning out to many clients
//! clones a pointer per client. The payload is never copied.

pub mod buffer;
pub mod config;
pub mod entry;
pub mod error;
pub mod event;
pub mod store;

pub use buffer::{ClientBuffer, ClientReceiver, Delivery};
pub use config::RegistryConfig;
pub use entry::{ClientId, ClientOptions, ClientRecord};
pub use error::{BroadcastError, RegistryError};
pub use event::{
    Event, EventId, TopicFilter, DEFAULT_RETRY_HINT, TOPIC_DATA, TOPIC_HEARTBEAT, TOPIC_SYSTEM,
};
pub use store::{ClientRegistry, Registration, Resume};
