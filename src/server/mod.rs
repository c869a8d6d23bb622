//! HTTP server exposing the fan-out as server-sent events

pub mod config;
pub mod listener;
pub mod routes;
pub mod sse;
pub mod state;

pub use config::ServerConfig;
pub use listener::StreamServer;
pub use routes::{build_router, StreamQuery};
pub use sse::to_sse_event;
pub use state::{AppState, ProducerSet};
