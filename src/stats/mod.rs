//! Introspection snapshots
//!
//! Plain serializable copies of registry state for status endpoints. Nothing
//! here references live client state.

pub mod metrics;

pub use metrics::{ClientInfo, ManagerStats};
