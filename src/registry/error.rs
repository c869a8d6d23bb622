//! Registry error types
//!
//! Error types for client registration. Slow consumers and unknown resume
//! tokens are not errors; see `Delivery` and `Replay`.

use thiserror::Error;

/// Error type for registry operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The configured client limit is reached
    #[error("Client limit reached: {limit}")]
    ClientLimitReached { limit: usize },
    /// A client buffer cannot be created with zero capacity
    #[error("Client buffer capacity must be non-zero")]
    ZeroCapacity,
}

/// Error type for broadcast operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BroadcastError {
    /// The event topic is empty
    #[error("Event topic must not be empty")]
    EmptyTopic,
}
