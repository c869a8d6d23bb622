//! Crate-level error type

use thiserror::Error;

use crate::registry::{BroadcastError, RegistryError};

/// Errors surfaced by the stream manager and server
#[derive(Debug, Error)]
pub enum Error {
    /// A client could not be registered
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// A producer handed over an invalid event
    #[error(transparent)]
    Broadcast(#[from] BroadcastError),

    /// Listener or socket failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
