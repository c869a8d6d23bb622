//! Registry configuration

use std::time::Duration;

use super::event::DEFAULT_RETRY_HINT;

/// Default number of pending events per client
pub const DEFAULT_BUFFER_CAPACITY: usize = 100;

/// Default number of events retained for replay
pub const DEFAULT_HISTORY_CAPACITY: usize = 1000;

/// Configuration for the client registry and event history
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Maximum pending events per client before it is disconnected
    pub buffer_capacity: usize,

    /// Number of most recent events kept for replay (0 disables replay)
    pub history_capacity: usize,

    /// Maximum concurrently registered clients (0 = unlimited)
    pub max_clients: usize,

    /// Reconnect delay producers stamp on generated events
    pub retry_hint: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            max_clients: 0,
            retry_hint: DEFAULT_RETRY_HINT,
        }
    }
}

impl RegistryConfig {
    /// Set the per-client buffer capacity
    pub fn buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }

    /// Set the history capacity
    pub fn history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }

    /// Set the maximum number of clients
    pub fn max_clients(mut self, max: usize) -> Self {
        self.max_clients = max;
        self
    }

    /// Set the retry hint
    pub fn retry_hint(mut self, retry: Duration) -> Self {
        self.retry_hint = retry;
        self
    }
}
