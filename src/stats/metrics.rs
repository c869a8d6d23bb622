//! Statistics for connected clients and the stream manager

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::registry::ClientId;

/// Metadata of one connected client
#[derive(Debug, Clone, Serialize)]
pub struct ClientInfo {
    pub client_id: ClientId,
    pub name: Option<String>,
    pub tags: Vec<String>,
    /// Subscribed topics; empty means all
    pub topics: Vec<String>,
    pub connected_at: DateTime<Utc>,
    /// Events accepted into the client's buffer so far
    pub events_delivered: u64,
    /// Events waiting to be consumed
    pub buffer_len: usize,
    pub buffer_capacity: usize,
    /// Buffer occupancy as a percentage
    pub buffer_utilization: f32,
}

/// Buffer occupancy as a percentage
pub(crate) fn utilization(len: usize, capacity: usize) -> f32 {
    if capacity > 0 {
        (len as f32 / capacity as f32) * 100.0
    } else {
        0.0
    }
}

/// Manager-wide statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct ManagerStats {
    /// Currently registered clients
    pub client_count: usize,
    /// Events currently retained for replay
    pub history_size: usize,
    pub history_capacity: usize,
    /// Per-client buffer capacity
    pub buffer_capacity: usize,
    /// Broadcasts accepted since startup
    pub total_broadcasts: u64,
    /// Clients disconnected for overflowing their buffer
    pub total_overflow_disconnects: u64,
    /// Registered clients in registration order
    pub clients: Vec<ClientInfo>,
}
