//! Server configuration

use std::net::SocketAddr;
use std::ops::RangeInclusive;
use std::time::Duration;

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Interval between SSE keep-alive comments
    pub keep_alive: Duration,

    /// Run the sample data and heartbeat producers
    pub producers_enabled: bool,

    /// Shortest wait between sample data events
    pub data_interval_min: Duration,

    /// Longest wait between sample data events
    pub data_interval_max: Duration,

    /// Wait between heartbeat events
    pub heartbeat_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            keep_alive: Duration::from_secs(15),
            producers_enabled: true,
            data_interval_min: Duration::from_millis(500),
            data_interval_max: Duration::from_millis(2000),
            heartbeat_interval: Duration::from_secs(30),
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set the keep-alive interval
    pub fn keep_alive(mut self, interval: Duration) -> Self {
        self.keep_alive = interval;
        self
    }

    /// Disable the built-in producers
    pub fn disable_producers(mut self) -> Self {
        self.producers_enabled = false;
        self
    }

    /// Set the range of waits between sample data events
    pub fn data_interval(mut self, min: Duration, max: Duration) -> Self {
        self.data_interval_min = min.min(max);
        self.data_interval_max = min.max(max);
        self
    }

    /// Set the heartbeat interval
    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Sample data waits as a range
    pub fn data_interval_range(&self) -> RangeInclusive<Duration> {
        self.data_interval_min..=self.data_interval_max
    }
}
