//! Shared state for HTTP handlers

use std::sync::Arc;

use tokio::sync::Mutex;

use super::config::ServerConfig;
use crate::manager::StreamManager;
use crate::producer::{HeartbeatSource, Producer, SampleSource};

/// The built-in producers
pub struct ProducerSet {
    pub sample: Mutex<Producer<SampleSource>>,
    pub heartbeat: Mutex<Producer<HeartbeatSource>>,
}

impl ProducerSet {
    pub fn new(manager: &Arc<StreamManager>, config: &ServerConfig) -> Self {
        let sample = SampleSource::new(config.data_interval_range());
        let heartbeat = HeartbeatSource::new(config.heartbeat_interval);

        Self {
            sample: Mutex::new(Producer::new(Arc::clone(manager), sample)),
            heartbeat: Mutex::new(Producer::new(Arc::clone(manager), heartbeat)),
        }
    }

    pub async fn start(&self) {
        self.sample.lock().await.start();
        self.heartbeat.lock().await.start();
    }

    pub async fn stop(&self) {
        self.sample.lock().await.stop().await;
        self.heartbeat.lock().await.stop().await;
    }
}

/// Central shared state, passed as `Arc<AppState>` to all handlers
pub struct AppState {
    pub config: ServerConfig,
    pub manager: Arc<StreamManager>,
    pub producers: ProducerSet,
}

impl AppState {
    pub fn new(config: ServerConfig, manager: Arc<StreamManager>) -> Self {
        let producers = ProducerSet::new(&manager, &config);
        Self {
            config,
            manager,
            producers,
        }
    }
}
