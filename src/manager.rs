//! Stream manager
//!
//! Composition root of the registry, history and broadcast engine. Producers
//! call [`StreamManager::broadcast`]; each connection calls
//! [`StreamManager::subscribe`] and drains the returned [`ClientStream`].

use std::sync::Arc;

use crate::broadcast::{BroadcastEngine, BroadcastReport};
use crate::history::EventHistory;
use crate::registry::{
    BroadcastError, ClientId, ClientOptions, ClientReceiver, ClientRecord, ClientRegistry, Event,
    RegistryConfig, RegistryError, Registration, Resume,
};
use crate::stats::{ClientInfo, ManagerStats};

/// Public entry point for producers and connections
pub struct StreamManager {
    registry: Arc<ClientRegistry>,
    history: Arc<EventHistory>,
    engine: BroadcastEngine,
}

impl StreamManager {
    /// Create a manager with default configuration
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create a manager with custom configuration
    pub fn with_config(config: RegistryConfig) -> Self {
        let history = Arc::new(EventHistory::new(config.history_capacity));
        let registry = Arc::new(ClientRegistry::with_config(config));
        let engine = BroadcastEngine::new(Arc::clone(&registry), Arc::clone(&history));

        Self {
            registry,
            history,
            engine,
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        self.registry.config()
    }

    /// Broadcast an event to every subscribed client
    pub async fn broadcast(&self, event: Event) -> Result<BroadcastReport, BroadcastError> {
        self.engine.broadcast(event).await
    }

    /// Register a client and get the raw consumer side of its buffer
    ///
    /// The caller is responsible for calling [`unregister`](Self::unregister).
    /// Prefer [`subscribe`](Self::subscribe), which unregisters on drop.
    pub async fn register(&self, options: ClientOptions) -> Result<Registration, RegistryError> {
        self.registry.register(options, &self.history).await
    }

    /// Register a client and wrap it in a guard that unregisters on drop
    pub async fn subscribe(
        self: &Arc<Self>,
        options: ClientOptions,
    ) -> Result<ClientStream, RegistryError> {
        let registration = self.register(options).await?;

        Ok(ClientStream {
            manager: Arc::clone(self),
            record: registration.record,
            receiver: registration.receiver,
            resume: registration.resume,
            released: false,
        })
    }

    /// Unregister a client. Idempotent.
    pub async fn unregister(&self, id: ClientId) -> bool {
        self.registry.unregister(id).await
    }

    /// Unregister every client, ending their streams
    ///
    /// Used on server shutdown. Pending events are discarded.
    pub async fn disconnect_all(&self) -> usize {
        let mut count = 0;
        for record in self.registry.snapshot().await {
            if self.registry.unregister(record.id()).await {
                count += 1;
            }
        }
        count
    }

    /// Get the number of registered clients
    pub async fn client_count(&self) -> usize {
        self.registry.client_count().await
    }

    /// Get the number of events retained for replay
    pub async fn history_size(&self) -> usize {
        self.history.len().await
    }

    /// Metadata of every registered client
    pub async fn clients(&self) -> Vec<ClientInfo> {
        self.registry.client_infos().await
    }

    /// Manager-wide statistics including the client listing
    pub async fn stats(&self) -> ManagerStats {
        let clients = self.clients().await;

        ManagerStats {
            client_count: clients.len(),
            history_size: self.history_size().await,
            history_capacity: self.history.capacity(),
            buffer_capacity: self.config().buffer_capacity,
            total_broadcasts: self.engine.total_broadcasts(),
            total_overflow_disconnects: self.engine.total_overflow_disconnects(),
            clients,
        }
    }
}

impl Default for StreamManager {
    fn default() -> Self {
        Self::new()
    }
}

/// A registered client's delivery handle
///
/// Dropping the handle unregisters the client, which is how a closed
/// connection releases its buffer.
pub struct ClientStream {
    manager: Arc<StreamManager>,
    record: Arc<ClientRecord>,
    receiver: ClientReceiver,
    resume: Resume,
    released: bool,
}

impl ClientStream {
    pub fn id(&self) -> ClientId {
        self.record.id()
    }

    /// The shared client record
    pub fn record(&self) -> &ClientRecord {
        &self.record
    }

    /// How the registration was caught up from history
    pub fn resume(&self) -> Resume {
        self.resume
    }

    /// Wait for the next event
    ///
    /// Returns `None` once the client has been unregistered, including after
    /// a buffer overflow.
    pub async fn next_event(&mut self) -> Option<Event> {
        self.receiver.dequeue().await
    }

    /// Unregister now instead of on drop
    pub async fn close(mut self) {
        self.released = true;
        self.manager.unregister(self.record.id()).await;
    }
}

impl std::fmt::Debug for ClientStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientStream")
            .field("client_id", &self.record.id())
            .field("resume", &self.resume)
            .finish()
    }
}

impl Drop for ClientStream {
    fn drop(&mut self) {
        if self.released || self.record.is_closed() {
            return;
        }

        let manager = Arc::clone(&self.manager);
        let id = self.record.id();

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    manager.unregister(id).await;
                });
            }
            Err(_) => {
                tracing::warn!(client_id = %id, "Client stream dropped outside runtime");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::Map;

    use super::*;
    use crate::registry::{TOPIC_DATA, TOPIC_HEARTBEAT};

    fn event(id: &str, topic: &str) -> Event {
        Event::with_id(id, topic, Map::new())
    }

    #[tokio::test]
    async fn test_subscribe_receives_broadcast() {
        let manager = Arc::new(StreamManager::new());
        let mut stream = manager.subscribe(ClientOptions::new()).await.unwrap();

        manager.broadcast(event("t1", TOPIC_DATA)).await.unwrap();
        manager.broadcast(event("t2", TOPIC_HEARTBEAT)).await.unwrap();

        assert_eq!(stream.next_event().await.unwrap().id().as_str(), "t1");
        assert_eq!(stream.next_event().await.unwrap().id().as_str(), "t2");
        assert_eq!(stream.record().events_delivered(), 2);
    }

    #[tokio::test]
    async fn test_drop_unregisters() {
        let manager = Arc::new(StreamManager::new());
        let stream = manager.subscribe(ClientOptions::new()).await.unwrap();
        assert_eq!(manager.client_count().await, 1);

        drop(stream);

        tokio::time::timeout(Duration::from_secs(1), async {
            while manager.client_count().await > 0 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_close_unregisters_immediately() {
        let manager = Arc::new(StreamManager::new());
        let stream = manager.subscribe(ClientOptions::new()).await.unwrap();

        stream.close().await;
        assert_eq!(manager.client_count().await, 0);
    }

    #[tokio::test]
    async fn test_overflow_ends_stream() {
        let manager = Arc::new(StreamManager::with_config(
            RegistryConfig::default().buffer_capacity(1),
        ));
        let mut stream = manager.subscribe(ClientOptions::new()).await.unwrap();

        manager.broadcast(event("1", TOPIC_DATA)).await.unwrap();
        let report = manager.broadcast(event("2", TOPIC_DATA)).await.unwrap();

        assert_eq!(report.disconnected, vec![stream.id()]);
        // The pending event is discarded, not delivered
        assert!(stream.next_event().await.is_none());
    }

    #[tokio::test]
    async fn test_resume_replays_then_goes_live() {
        let manager = Arc::new(StreamManager::new());
        for id in ["e1", "e2", "e3"] {
            manager.broadcast(event(id, TOPIC_DATA)).await.unwrap();
        }

        let mut stream = manager
            .subscribe(ClientOptions::new().resume_after("e2"))
            .await
            .unwrap();
        assert_eq!(stream.resume(), Resume::Replayed(1));

        manager.broadcast(event("e4", TOPIC_DATA)).await.unwrap();

        assert_eq!(stream.next_event().await.unwrap().id().as_str(), "e3");
        assert_eq!(stream.next_event().await.unwrap().id().as_str(), "e4");
    }

    #[tokio::test]
    async fn test_disconnect_all_ends_streams() {
        let manager = Arc::new(StreamManager::new());
        let mut a = manager.subscribe(ClientOptions::new()).await.unwrap();
        let mut b = manager.subscribe(ClientOptions::new()).await.unwrap();

        assert_eq!(manager.disconnect_all().await, 2);
        assert_eq!(manager.client_count().await, 0);
        assert!(a.next_event().await.is_none());
        assert!(b.next_event().await.is_none());
        assert_eq!(manager.disconnect_all().await, 0);
    }

    #[tokio::test]
    async fn test_stats() {
        let manager = Arc::new(StreamManager::with_config(
            RegistryConfig::default().history_capacity(2).buffer_capacity(8),
        ));
        let _a = manager
            .subscribe(ClientOptions::new().name("a").tags(["x"]))
            .await
            .unwrap();

        for id in ["e1", "e2", "e3"] {
            manager.broadcast(event(id, TOPIC_DATA)).await.unwrap();
        }

        let stats = manager.stats().await;
        assert_eq!(stats.client_count, 1);
        assert_eq!(stats.history_size, 2);
        assert_eq!(stats.history_capacity, 2);
        assert_eq!(stats.buffer_capacity, 8);
        assert_eq!(stats.total_broadcasts, 3);
        assert_eq!(stats.clients[0].events_delivered, 3);
        assert_eq!(stats.clients[0].buffer_len, 3);
        assert_eq!(stats.clients[0].tags, vec!["x"]);
    }
}
