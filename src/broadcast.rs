//! Broadcast engine
//!
//! Fans one event out to every subscribed client. The cost per event is one
//! non-blocking enqueue per matching client, so a slow consumer can only ever
//! fill its own buffer. A client whose buffer is full, or whose receiver has
//! gone away without unregistering, is disconnected after the pass; the
//! event that overflowed it is not redelivered.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::history::EventHistory;
use crate::registry::{BroadcastError, ClientId, ClientRegistry, Delivery, Event};

/// Outcome of one broadcast
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// History sequence assigned to the event
    pub sequence: u64,
    /// Clients the event was queued for
    pub delivered: usize,
    /// Clients removed by this broadcast: their buffer was full or their
    /// receiver was gone
    pub disconnected: Vec<ClientId>,
}

/// Delivers events to registered clients and records them for replay
pub struct BroadcastEngine {
    registry: Arc<ClientRegistry>,
    history: Arc<EventHistory>,
    total_broadcasts: AtomicU64,
    total_overflow_disconnects: AtomicU64,
}

impl BroadcastEngine {
    pub fn new(registry: Arc<ClientRegistry>, history: Arc<EventHistory>) -> Self {
        Self {
            registry,
            history,
            total_broadcasts: AtomicU64::new(0),
            total_overflow_disconnects: AtomicU64::new(0),
        }
    }

    /// Broadcast an event to all subscribed clients
    ///
    /// Appends to history, then enqueues into every client whose filter
    /// matches. Clients that overflow or have lost their receiver are
    /// unregistered once the pass is done.
    pub async fn broadcast(&self, event: Event) -> Result<BroadcastReport, BroadcastError> {
        if event.topic().is_empty() {
            return Err(BroadcastError::EmptyTopic);
        }

        let sequence = self.history.append(event.clone()).await;
        let clients = self.registry.snapshot().await;

        let mut report = BroadcastReport {
            sequence,
            ..Default::default()
        };
        let mut overflowed = Vec::new();

        for client in clients.iter().filter(|c| c.wants(&event, sequence)) {
            match client.deliver(event.clone()) {
                Delivery::Delivered => report.delivered += 1,
                Delivery::Overflow => {
                    tracing::warn!(
                        client_id = %client.id(),
                        capacity = client.buffer_capacity(),
                        "Client buffer full, disconnecting"
                    );
                    overflowed.push(client.id());
                    report.disconnected.push(client.id());
                }
                // Unregistered or overflowed since the snapshot was taken
                Delivery::Closed if client.is_closed() => {}
                Delivery::Closed => {
                    tracing::debug!(
                        client_id = %client.id(),
                        "Client receiver dropped, disconnecting"
                    );
                    report.disconnected.push(client.id());
                }
            }
        }

        for id in &report.disconnected {
            if self.registry.unregister(*id).await && overflowed.contains(id) {
                self.total_overflow_disconnects
                    .fetch_add(1, Ordering::Relaxed);
            }
        }

        self.total_broadcasts.fetch_add(1, Ordering::Relaxed);

        tracing::debug!(
            event_id = %event.id(),
            topic = event.topic(),
            sequence = sequence,
            delivered = report.delivered,
            disconnected = report.disconnected.len(),
            "Event broadcast"
        );

        Ok(report)
    }

    /// Number of accepted broadcasts
    pub fn total_broadcasts(&self) -> u64 {
        self.total_broadcasts.load(Ordering::Relaxed)
    }

    /// Number of clients disconnected for overflowing
    pub fn total_overflow_disconnects(&self) -> u64 {
        self.total_overflow_disconnects.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::Map;

    use super::*;
    use crate::registry::{ClientOptions, RegistryConfig, TOPIC_DATA, TOPIC_HEARTBEAT};

    fn engine(config: RegistryConfig) -> (BroadcastEngine, Arc<ClientRegistry>, Arc<EventHistory>) {
        let history = Arc::new(EventHistory::new(config.history_capacity));
        let registry = Arc::new(ClientRegistry::with_config(config));
        let engine = BroadcastEngine::new(Arc::clone(&registry), Arc::clone(&history));
        (engine, registry, history)
    }

    fn event(id: &str, topic: &str) -> Event {
        Event::with_id(id, topic, Map::new())
    }

    #[tokio::test]
    async fn test_empty_topic_rejected() {
        let (engine, _, history) = engine(RegistryConfig::default());

        let result = engine.broadcast(event("e", "")).await;
        assert_eq!(result, Err(BroadcastError::EmptyTopic));
        assert!(history.is_empty().await);
        assert_eq!(engine.total_broadcasts(), 0);
    }

    #[tokio::test]
    async fn test_broadcast_without_clients_records_history() {
        let (engine, _, history) = engine(RegistryConfig::default());

        let report = engine.broadcast(event("e1", TOPIC_DATA)).await.unwrap();
        assert_eq!(report.sequence, 1);
        assert_eq!(report.delivered, 0);
        assert_eq!(history.len().await, 1);
    }

    #[tokio::test]
    async fn test_topic_filtering() {
        let (engine, registry, history) = engine(RegistryConfig::default());
        let all = registry.register(ClientOptions::new(), &history).await.unwrap();
        let alerts = registry
            .register(ClientOptions::new().topics(["alert"]), &history)
            .await
            .unwrap();

        let report = engine.broadcast(event("t1", TOPIC_DATA)).await.unwrap();

        assert_eq!(report.delivered, 1);
        assert_eq!(all.record.events_delivered(), 1);
        assert_eq!(alerts.record.events_delivered(), 0);
        assert_eq!(alerts.record.buffer_len(), 0);
    }

    #[tokio::test]
    async fn test_overflow_disconnects_slow_client() {
        let (engine, registry, history) = engine(RegistryConfig::default().buffer_capacity(2));
        let slow = registry.register(ClientOptions::new(), &history).await.unwrap();
        let mut fast = registry.register(ClientOptions::new(), &history).await.unwrap();

        for id in ["1", "2"] {
            engine.broadcast(event(id, TOPIC_DATA)).await.unwrap();
            fast.receiver.dequeue().await.unwrap();
        }
        let report = engine.broadcast(event("3", TOPIC_DATA)).await.unwrap();

        assert_eq!(report.disconnected, vec![slow.record.id()]);
        assert_eq!(report.delivered, 1);
        assert_eq!(slow.record.events_delivered(), 2);
        assert!(slow.record.is_closed());
        assert!(!registry.contains(slow.record.id()).await);
        assert!(registry.contains(fast.record.id()).await);
        assert_eq!(engine.total_overflow_disconnects(), 1);
    }

    #[tokio::test]
    async fn test_dropped_receiver_is_unregistered() {
        let (engine, registry, history) = engine(RegistryConfig::default());
        let gone = registry.register(ClientOptions::new(), &history).await.unwrap();
        let kept = registry.register(ClientOptions::new(), &history).await.unwrap();
        drop(gone.receiver);

        let report = engine.broadcast(event("e1", TOPIC_DATA)).await.unwrap();

        assert_eq!(report.delivered, 1);
        assert_eq!(report.disconnected, vec![gone.record.id()]);
        assert!(!registry.contains(gone.record.id()).await);
        assert!(registry.contains(kept.record.id()).await);
        // Not an overflow
        assert_eq!(engine.total_overflow_disconnects(), 0);

        let report = engine.broadcast(event("e2", TOPIC_DATA)).await.unwrap();
        assert!(report.disconnected.is_empty());
    }

    #[tokio::test]
    async fn test_unmatched_client_never_disconnected() {
        let (engine, registry, history) = engine(RegistryConfig::default().buffer_capacity(1));
        let idle = registry
            .register(ClientOptions::new().topics(["alert"]), &history)
            .await
            .unwrap();

        for i in 0..10 {
            engine
                .broadcast(event(&format!("e{i}"), TOPIC_HEARTBEAT))
                .await
                .unwrap();
        }

        assert!(registry.contains(idle.record.id()).await);
        assert_eq!(idle.record.events_delivered(), 0);
    }

    #[tokio::test]
    async fn test_no_delivery_after_unregister() {
        let (engine, registry, history) = engine(RegistryConfig::default());
        let mut reg = registry.register(ClientOptions::new(), &history).await.unwrap();

        engine.broadcast(event("before", TOPIC_DATA)).await.unwrap();
        registry.unregister(reg.record.id()).await;
        let report = engine.broadcast(event("after", TOPIC_DATA)).await.unwrap();

        assert_eq!(report.delivered, 0);
        assert_eq!(reg.record.events_delivered(), 1);
        assert!(reg.receiver.dequeue().await.is_none());
    }

    #[tokio::test]
    async fn test_concurrent_broadcast_and_unregister() {
        let (engine, registry, history) = engine(RegistryConfig::default().buffer_capacity(1000));
        let engine = Arc::new(engine);

        let mut records = Vec::new();
        for _ in 0..20 {
            records.push(registry.register(ClientOptions::new(), &history).await.unwrap());
        }

        let producer = {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move {
                for i in 0..200 {
                    engine
                        .broadcast(event(&format!("e{i}"), TOPIC_DATA))
                        .await
                        .unwrap();
                    tokio::task::yield_now().await;
                }
            })
        };

        let mut frozen = Vec::new();
        for reg in &records {
            registry.unregister(reg.record.id()).await;
            frozen.push(reg.record.events_delivered());
            tokio::task::yield_now().await;
        }
        producer.await.unwrap();

        // Counters never move once unregister has returned
        for (reg, count) in records.iter().zip(frozen) {
            assert_eq!(reg.record.events_delivered(), count);
        }
        assert_eq!(registry.client_count().await, 0);
    }
}
