//! Heartbeat generator

use std::time::Duration;

use chrono::Utc;
use serde_json::json;

use super::{EventSource, ProducerContext};
use crate::registry::{Event, TOPIC_HEARTBEAT};

/// Source of periodic `heartbeat` events carrying the client count
#[derive(Debug, Clone)]
pub struct HeartbeatSource {
    interval: Duration,
}

impl HeartbeatSource {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Default for HeartbeatSource {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

impl EventSource for HeartbeatSource {
    fn name(&self) -> &'static str {
        "heartbeat"
    }

    fn next_event(&mut self, ctx: &ProducerContext) -> Event {
        let payload = json!({
            "timestamp": Utc::now().to_rfc3339(),
            "clients": ctx.clients,
        });
        Event::from_json(TOPIC_HEARTBEAT, payload).with_retry_hint(ctx.retry_hint)
    }

    fn next_delay(&mut self) -> Duration {
        self.interval
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::manager::StreamManager;
    use crate::producer::Producer;
    use crate::registry::ClientOptions;

    #[test]
    fn test_heartbeat_payload() {
        let mut source = HeartbeatSource::new(Duration::from_secs(5));
        let ctx = ProducerContext {
            clients: 3,
            retry_hint: Duration::from_millis(5000),
        };

        let event = source.next_event(&ctx);
        assert_eq!(event.topic(), TOPIC_HEARTBEAT);
        assert_eq!(event.payload()["clients"], 3);
        assert!(event.payload()["timestamp"].is_string());
        assert_eq!(source.next_delay(), Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_reaches_subscribers() {
        let manager = Arc::new(StreamManager::new());
        let mut stream = manager
            .subscribe(ClientOptions::new().topics([TOPIC_HEARTBEAT]))
            .await
            .unwrap();
        let mut producer = Producer::new(
            Arc::clone(&manager),
            HeartbeatSource::new(Duration::from_millis(100)),
        );

        producer.start();
        let first = stream.next_event().await.unwrap();
        let second = stream.next_event().await.unwrap();
        producer.stop().await;

        assert_eq!(first.topic(), TOPIC_HEARTBEAT);
        assert_eq!(first.payload()["clients"], 1);
        assert_ne!(first.id(), second.id());
    }
}
