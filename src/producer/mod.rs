//! Background event producers
//!
//! A [`Producer`] drives an [`EventSource`] on its own task: build an event,
//! broadcast it, wait, repeat. Stopping a producer only stops new
//! broadcasts; client buffers drain at their own pace.

pub mod heartbeat;
pub mod sample;

pub use heartbeat::HeartbeatSource;
pub use sample::SampleSource;

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::manager::StreamManager;
use crate::registry::Event;

/// State handed to a source when it builds an event
#[derive(Debug, Clone, Copy)]
pub struct ProducerContext {
    /// Clients registered at the time the event is built
    pub clients: usize,
    /// Retry hint to stamp on the event
    pub retry_hint: Duration,
}

/// Something that manufactures events at intervals
pub trait EventSource: Send + 'static {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Build the next event
    fn next_event(&mut self, ctx: &ProducerContext) -> Event;

    /// How long to wait before the next event
    fn next_delay(&mut self) -> Duration;
}

/// Runs an event source on a background task
pub struct Producer<S: EventSource> {
    manager: Arc<StreamManager>,
    source: Option<S>,
    name: &'static str,
    task: Option<(CancellationToken, JoinHandle<S>)>,
}

impl<S: EventSource> Producer<S> {
    pub fn new(manager: Arc<StreamManager>, source: S) -> Self {
        Self {
            manager,
            name: source.name(),
            source: Some(source),
            task: None,
        }
    }

    /// Start producing. No-op if already running.
    pub fn start(&mut self) {
        if self.is_running() {
            return;
        }
        let Some(source) = self.source.take() else {
            // The previous task ended on its own; reclaim it with stop()
            tracing::warn!(producer = self.name, "Producer not restarted, call stop first");
            return;
        };

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run(Arc::clone(&self.manager), source, cancel.clone()));
        self.task = Some((cancel, handle));

        tracing::info!(producer = self.name, "Producer started");
    }

    /// Stop producing and wait for the task to finish. Idempotent.
    pub async fn stop(&mut self) {
        let Some((cancel, handle)) = self.task.take() else {
            return;
        };

        cancel.cancel();
        match handle.await {
            Ok(source) => self.source = Some(source),
            Err(e) => tracing::error!(producer = self.name, error = %e, "Producer task failed"),
        }

        tracing::info!(producer = self.name, "Producer stopped");
    }

    /// Whether the background task is alive
    pub fn is_running(&self) -> bool {
        self.task
            .as_ref()
            .is_some_and(|(_, handle)| !handle.is_finished())
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<S: EventSource> Drop for Producer<S> {
    fn drop(&mut self) {
        if let Some((cancel, _)) = self.task.take() {
            cancel.cancel();
        }
    }
}

async fn run<S: EventSource>(
    manager: Arc<StreamManager>,
    mut source: S,
    cancel: CancellationToken,
) -> S {
    let retry_hint = manager.config().retry_hint;

    while !cancel.is_cancelled() {
        let ctx = ProducerContext {
            clients: manager.client_count().await,
            retry_hint,
        };
        let event = source.next_event(&ctx);

        if let Err(e) = manager.broadcast(event).await {
            tracing::error!(producer = source.name(), error = %e, "Producer error");
            break;
        }

        let delay = source.next_delay();
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }
    }

    source
}
