//! Client registry implementation
//!
//! The structural map of connected clients. Insert and remove happen under
//! one write lock held only for the map operation; broadcasts iterate over a
//! snapshot so enqueue work never runs under the lock.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;

use super::buffer::{ClientBuffer, ClientReceiver, Delivery};
use super::config::RegistryConfig;
use super::entry::{ClientId, ClientOptions, ClientRecord};
use super::error::RegistryError;
use crate::history::{EventHistory, Replay};
use crate::stats::ClientInfo;

/// How a registration was caught up from history
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resume {
    /// No resume token was presented
    Fresh,
    /// The token is not in history; the client starts from live events
    Gap,
    /// This many historical events were queued ahead of live delivery
    Replayed(usize),
}

/// A newly registered client
#[derive(Debug)]
pub struct Registration {
    /// Shared record, also visible to broadcasts
    pub record: Arc<ClientRecord>,
    /// Consumer side of the client's buffer
    pub receiver: ClientReceiver,
    pub resume: Resume,
}

/// Registry of connected clients
pub struct ClientRegistry {
    /// Map of client id to record
    clients: RwLock<HashMap<ClientId, Arc<ClientRecord>>>,

    next_ordinal: AtomicU64,

    /// Configuration
    config: RegistryConfig,
}

impl ClientRegistry {
    /// Create a new registry with default configuration
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create a new registry with custom configuration
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            clients: RwLock::new(HashMap::new()),
            next_ordinal: AtomicU64::new(0),
            config,
        }
    }

    /// Get the registry configuration
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Register a client
    ///
    /// Allocates a fresh buffer and, when the options carry a resume token,
    /// queues the matching events recorded after it. If more events qualify
    /// than the buffer holds, only the most recent ones are kept.
    ///
    /// The history lock is held until the record is in the map, so every
    /// event is either part of the replay or seen by a later broadcast,
    /// never both and never neither.
    pub async fn register(
        &self,
        mut options: ClientOptions,
        history: &EventHistory,
    ) -> Result<Registration, RegistryError> {
        let (buffer, receiver) = ClientBuffer::channel(self.config.buffer_capacity)?;
        let resume_token = options.last_event_id.take();

        let ring = history.lock().await;
        let joined_after = ring.last_sequence();
        let replay = resume_token.as_ref().map(|id| ring.events_after(id));

        let mut clients = self.clients.write().await;

        if self.config.max_clients > 0 && clients.len() >= self.config.max_clients {
            tracing::warn!(
                clients = clients.len(),
                limit = self.config.max_clients,
                "Client rejected: limit reached"
            );
            return Err(RegistryError::ClientLimitReached {
                limit: self.config.max_clients,
            });
        }

        let ordinal = self.next_ordinal.fetch_add(1, Ordering::Relaxed);
        let record = Arc::new(ClientRecord::new(ordinal, options, joined_after, buffer));

        let resume = match replay {
            None => Resume::Fresh,
            Some(Replay::Gap) => Resume::Gap,
            Some(Replay::Events(events)) => {
                let mut matching: Vec<_> = events
                    .into_iter()
                    .filter(|event| record.topics().matches(event.topic()))
                    .collect();
                let skip = matching.len().saturating_sub(record.buffer_capacity());
                let replayed = matching.len() - skip;

                for event in matching.drain(skip..) {
                    // The buffer is fresh and sized for at least this many
                    if record.deliver(event) != Delivery::Delivered {
                        break;
                    }
                }
                Resume::Replayed(replayed)
            }
        };

        clients.insert(record.id(), Arc::clone(&record));
        let count = clients.len();
        drop(clients);
        drop(ring);

        tracing::info!(
            client_id = %record.id(),
            name = record.name().unwrap_or("-"),
            resume = ?resume,
            clients = count,
            "Client registered"
        );
        if resume == Resume::Gap {
            tracing::debug!(
                client_id = %record.id(),
                token = ?resume_token,
                "Resume token not in history, starting live"
            );
        }

        Ok(Registration {
            record,
            receiver,
            resume,
        })
    }

    /// Unregister a client
    ///
    /// Idempotent. Returns whether the client was registered. Once this
    /// returns, no broadcast can enqueue into the client's buffer.
    pub async fn unregister(&self, id: ClientId) -> bool {
        let removed = {
            let mut clients = self.clients.write().await;
            clients.remove(&id).map(|record| (record, clients.len()))
        };

        match removed {
            Some((record, count)) => {
                record.close();
                tracing::info!(
                    client_id = %id,
                    events_delivered = record.events_delivered(),
                    clients = count,
                    "Client unregistered"
                );
                true
            }
            None => {
                tracing::debug!(client_id = %id, "Unregister for unknown client ignored");
                false
            }
        }
    }

    /// Point-in-time list of registered clients in registration order
    pub async fn snapshot(&self) -> Vec<Arc<ClientRecord>> {
        let mut records: Vec<_> = self.clients.read().await.values().cloned().collect();
        records.sort_unstable_by_key(|record| record.ordinal);
        records
    }

    /// Metadata of every registered client in registration order
    pub async fn client_infos(&self) -> Vec<ClientInfo> {
        self.snapshot()
            .await
            .iter()
            .map(|record| record.info())
            .collect()
    }

    /// Check whether a client is registered
    pub async fn contains(&self, id: ClientId) -> bool {
        self.clients.read().await.contains_key(&id)
    }

    /// Get the number of registered clients
    pub async fn client_count(&self) -> usize {
        self.clients.read().await.len()
    }
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::new()
    }
}
