//! Bounded per-client event buffer
//!
//! Each connected client owns one buffer of fixed capacity. The producer side
//! ([`ClientBuffer`]) is shared with the broadcast engine and never blocks;
//! the consumer side ([`ClientReceiver`]) belongs to the client's delivery
//! loop and is the only place a task ever waits.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;

use super::error::RegistryError;
use super::event::Event;

/// Outcome of a non-blocking enqueue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The event was queued for the client
    Delivered,
    /// The buffer is full; the client must be disconnected
    Overflow,
    /// The buffer was closed by overflow or unregistration, or the receiver
    /// is gone
    Closed,
}

/// Producer side of a client buffer
///
/// The sender sits behind a mutex so that closing the buffer waits for any
/// in-flight enqueue to finish. Once [`close`](Self::close) returns, no
/// enqueue can reach the buffer and the delivered counter is frozen.
#[derive(Debug)]
pub struct ClientBuffer {
    tx: Mutex<Option<mpsc::Sender<Event>>>,
    capacity: usize,
    delivered: AtomicU64,
    cancel: CancellationToken,
}

/// Consumer side of a client buffer
#[derive(Debug)]
pub struct ClientReceiver {
    rx: mpsc::Receiver<Event>,
    cancel: CancellationToken,
}

impl ClientBuffer {
    /// Create a buffer pair holding at most `capacity` pending events
    pub fn channel(capacity: usize) -> Result<(ClientBuffer, ClientReceiver), RegistryError> {
        if capacity == 0 {
            return Err(RegistryError::ZeroCapacity);
        }

        let (tx, rx) = mpsc::channel(capacity);
        let cancel = CancellationToken::new();

        let buffer = ClientBuffer {
            tx: Mutex::new(Some(tx)),
            capacity,
            delivered: AtomicU64::new(0),
            cancel: cancel.clone(),
        };

        Ok((buffer, ClientReceiver { rx, cancel }))
    }

    /// Try to enqueue an event without waiting
    ///
    /// Counts the event as delivered only when it was accepted. An overflow
    /// closes the buffer on the spot, so no later event can slip in behind
    /// the one that was refused.
    pub fn try_enqueue(&self, event: Event) -> Delivery {
        let mut guard = self.lock();
        let Some(tx) = guard.as_ref() else {
            return Delivery::Closed;
        };

        match tx.try_send(event) {
            Ok(()) => {
                self.delivered.fetch_add(1, Ordering::Relaxed);
                Delivery::Delivered
            }
            Err(TrySendError::Full(_)) => {
                guard.take();
                self.cancel.cancel();
                Delivery::Overflow
            }
            Err(TrySendError::Closed(_)) => Delivery::Closed,
        }
    }

    /// Close the buffer
    ///
    /// Pending events are discarded and the consumer's `dequeue` returns
    /// `None`. Idempotent.
    pub fn close(&self) {
        self.lock().take();
        self.cancel.cancel();
    }

    /// Whether the buffer has been closed by overflow or unregistration
    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Maximum number of pending events
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of events currently waiting to be consumed
    pub fn len(&self) -> usize {
        match self.lock().as_ref() {
            Some(tx) => tx.max_capacity() - tx.capacity(),
            None => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of events ever accepted into this buffer
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    fn lock(&self) -> MutexGuard<'_, Option<mpsc::Sender<Event>>> {
        self.tx.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ClientReceiver {
    /// Wait for the next event
    ///
    /// Returns `None` once the buffer is closed. Events still pending at that
    /// point are dropped, not delivered.
    pub async fn dequeue(&mut self) -> Option<Event> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            event = self.rx.recv() => event,
        }
    }

    /// Take the next event if one is ready
    pub fn try_dequeue(&mut self) -> Option<Event> {
        if self.cancel.is_cancelled() {
            return None;
        }
        self.rx.try_recv().ok()
    }
}
