//! # Event bus for lifecycle events.
//!
//! [`Bus`] wraps [`tokio::sync::broadcast`]. Publishing is a plain synchronous
//! call, so the entry-point thread and control-plane callback threads publish
//! without touching the async runtime.
//!
//! ```text
//! Publishers (any thread):            Receiver (host runtime):
//!   entry point     ──┐
//!   control handler ──┼──► Bus ───► event forwarder ───► SubscriberSet
//!   task runner     ──┘
//! ```
//!
//! ## Rules
//! - `publish()` never blocks and never fails; with no receivers the event is dropped.
//! - One ring buffer of `capacity` events is shared by all receivers.
//! - Slow receivers observe `RecvError::Lagged(n)` and skip `n` events.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for lifecycle events. Cheap to clone.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a new bus; capacity is clamped to at least 1.
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel::<Event>(capacity.max(1));
        Self { tx }
    }

    /// Publishes an event to all current receivers.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates a receiver for events sent from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}
