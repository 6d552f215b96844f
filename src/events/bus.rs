//! # Event bus for broadcasting runtime events.
//!
//! [`Bus`] wraps [`tokio::sync::broadcast`] so that the executor, supervisor and
//! every worker can publish without blocking.
//!
//! ```text
//! Publishers (many):                  Receivers:
//!   Executor   ──┐
//!   Supervisor ──┼──────► Bus ───────► executor listener ───► SubscriberSet
//!   Worker 1..N ─┘  (broadcast chan) └► Executor::events() receivers
//! ```
//!
//! ## Rules
//! - `publish()` never blocks.
//! - One ring buffer of `capacity` events is shared by all receivers.
//! - Slow receivers get `RecvError::Lagged(n)` and skip the `n` oldest items.
//! - Events sent while nobody listens are lost.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for runtime events. Cheap to clone.
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

    /// Publishes an event to all current receivers (dropped if there are none).
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates a receiver observing events sent from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}
