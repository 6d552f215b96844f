//! # SubscriberSet: non-blocking fan-out over multiple subscribers
//!
//! ```text
//!    emit(&Event)
//!        │                        (Arc-clone per subscriber)
//!        ├────────────────► [queue S1] ─► worker S1 ─► on_event()
//!        ├────────────────► [queue S2] ─► worker S2 ─► on_event()
//!        └────────────────► [queue SN] ─► worker SN ─► on_event()
//! ```
//!
//! - `emit` returns immediately.
//! - FIFO per subscriber; no ordering across subscribers.
//! - Full or closed queues drop the event for that subscriber (logged with `tracing`).
//! - [`shutdown`](SubscriberSet::shutdown) closes the queues and waits until every
//!   subscriber has handled what it was sent.

use std::sync::Arc;

use futures::FutureExt;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::warn;

use super::Subscribe;
use crate::error::panic_message;
use crate::events::Event;

struct SubscriberChannel {
    name: &'static str,
    sender: mpsc::Sender<Arc<Event>>,
}

/// Fan-out with per-subscriber bounded queues and worker tasks.
pub struct SubscriberSet {
    channels: Vec<SubscriberChannel>,
    workers: Vec<JoinHandle<()>>,
}

impl SubscriberSet {
    /// Creates a new set and spawns one worker per subscriber.
    ///
    /// Must be called within a tokio runtime.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>) -> Self {
        let (channels, workers): (Vec<_>, Vec<_>) = subs
            .into_iter()
            .map(|sub| {
                let name = sub.name();
                let (tx, mut rx) = mpsc::channel::<Arc<Event>>(sub.queue_capacity().max(1));
                let handle = tokio::spawn(async move {
                    while let Some(ev) = rx.recv().await {
                        let fut = sub.on_event(ev.as_ref());
                        if let Err(payload) = std::panic::AssertUnwindSafe(fut).catch_unwind().await {
                            warn!(
                                subscriber = name,
                                panic = %panic_message(payload.as_ref()),
                                "subscriber panicked"
                            );
                        }
                    }
                });
                (SubscriberChannel { name, sender: tx }, handle)
            })
            .unzip();
        Self { channels, workers }
    }

    /// Fan-out one event to all subscribers (non-blocking).
    pub fn emit(&self, event: &Event) {
        let ev = Arc::new(event.clone());
        for channel in &self.channels {
            match channel.sender.try_send(Arc::clone(&ev)) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(subscriber = channel.name, seq = ev.seq, "event dropped: queue full");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    warn!(subscriber = channel.name, seq = ev.seq, "event dropped: worker closed");
                }
            }
        }
    }

    /// Closes every queue and waits for the subscribers to work through it.
    pub async fn shutdown(self) {
        drop(self.channels);
        for handle in self.workers {
            let _ = handle.await;
        }
    }

    /// True if there are no subscribers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Number of subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.channels.len()
    }
}
