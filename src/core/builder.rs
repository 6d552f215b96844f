use std::sync::Arc;

use tokio::select;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::executor::Executor;
use super::handler::{NoopHandler, OutcomeHandler};
use super::inflight::InFlightTracker;
use crate::{
    config::Config,
    events::Bus,
    subscribers::{Subscribe, SubscriberSet},
};

/// Builder for an [`Executor`] with a custom outcome handler and subscribers.
pub struct ExecutorBuilder<O: Send + 'static> {
    cfg: Config,
    handler: Arc<dyn OutcomeHandler<O>>,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl<O: Send + 'static> ExecutorBuilder<O> {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            handler: Arc::new(NoopHandler),
            subscribers: Vec::new(),
        }
    }

    /// Sets the handler receiving task outcomes and pool errors.
    pub fn with_handler<H: OutcomeHandler<O>>(mut self, handler: Arc<H>) -> Self {
        self.handler = handler;
        self
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive runtime events (task lifecycle, worker crashes, etc.)
    /// through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the executor in the [`Init`](crate::ExecutorState::Init) state.
    ///
    /// Must be called within a tokio runtime: it spawns one worker per
    /// subscriber and the listener forwarding bus events to them.
    pub fn build(self) -> Executor<O> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let listener = subscriber_listener(&bus, SubscriberSet::new(self.subscribers));
        Executor::assemble(
            self.cfg,
            self.handler,
            bus,
            Arc::new(InFlightTracker::new()),
            listener,
        )
    }
}

/// Handle to the task forwarding bus events to the subscribers.
pub(crate) struct Listener {
    flush: CancellationToken,
    handle: JoinHandle<()>,
}

impl Listener {
    /// Forwards what is already on the bus, then waits until every subscriber
    /// has handled its queue.
    pub async fn close(self) {
        self.flush.cancel();
        let _ = self.handle.await;
    }
}

/// Forwards bus events to the subscriber set until flushed or every publisher is gone.
fn subscriber_listener(bus: &Bus, set: SubscriberSet) -> Listener {
    let mut rx = bus.subscribe();
    let flush = CancellationToken::new();
    let token = flush.clone();
    let handle = tokio::spawn(async move {
        loop {
            select! {
                biased;
                res = rx.recv() => match res {
                    Ok(ev) => set.emit(&ev),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "subscriber listener lagged; events lost");
                    }
                    Err(RecvError::Closed) => break,
                },
                _ = token.cancelled() => break,
            }
        }
        loop {
            match rx.try_recv() {
                Ok(ev) => set.emit(&ev),
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "subscriber listener lagged; events lost");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
        set.shutdown().await;
    });
    Listener { flush, handle }
}
