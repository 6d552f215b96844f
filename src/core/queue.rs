//! # Bounded FIFO task queue with backpressure.
//!
//! [`TaskQueue`] is the only structure shared mutably between the executor
//! (producers) and the workers (consumers).
//!
//! ## Architecture
//! ```text
//!   put() ──► acquire slot permit ──► lock ─ push_back ─ unlock ──► ready += 1
//!   get() ──► acquire ready permit ──► lock ─ pop_front ─ unlock ──► slots += 1
//! ```
//!
//! ## Rules
//! - `slots` permits = free capacity, `ready` permits = queued items; so
//!   `0 <= len <= capacity` always holds and a consumer holding a `ready`
//!   permit always finds an item.
//! - `put` waits while the queue is full (default backpressure policy);
//!   `try_put` fails with [`PutError::Full`] instead.
//! - `get(timeout)` returns `None` when nothing arrives in time so the caller
//!   can re-check its stop condition.
//! - After [`close`](TaskQueue::close) every put fails with [`PutError::Closed`]
//!   (blocked putters included) while consumers can still drain what is left.
//! - Both ends are cancel-safe: dropping a pending `put`/`get` future loses nothing.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::{Semaphore, TryAcquireError};
use tokio::time;

/// Rejected insertion; the item is handed back to the caller.
pub enum PutError<T> {
    /// Queue at capacity (only from [`TaskQueue::try_put`]).
    Full(T),
    /// Queue closed.
    Closed(T),
}

impl<T> PutError<T> {
    /// Recovers the rejected item.
    pub fn into_inner(self) -> T {
        match self {
            PutError::Full(t) | PutError::Closed(t) => t,
        }
    }

    /// True for [`PutError::Full`].
    pub fn is_full(&self) -> bool {
        matches!(self, PutError::Full(_))
    }
}

impl<T> fmt::Debug for PutError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PutError::Full(_) => f.write_str("Full(..)"),
            PutError::Closed(_) => f.write_str("Closed(..)"),
        }
    }
}

struct Inner<T> {
    items: VecDeque<T>,
    closed: bool,
}

/// Bounded (or unbounded), multi-producer multi-consumer FIFO.
pub struct TaskQueue<T> {
    inner: Mutex<Inner<T>>,
    slots: Semaphore,
    ready: Semaphore,
    capacity: Option<usize>,
}

impl<T> TaskQueue<T> {
    /// Creates a queue; `None` means unbounded.
    pub fn new(capacity: Option<usize>) -> Self {
        let permits = capacity.unwrap_or(Semaphore::MAX_PERMITS);
        Self {
            inner: Mutex::new(Inner {
                items: VecDeque::new(),
                closed: false,
            }),
            slots: Semaphore::new(permits),
            ready: Semaphore::new(0),
            capacity,
        }
    }

    /// Configured capacity (`None` = unbounded).
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Number of queued items.
    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    /// True if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    /// True once [`close`](Self::close) was called.
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Inserts at the tail, waiting for free capacity.
    pub async fn put(&self, item: T) -> Result<(), PutError<T>> {
        match self.slots.acquire().await {
            Ok(permit) => permit.forget(),
            Err(_closed) => return Err(PutError::Closed(item)),
        }
        self.push(item)
    }

    /// Inserts at the tail without waiting.
    pub fn try_put(&self, item: T) -> Result<(), PutError<T>> {
        match self.slots.try_acquire() {
            Ok(permit) => permit.forget(),
            Err(TryAcquireError::NoPermits) => return Err(PutError::Full(item)),
            Err(TryAcquireError::Closed) => return Err(PutError::Closed(item)),
        }
        self.push(item)
    }

    /// Removes the head, waiting up to `timeout`; `None` when nothing arrived.
    pub async fn get(&self, timeout: Duration) -> Option<T> {
        let permit = time::timeout(timeout, self.ready.acquire()).await.ok()?.ok()?;
        permit.forget();
        self.pop()
    }

    /// Removes the head if one is queued.
    pub fn try_get(&self) -> Option<T> {
        let permit = self.ready.try_acquire().ok()?;
        permit.forget();
        self.pop()
    }

    /// Rejects all further puts. Already queued items stay available.
    pub fn close(&self) {
        let mut inner = self.lock();
        inner.closed = true;
        self.slots.close();
    }

    /// Removes every queued item in FIFO order.
    pub fn drain(&self) -> Vec<T> {
        std::iter::from_fn(|| self.try_get()).collect()
    }

    fn push(&self, item: T) -> Result<(), PutError<T>> {
        let mut inner = self.lock();
        if inner.closed {
            drop(inner);
            return Err(PutError::Closed(item));
        }
        inner.items.push_back(item);
        drop(inner);
        self.ready.add_permits(1);
        Ok(())
    }

    fn pop(&self) -> Option<T> {
        let item = self.lock().items.pop_front();
        if item.is_some() {
            self.slots.add_permits(1);
        }
        item
    }

    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
