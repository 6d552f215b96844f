//! # Task generators.
//!
//! A [`TaskGenerator`] is the collaborator that feeds
//! [`Executor::run`](crate::Executor::run): every generation pass it returns a
//! batch of tasks, which the executor submits in order. In
//! [`DriveMode::Once`](crate::DriveMode::Once) the generator is asked once; in
//! [`DriveMode::Loop`](crate::DriveMode::Loop) it is asked again every
//! `delay` until the executor stops. An empty batch is fine.

use std::future::Future;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::tasks::task::BoxTask;

/// Produces batches of tasks on demand.
#[async_trait]
pub trait TaskGenerator: Send + 'static {
    /// Output type of the generated tasks.
    type Output: Send + 'static;

    /// Returns the next batch. `ctx` fires when the executor starts shutting down.
    async fn generate(&mut self, ctx: CancellationToken) -> Vec<BoxTask<Self::Output>>;
}

/// Closure-backed generator.
///
/// ```rust
/// use tokio_util::sync::CancellationToken;
/// use workvisor::{GeneratorFn, TaskError, TaskFn};
///
/// let mut round = 0u32;
/// let _generator = GeneratorFn::new(move |_ctx: CancellationToken| {
///     round += 1;
///     let n = round;
///     async move {
///         vec![TaskFn::boxed("tick", move |_ctx: CancellationToken| async move {
///             Ok::<_, TaskError>(n)
///         })]
///     }
/// });
/// ```
pub struct GeneratorFn<F> {
    f: F,
}

impl<F> GeneratorFn<F> {
    /// Wraps a closure returning a future of a batch.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut, O> TaskGenerator for GeneratorFn<F>
where
    F: FnMut(CancellationToken) -> Fut + Send + 'static,
    Fut: Future<Output = Vec<BoxTask<O>>> + Send + 'static,
    O: Send + 'static,
{
    type Output = O;

    async fn generate(&mut self, ctx: CancellationToken) -> Vec<BoxTask<O>> {
        (self.f)(ctx).await
    }
}
