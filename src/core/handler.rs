//! # Outcome routing.
//!
//! [`OutcomeHandler`] is the seam between the pool and its collaborators
//! (loggers, metrics, API layers). Workers call it on their own tokio task
//! right after a task finished, so implementations must be `Send + Sync` and
//! should not block for long: a slow handler keeps its worker busy.
//!
//! For every submitted task exactly one of `on_task_done` / `on_task_fail` is
//! called, including tasks dropped at shutdown (reported as
//! [`TaskError::Canceled`]).
//!
//! A panic inside a handler method kills the calling worker; the supervisor
//! reports it through `on_pool_error` and spawns a replacement.

use async_trait::async_trait;

use crate::error::{PoolError, TaskError};
use crate::tasks::TaskInfo;

/// Receives task outcomes and pool faults. All methods default to no-ops.
///
/// # Example
/// ```
/// use std::sync::Mutex;
/// use async_trait::async_trait;
/// use workvisor::{OutcomeHandler, TaskError, TaskInfo};
///
/// #[derive(Default)]
/// struct Totals { done: Mutex<u64>, failed: Mutex<u64> }
///
/// #[async_trait]
/// impl OutcomeHandler<u64> for Totals {
///     async fn on_task_done(&self, _task: &TaskInfo, bytes: u64) {
///         *self.done.lock().unwrap() += bytes;
///     }
///     async fn on_task_fail(&self, _task: &TaskInfo, _error: TaskError) {
///         *self.failed.lock().unwrap() += 1;
///     }
/// }
/// ```
#[async_trait]
pub trait OutcomeHandler<O: Send + 'static>: Send + Sync + 'static {
    /// A task produced `result`.
    async fn on_task_done(&self, _task: &TaskInfo, _result: O) {}

    /// A task failed, timed out, panicked or was cancelled.
    async fn on_task_fail(&self, _task: &TaskInfo, _error: TaskError) {}

    /// A worker crashed or the respawn limit was reached.
    async fn on_pool_error(&self, _error: &PoolError) {}

    /// [`Executor::run`](crate::Executor::run) observed an OS termination signal.
    async fn on_interrupted(&self) {}
}

/// Handler that ignores everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopHandler;

impl<O: Send + 'static> OutcomeHandler<O> for NoopHandler {}
