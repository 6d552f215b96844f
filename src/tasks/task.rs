//! # Task abstraction.
//!
//! A [`Task`] has a stable [`name`](Task::name), an async [`run`](Task::run)
//! method receiving a [`CancellationToken`], and two outcome hooks. Once
//! submitted, a task is owned by the queue, then by exactly one worker, and is
//! dropped after its outcome has been reported.
//!
//! The token passed to `run` is the early-termination request: it fires when
//! the task's timeout elapses or when the shutdown grace period runs out.
//! Long-running tasks should poll it (or `select!` on `ctx.cancelled()`).

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;

/// # Asynchronous, cancelable unit of work.
///
/// # Example
/// ```
/// use tokio_util::sync::CancellationToken;
/// use async_trait::async_trait;
/// use workvisor::{Task, TaskError};
///
/// struct Checksum(Vec<u8>);
///
/// #[async_trait]
/// impl Task for Checksum {
///     type Output = u32;
///
///     fn name(&self) -> &str { "checksum" }
///
///     async fn run(&self, ctx: CancellationToken) -> Result<u32, TaskError> {
///         if ctx.is_cancelled() {
///             return Err(TaskError::Canceled);
///         }
///         Ok(self.0.iter().map(|b| *b as u32).sum())
///     }
/// }
/// ```
#[async_trait]
pub trait Task: Send + Sync + 'static {
    /// Value produced on success.
    type Output: Send + 'static;

    /// Returns a stable, human-readable task name (must not be empty).
    fn name(&self) -> &str;

    /// Executes the task until completion or cancellation.
    async fn run(&self, ctx: CancellationToken) -> Result<Self::Output, TaskError>;

    /// Per-task timeout; `None` falls back to [`Config::timeout`](crate::Config::timeout).
    fn timeout(&self) -> Option<Duration> {
        None
    }

    /// Called once after a successful `run`, before the executor's handler.
    fn on_done(&self, _result: &Self::Output) {}

    /// Called once after a failed `run`, before the executor's handler.
    fn on_fail(&self, _error: &TaskError) {}
}

/// Owned, type-erased task.
pub type BoxTask<O> = Box<dyn Task<Output = O>>;

/// Opaque task identity assigned by the executor at submission.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw numeric id (as carried by events).
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

/// Identity of a submitted task, handed to outcome callbacks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskInfo {
    /// Id assigned at submission.
    pub id: TaskId,
    /// Name reported by [`Task::name`].
    pub name: Arc<str>,
}

impl TaskInfo {
    pub(crate) fn new(id: TaskId, name: &str) -> Self {
        Self {
            id,
            name: Arc::from(name),
        }
    }
}

impl fmt::Display for TaskInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.id, self.name)
    }
}
