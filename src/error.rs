//! Error types used by the executor, the worker pool and tasks.
//!
//! - [`ExecutorError`] — errors returned by [`Executor`](crate::Executor) operations.
//! - [`TaskError`] — errors produced by a single task execution.
//! - [`PoolError`] — worker pool faults reported to the outcome handler.
//! - [`ConfigError`] — invalid configuration input.
//!
//! Every enum provides `as_label` (stable snake_case, for logs/metrics).

use std::any::Any;
use std::time::Duration;

use thiserror::Error;

use crate::core::WorkerId;

/// # Errors returned by executor operations.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutorError {
    /// `start()` was called on an executor that is already running.
    #[error("executor already started")]
    AlreadyStarted,

    /// The operation was attempted after shutdown began.
    #[error("executor is stopped or stopping")]
    ExecutorStopped,

    /// The submitted task does not satisfy the task contract.
    #[error("invalid task: {reason}")]
    InvalidTask {
        /// Why the task was rejected.
        reason: String,
    },

    /// The queue is at capacity and the caller asked not to wait.
    #[error("queue full (capacity {capacity})")]
    QueueFull {
        /// Configured queue capacity.
        capacity: usize,
    },

    /// Workers did not finish within the shutdown grace period.
    #[error("shutdown grace {grace:?} exceeded; stuck: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Tasks that were still executing when the grace period ran out.
        stuck: Vec<String>,
    },

    /// The supervisor itself terminated abnormally.
    #[error("supervisor lost: {reason}")]
    SupervisorLost {
        /// Panic payload or join failure description.
        reason: String,
    },
}

impl ExecutorError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use workvisor::ExecutorError;
    ///
    /// let err = ExecutorError::QueueFull { capacity: 8 };
    /// assert_eq!(err.as_label(), "executor_queue_full");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ExecutorError::AlreadyStarted => "executor_already_started",
            ExecutorError::ExecutorStopped => "executor_stopped",
            ExecutorError::InvalidTask { .. } => "executor_invalid_task",
            ExecutorError::QueueFull { .. } => "executor_queue_full",
            ExecutorError::GraceExceeded { .. } => "executor_grace_exceeded",
            ExecutorError::SupervisorLost { .. } => "executor_supervisor_lost",
        }
    }

    /// True if retrying the same call later may succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ExecutorError::QueueFull { .. })
    }
}

/// # Errors produced by task execution.
///
/// A task error never leaves the worker that produced it: it is routed to
/// [`Task::on_fail`](crate::Task::on_fail) and
/// [`OutcomeHandler::on_task_fail`](crate::OutcomeHandler::on_task_fail).
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// Task execution failed with a domain error.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Task execution exceeded its timeout duration.
    #[error("timed out after {timeout:?}")]
    Timeout {
        /// The timeout duration that was exceeded.
        timeout: Duration,
    },

    /// Task was cancelled before or during execution.
    #[error("task cancelled")]
    Canceled,

    /// Task panicked; the panic was caught by the worker.
    #[error("task panicked: {info}")]
    Panicked {
        /// Panic payload rendered as text.
        info: String,
    },
}

impl TaskError {
    /// Builds a [`TaskError::Fail`] from anything displayable.
    ///
    /// ```
    /// use workvisor::TaskError;
    ///
    /// let err = TaskError::fail("disk full");
    /// assert_eq!(err.to_string(), "execution failed: disk full");
    /// ```
    pub fn fail(error: impl std::fmt::Display) -> Self {
        TaskError::Fail {
            error: error.to_string(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Fail { .. } => "task_failed",
            TaskError::Timeout { .. } => "task_timeout",
            TaskError::Canceled => "task_canceled",
            TaskError::Panicked { .. } => "task_panicked",
        }
    }

    /// True for cancellation (shutdown discard, grace expiry).
    pub fn is_canceled(&self) -> bool {
        matches!(self, TaskError::Canceled)
    }
}

/// # Worker pool faults.
///
/// Reported to [`OutcomeHandler::on_pool_error`](crate::OutcomeHandler::on_pool_error);
/// never fatal for the executor.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// A worker terminated unexpectedly and will be replaced.
    #[error("{worker} crashed: {reason}")]
    WorkerCrash {
        /// The crashed worker.
        worker: WorkerId,
        /// Panic payload rendered as text.
        reason: String,
    },

    /// Workers keep crashing; respawns are now delayed by the backoff policy.
    #[error("{crashes} consecutive worker crashes; next respawn in {backoff:?}")]
    RespawnExhausted {
        /// Length of the current crash streak.
        crashes: u32,
        /// Delay applied before the next respawn.
        backoff: Duration,
    },
}

impl PoolError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            PoolError::WorkerCrash { .. } => "pool_worker_crash",
            PoolError::RespawnExhausted { .. } => "pool_respawn_exhausted",
        }
    }
}

/// # Configuration errors.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Environment profile name is not recognised.
    #[error("unknown profile {0:?} (expected \"development\" or \"production\")")]
    UnknownProfile(String),
}

/// Renders a panic payload (`&str` or `String`) as text.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
