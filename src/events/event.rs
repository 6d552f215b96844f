//! # Runtime events emitted by the executor, supervisor and workers.
//!
//! [`EventKind`] falls into four groups:
//! - **Executor lifecycle**: started, shutdown requested, stopped, grace exceeded
//! - **Worker lifecycle**: spawned, exited, crashed, respawn backoff
//! - **Task lifecycle**: submitted, rejected, starting, done, failed, timeout, discarded
//! - **Driving loop**: generator passes
//!
//! Each event carries a globally unique, monotonically increasing `seq`.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use workvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::TaskFailed)
//!     .with_task("resize")
//!     .with_task_id(3)
//!     .with_worker(1)
//!     .with_reason("boom");
//!
//! assert_eq!(ev.kind, EventKind::TaskFailed);
//! assert_eq!(ev.task.as_deref(), Some("resize"));
//! assert_eq!(ev.task_id, Some(3));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(1);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Executor lifecycle ===
    /// `start()` succeeded; the supervisor is running.
    ExecutorStarted,

    /// Shutdown began (explicit call or OS signal).
    ///
    /// Sets `reason` (`"shutdown"` or `"signal"`).
    ShutdownRequested,

    /// All workers joined; the executor is stopped.
    AllStoppedWithin,

    /// Grace period exceeded; running tasks were cancelled.
    ///
    /// Sets `timeout_ms` (the grace) and `count` (workers still running).
    GraceExceeded,

    // === Worker lifecycle ===
    /// Supervisor spawned a worker. Sets `worker`, `count` (live workers after spawn).
    WorkerSpawned,

    /// Worker exited after the stop signal and an empty queue. Sets `worker`.
    WorkerExited,

    /// Worker died unexpectedly. Sets `worker`, `reason`.
    WorkerCrashed,

    /// Crash streak hit the limit; next respawn is delayed.
    ///
    /// Sets `delay_ms`, `count` (streak length).
    RespawnBackoff,

    // === Task lifecycle ===
    /// Task accepted into the queue. Sets `task`, `task_id`.
    TaskSubmitted,

    /// Task refused at submission. Sets `task`, `reason` (error label).
    TaskRejected,

    /// Worker claimed a task and is about to run it. Sets `task`, `task_id`, `worker`.
    TaskStarting,

    /// Task produced a result. Sets `task`, `task_id`, `worker`.
    TaskDone,

    /// Task failed. Sets `task`, `task_id`, `worker`, `reason`.
    TaskFailed,

    /// Task exceeded its timeout (always followed by `TaskFailed`).
    ///
    /// Sets `task`, `task_id`, `worker`, `timeout_ms`.
    TimeoutHit,

    /// Queued task dropped at shutdown and reported as cancelled. Sets `task`, `task_id`.
    TaskDiscarded,

    // === Driving loop ===
    /// Generator produced a batch. Sets `count` (batch size).
    GeneratorPass,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Task name, if applicable.
    pub task: Option<Arc<str>>,
    /// Task id, if applicable.
    pub task_id: Option<u64>,
    /// Worker id, if applicable.
    pub worker: Option<u64>,
    /// Human-readable reason (errors, panic payloads).
    pub reason: Option<Arc<str>>,
    /// Timeout or grace in milliseconds.
    pub timeout_ms: Option<u32>,
    /// Respawn delay in milliseconds.
    pub delay_ms: Option<u32>,
    /// Kind-specific counter (live workers, batch size, crash streak).
    pub count: Option<u32>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            task: None,
            task_id: None,
            worker: None,
            reason: None,
            timeout_ms: None,
            delay_ms: None,
            count: None,
        }
    }

    /// Attaches a task name.
    #[inline]
    pub fn with_task(mut self, task: impl Into<Arc<str>>) -> Self {
        self.task = Some(task.into());
        self
    }

    /// Attaches a task id.
    #[inline]
    pub fn with_task_id(mut self, id: u64) -> Self {
        self.task_id = Some(id);
        self
    }

    /// Attaches a worker id.
    #[inline]
    pub fn with_worker(mut self, id: u64) -> Self {
        self.worker = Some(id);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a timeout (stored as milliseconds).
    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        self.timeout_ms = Some(millis(d));
        self
    }

    /// Attaches a delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        self.delay_ms = Some(millis(d));
        self
    }

    /// Attaches a counter.
    #[inline]
    pub fn with_count(mut self, n: usize) -> Self {
        self.count = Some(n.min(u32::MAX as usize) as u32);
        self
    }

    /// True for events that end a task's life (`TaskDone`, `TaskFailed`, `TaskDiscarded`).
    #[inline]
    pub fn is_task_outcome(&self) -> bool {
        matches!(
            self.kind,
            EventKind::TaskDone | EventKind::TaskFailed | EventKind::TaskDiscarded
        )
    }
}

fn millis(d: Duration) -> u32 {
    d.as_millis().min(u128::from(u32::MAX)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seq_is_monotonic() {
        let a = Event::new(EventKind::TaskSubmitted);
        let b = Event::new(EventKind::TaskSubmitted);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn durations_saturate_at_u32_millis() {
        let ev = Event::new(EventKind::GraceExceeded).with_timeout(Duration::from_secs(u64::MAX));
        assert_eq!(ev.timeout_ms, Some(u32::MAX));
        let ev = Event::new(EventKind::RespawnBackoff).with_delay(Duration::from_millis(250));
        assert_eq!(ev.delay_ms, Some(250));
    }

    #[test]
    fn outcome_kinds() {
        assert!(Event::new(EventKind::TaskDone).is_task_outcome());
        assert!(Event::new(EventKind::TaskDiscarded).is_task_outcome());
        assert!(!Event::new(EventKind::TimeoutHit).is_task_outcome());
    }
}
