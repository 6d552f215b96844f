//! # LogWriter: events rendered through `tracing`.
//!
//! Maps every [`EventKind`] to a `tracing` event with structured fields. Task
//! failures, crashes and grace overruns are logged at `WARN`, task lifecycle at
//! `DEBUG`, everything else at `INFO`. Install any `tracing` subscriber
//! (e.g. `tracing_subscriber::fmt`) to see the output.

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Logging subscriber backed by `tracing`.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let task = e.task.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("-");
        match e.kind {
            EventKind::ExecutorStarted => info!(seq = e.seq, "executor started"),
            EventKind::ShutdownRequested => info!(seq = e.seq, reason, "shutdown requested"),
            EventKind::AllStoppedWithin => info!(seq = e.seq, "all workers stopped"),
            EventKind::GraceExceeded => warn!(
                seq = e.seq,
                grace_ms = e.timeout_ms,
                running = e.count,
                "shutdown grace exceeded"
            ),
            EventKind::WorkerSpawned => {
                info!(seq = e.seq, worker = e.worker, live = e.count, "worker spawned")
            }
            EventKind::WorkerExited => info!(seq = e.seq, worker = e.worker, "worker exited"),
            EventKind::WorkerCrashed => {
                warn!(seq = e.seq, worker = e.worker, reason, "worker crashed")
            }
            EventKind::RespawnBackoff => warn!(
                seq = e.seq,
                crashes = e.count,
                delay_ms = e.delay_ms,
                "respawn delayed"
            ),
            EventKind::TaskSubmitted => debug!(seq = e.seq, task, id = e.task_id, "task submitted"),
            EventKind::TaskRejected => warn!(seq = e.seq, task, reason, "task rejected"),
            EventKind::TaskStarting => debug!(
                seq = e.seq,
                task,
                id = e.task_id,
                worker = e.worker,
                "task starting"
            ),
            EventKind::TaskDone => debug!(
                seq = e.seq,
                task,
                id = e.task_id,
                worker = e.worker,
                "task done"
            ),
            EventKind::TaskFailed => warn!(
                seq = e.seq,
                task,
                id = e.task_id,
                worker = e.worker,
                reason,
                "task failed"
            ),
            EventKind::TimeoutHit => warn!(
                seq = e.seq,
                task,
                id = e.task_id,
                timeout_ms = e.timeout_ms,
                "task timed out"
            ),
            EventKind::TaskDiscarded => info!(seq = e.seq, task, id = e.task_id, "task discarded"),
            EventKind::GeneratorPass => debug!(seq = e.seq, batch = e.count, "generator pass"),
        }
    }

    fn name(&self) -> &'static str {
        "log_writer"
    }
}
