//! # Run one task.
//!
//! Executes a single [`Task`] with an optional timeout, catches panics and
//! publishes lifecycle events.
//!
//! ## Event flow
//! ```text
//! Success:  task.run() → Ok(v)   → publish TaskDone
//! Failure:  task.run() → Err(e)  → publish TaskFailed
//! Panic:    task.run() panics    → Err(Panicked) → publish TaskFailed
//! Timeout:  deadline hit → cancel child → publish TimeoutHit
//!                                       → Err(Timeout) → publish TaskFailed
//! ```
//!
//! ## Rules
//! - Always publishes **exactly one** terminal event: `TaskDone` or `TaskFailed`
//! - The task runs under a **child token** of `parent`; timing out cancels
//!   only that child

use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::core::worker::WorkerId;
use crate::error::{TaskError, panic_message};
use crate::events::{Bus, Event, EventKind};
use crate::tasks::{Task, TaskInfo};

/// Executes `task` once and returns its outcome.
///
/// `timeout` of `None` (or zero) means no deadline.
pub(crate) async fn run_once<O: Send + 'static>(
    task: &dyn Task<Output = O>,
    info: &TaskInfo,
    worker: WorkerId,
    parent: &CancellationToken,
    timeout: Option<Duration>,
    bus: &Bus,
) -> Result<O, TaskError> {
    let child = parent.child_token();
    let fut = AssertUnwindSafe(task.run(child.clone())).catch_unwind();

    let caught = match timeout.filter(|d| *d > Duration::ZERO) {
        Some(dur) => match time::timeout(dur, fut).await {
            Ok(r) => r,
            Err(_elapsed) => {
                child.cancel();
                bus.publish(base(EventKind::TimeoutHit, info, worker).with_timeout(dur));
                Ok(Err(TaskError::Timeout { timeout: dur }))
            }
        },
        None => fut.await,
    };

    let res = caught.unwrap_or_else(|payload| {
        Err(TaskError::Panicked {
            info: panic_message(payload.as_ref()),
        })
    });

    match &res {
        Ok(_) => bus.publish(base(EventKind::TaskDone, info, worker)),
        Err(e) => bus.publish(base(EventKind::TaskFailed, info, worker).with_reason(e.to_string())),
    }
    res
}

fn base(kind: EventKind, info: &TaskInfo, worker: WorkerId) -> Event {
    Event::new(kind)
        .with_task(info.name.clone())
        .with_task_id(info.id.as_u64())
        .with_worker(worker.as_u64())
}
