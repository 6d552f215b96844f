//! # workvisor
//!
//! **Workvisor** is a supervised worker pool for tokio.
//!
//! Producers submit tasks into a bounded FIFO queue; a fixed number of
//! long-lived workers drain it concurrently. A supervisor keeps the pool at
//! its configured size (replacing crashed workers), and shutdown is graceful:
//! workers finish what they hold and drain the queue before the executor
//! reports itself stopped.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   producers ──submit()──►┌──────────────────────────────┐
//!   generator ──run()─────►│ TaskQueue (bounded, FIFO)    │◄── backpressure: submit waits
//!                          └──────┬─────────┬─────────┬───┘
//!                                 ▼         ▼         ▼
//!                           ┌─────────┐┌─────────┐┌─────────┐
//!                           │worker-1 ││worker-2 ││worker-N │   (tokio tasks)
//!                           └────┬────┘└────┬────┘└────┬────┘
//!                                │ run_once(task, timeout)  │
//!                                ▼          ▼               ▼
//!                    ┌───────────────────────────────────────────┐
//!                    │ OutcomeHandler: on_task_done/on_task_fail │
//!                    └───────────────────────────────────────────┘
//!
//!   Supervisor (tick every `delay`):
//!     reap finished workers ─► crash? on_pool_error(WorkerCrash)
//!     live < workers_count  ─► spawn one worker
//!
//!   Every component ── publish(Event) ──► Bus ──► listener ──► SubscriberSet
//!                                          │                    ┌──────┴──────┐
//!                                          │                    ▼             ▼
//!                                          │                LogWriter       yours
//!                                          └─► Executor::events() receivers
//! ```
//!
//! ### Lifecycle
//! ```text
//! INIT ──start()──► RUNNING ──shutdown()/signal──► STOPPING ──joined──► STOPPED
//!
//! STOPPING:
//!   ├─► queue closed: new and blocked submits fail with ExecutorStopped
//!   ├─► Drain (default): workers keep claiming until the queue is empty
//!   ├─► Discard: queued tasks reported as TaskError::Canceled
//!   └─► grace exceeded: task tokens cancelled, GraceExceeded { stuck }
//!
//! STOPPED: subscribers have received every event, including AllStoppedWithin
//! ```
//!
//! ## Features
//! | Area              | Description                                              | Key types / traits                          |
//! |-------------------|----------------------------------------------------------|---------------------------------------------|
//! | **Executor**      | Pool lifecycle, submission, driving loop.                | [`Executor`], [`ExecutorBuilder`]           |
//! | **Tasks**         | Units of work, closures, batch generators.               | [`Task`], [`TaskFn`], [`TaskGenerator`]     |
//! | **Outcomes**      | Receive results, failures and pool faults.               | [`OutcomeHandler`]                          |
//! | **Subscriber API**| Observe runtime events (logging, metrics).               | [`Subscribe`], [`Event`], [`EventKind`]     |
//! | **Policies**      | Respawn pacing after repeated crashes.                   | [`BackoffPolicy`], [`JitterPolicy`]         |
//! | **Errors**        | Typed errors with stable labels.                         | [`ExecutorError`], [`TaskError`], [`PoolError`] |
//! | **Configuration** | Explicit settings and environment profiles.              | [`Config`], [`Profile`]                     |
//!
//! ## Optional features
//! - `logging` (default): exports [`LogWriter`], a subscriber rendering events through `tracing`.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use workvisor::{Config, Executor, GeneratorFn, TaskError, TaskFn};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = Config {
//!         workers_count: 2,
//!         handle_signals: false,
//!         ..Config::default()
//!     };
//!
//!     #[cfg(feature = "logging")]
//!     let subs: Vec<Arc<dyn workvisor::Subscribe>> = vec![Arc::new(workvisor::LogWriter::new())];
//!     #[cfg(not(feature = "logging"))]
//!     let subs: Vec<Arc<dyn workvisor::Subscribe>> = Vec::new();
//!
//!     let exec: Executor<usize> = Executor::builder(cfg).with_subscribers(subs).build();
//!
//!     // One batch of three tasks, then a graceful drain.
//!     let generator = GeneratorFn::new(|_ctx: CancellationToken| async {
//!         ["a", "bb", "ccc"]
//!             .into_iter()
//!             .map(|word| {
//!                 TaskFn::boxed("measure", move |_ctx: CancellationToken| async move {
//!                     tokio::time::sleep(Duration::from_millis(10)).await;
//!                     Ok::<_, TaskError>(word.len())
//!                 })
//!             })
//!             .collect::<Vec<_>>()
//!     });
//!
//!     exec.run(generator).await?;
//!     Ok(())
//! }
//! ```
mod config;
mod core;
mod error;
mod events;
mod policies;
mod subscribers;
mod tasks;

// ---- Public re-exports ----

pub use config::{Config, DriveMode, Profile, ShutdownPolicy};
pub use crate::core::{
    Executor, ExecutorBuilder, ExecutorState, InFlightTracker, NoopHandler, OutcomeHandler,
    PutError, TaskQueue, WorkerId, wait_for_shutdown_signal,
};
pub use error::{ConfigError, ExecutorError, PoolError, TaskError};
pub use events::{Bus, Event, EventKind};
pub use policies::{BackoffPolicy, JitterPolicy};
pub use subscribers::{Subscribe, SubscriberSet};
pub use tasks::{BoxTask, GeneratorFn, Task, TaskFn, TaskGenerator, TaskId, TaskInfo};

// Optional: expose a built-in logger subscriber.
// Enable with: `--features logging` (on by default)
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
