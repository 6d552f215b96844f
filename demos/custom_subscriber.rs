//! # Example: custom_subscriber
//!
//! Demonstrates how to build and attach a custom event subscriber.
//!
//! Shows how to:
//! - Implement the [`Subscribe`] trait.
//! - Inspect [`Event`] / [`EventKind`] for task and worker lifecycle metrics.
//! - Wire the subscriber into [`Executor::builder`].
//!
//! ## Flow
//! ```text
//! submit() ──► worker ──► run_once()
//!     ├─► publish(TaskSubmitted / TaskStarting / TaskDone / TaskFailed / TimeoutHit)
//!     └─► Bus ──► executor listener ──► SubscriberSet.emit()
//!                                          ├─► InFlightTracker.on_event()
//!                                          └─► Console.on_event()
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example custom_subscriber
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use workvisor::{Config, Event, EventKind, Executor, Subscribe, Task, TaskError, TaskFn};

/// Prints selected events and keeps simple counters.
/// In real life, you could export metrics, ship logs, or trigger alerts.
#[derive(Default)]
struct Console {
    done: AtomicU64,
    failed: AtomicU64,
}

#[async_trait::async_trait]
impl Subscribe for Console {
    async fn on_event(&self, ev: &Event) {
        let task = ev.task.as_deref().unwrap_or("<unknown>");
        match ev.kind {
            EventKind::TaskStarting => {
                println!(
                    "[sub] starting: task={task} id={} worker={}",
                    ev.task_id.unwrap_or(0),
                    ev.worker.unwrap_or(0)
                );
            }
            EventKind::TaskDone => {
                self.done.fetch_add(1, Ordering::Relaxed);
                println!("[sub] done:     task={task}");
            }
            EventKind::TaskFailed => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                println!(
                    "[sub] failed:   task={task} reason={}",
                    ev.reason.as_deref().unwrap_or("<none>")
                );
            }
            EventKind::TimeoutHit => {
                println!(
                    "[sub] timeout:  task={task} timeout={}ms",
                    ev.timeout_ms.unwrap_or(0)
                );
            }
            EventKind::WorkerSpawned => {
                println!(
                    "[sub] worker-{} up ({} live)",
                    ev.worker.unwrap_or(0),
                    ev.count.unwrap_or(0)
                );
            }
            EventKind::ShutdownRequested => println!("[sub] shutdown requested"),
            EventKind::AllStoppedWithin => {
                println!(
                    "[sub] stopped: done={} failed={}",
                    self.done.load(Ordering::Relaxed),
                    self.failed.load(Ordering::Relaxed)
                );
            }
            _ => {}
        }
    }

    fn name(&self) -> &'static str {
        "console"
    }
}

/// Task with its own timeout, shorter than the work it does.
struct Slow;

#[async_trait::async_trait]
impl Task for Slow {
    type Output = ();

    fn name(&self) -> &str {
        "slow"
    }

    async fn run(&self, ctx: CancellationToken) -> Result<(), TaskError> {
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs(2)) => Ok(()),
            _ = ctx.cancelled() => Err(TaskError::Canceled),
        }
    }

    fn timeout(&self) -> Option<Duration> {
        Some(Duration::from_millis(200))
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = Config {
        workers_count: 2,
        delay: Duration::from_millis(20),
        handle_signals: false,
        ..Config::default()
    };
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(Console::default())];
    let exec: Executor<()> = Executor::builder(cfg).with_subscribers(subs).build();
    exec.start()?;

    exec.submit(TaskFn::new("ok", |_ctx: CancellationToken| async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        Ok::<_, TaskError>(())
    }))
    .await?;
    exec.submit(TaskFn::new("broken", |_ctx: CancellationToken| async {
        Err::<(), _>(TaskError::fail("boom (demo failure)"))
    }))
    .await?;
    exec.submit(Slow).await?;

    tokio::time::sleep(Duration::from_millis(50)).await;
    println!("[main] in flight: {:?}", exec.in_flight().await);

    exec.shutdown(true).await?;
    // Let the subscriber drain its queue before the runtime goes away.
    tokio::time::sleep(Duration::from_millis(50)).await;
    Ok(())
}
