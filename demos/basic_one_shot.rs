//! # Example: basic_one_shot
//!
//! Minimal batch run: submit a handful of tasks by hand, collect their results
//! through an [`OutcomeHandler`] and drain on shutdown.
//!
//! Demonstrates how to:
//! - Define tasks with [`TaskFn`].
//! - Receive outcomes with a custom [`OutcomeHandler`].
//! - Start the [`Executor`], submit, and `shutdown(true)` to drain the queue.
//!
//! ## Flow
//! ```text
//! Executor::start()
//!     ├─► Supervisor spawns worker-1, worker-2
//!     ├─► submit() x5 ──► TaskQueue (capacity 2, submit waits when full)
//!     ├─► workers: run_once() ──► handler.on_task_done / on_task_fail
//!     └─► shutdown(true)
//!          ├─► queue closed, workers drain what is left
//!          └─► STOPPED
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example basic_one_shot
//! ```

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use workvisor::{Config, Executor, OutcomeHandler, TaskError, TaskFn, TaskInfo};

/// Sums successful results and counts failures.
#[derive(Default)]
struct Totals {
    sum: Mutex<u64>,
    failures: Mutex<Vec<String>>,
}

#[async_trait]
impl OutcomeHandler<u64> for Totals {
    async fn on_task_done(&self, task: &TaskInfo, result: u64) {
        println!("[handler] {task} -> {result}");
        *self.sum.lock().unwrap() += result;
    }

    async fn on_task_fail(&self, task: &TaskInfo, error: TaskError) {
        println!("[handler] {task} failed: {error}");
        self.failures.lock().unwrap().push(task.to_string());
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = Config {
        workers_count: 2,
        queue_size: 2,
        delay: Duration::from_millis(20),
        handle_signals: false,
        ..Config::default()
    };

    let totals = Arc::new(Totals::default());
    let exec: Executor<u64> = Executor::builder(cfg)
        .with_handler(Arc::clone(&totals))
        .build();
    exec.start()?;

    for n in 1..=5u64 {
        let task = TaskFn::new(format!("square-{n}"), move |ctx: CancellationToken| async move {
            tokio::time::sleep(Duration::from_millis(100 * n)).await;
            if ctx.is_cancelled() {
                return Err(TaskError::Canceled);
            }
            if n == 4 {
                return Err(TaskError::fail("four is unlucky"));
            }
            Ok(n * n)
        });
        let id = exec.submit(task).await?;
        println!("[main] submitted {id}, queued={}", exec.queued());
    }

    exec.shutdown(true).await?;
    println!(
        "[main] sum={} failures={:?}",
        totals.sum.lock().unwrap(),
        totals.failures.lock().unwrap()
    );
    Ok(())
}
