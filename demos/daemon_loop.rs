//! # Example: daemon_loop
//!
//! A persistent daemon: a generator polls for work every `delay`, the pool
//! processes it, and Ctrl-C (or SIGTERM) triggers a graceful drain.
//!
//! Demonstrates how to:
//! - Pick settings from an environment [`Profile`] (`WORKVISOR_ENV`).
//! - Drive the executor with a [`GeneratorFn`] in [`DriveMode::Loop`].
//! - Log runtime events with [`LogWriter`] and `tracing-subscriber`.
//! - React to interruption through [`OutcomeHandler::on_interrupted`].
//!
//! ## Flow
//! ```text
//! Executor::run(generator)
//!     ├─► start(): supervisor fills the pool
//!     ├─► loop every `delay`:
//!     │     generate() ──► submit each task ──► GeneratorPass event
//!     ├─► SIGINT/SIGTERM ──► on_interrupted() ──► STOPPING
//!     └─► shutdown(true): drain queue, join workers, STOPPED
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=info WORKVISOR_ENV=dev cargo run --example daemon_loop
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use workvisor::{
    BoxTask, Config, DriveMode, Executor, GeneratorFn, LogWriter, OutcomeHandler, PoolError,
    Profile, Subscribe, TaskError, TaskFn, TaskInfo,
};

struct Reporter;

#[async_trait]
impl OutcomeHandler<String> for Reporter {
    async fn on_task_done(&self, task: &TaskInfo, result: String) {
        tracing::info!(task = %task, %result, "processed");
    }

    async fn on_task_fail(&self, task: &TaskInfo, error: TaskError) {
        tracing::warn!(task = %task, error = %error, label = error.as_label(), "not processed");
    }

    async fn on_pool_error(&self, error: &PoolError) {
        tracing::error!(error = %error, label = error.as_label(), "pool fault");
    }

    async fn on_interrupted(&self) {
        tracing::info!("interrupted, draining queued work");
    }
}

/// Pretends to pick up files from an inbox: 0..=2 new ones per pass.
fn inbox_batch(pass: u64) -> Vec<BoxTask<String>> {
    (0..pass % 3)
        .map(|i| {
            let file = format!("inbox/{pass:04}-{i}.json");
            TaskFn::boxed("ingest", move |ctx: CancellationToken| {
                let file = file.clone();
                async move {
                    tokio::select! {
                        _ = tokio::time::sleep(Duration::from_millis(300)) => Ok(format!("{file} ingested")),
                        _ = ctx.cancelled() => Err(TaskError::Canceled),
                    }
                }
            })
        })
        .collect()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let profile: Profile = std::env::var("WORKVISOR_ENV")
        .unwrap_or_else(|_| "development".into())
        .parse()?;
    let cfg = Config {
        mode: DriveMode::Loop,
        workers_count: 3,
        queue_size: 8,
        timeout: Duration::from_secs(2),
        grace: Duration::from_secs(5),
        ..Config::for_profile(profile)
    };
    tracing::info!(%profile, delay_ms = cfg.delay.as_millis() as u64, "starting daemon");

    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let exec: Executor<String> = Executor::builder(cfg)
        .with_handler(Arc::new(Reporter))
        .with_subscribers(subs)
        .build();

    let passes = Arc::new(AtomicU64::new(0));
    let generator = GeneratorFn::new(move |_ctx: CancellationToken| {
        let pass = passes.fetch_add(1, Ordering::Relaxed);
        async move { inbox_batch(pass) }
    });

    exec.run(generator).await?;
    tracing::info!("daemon stopped");
    Ok(())
}
