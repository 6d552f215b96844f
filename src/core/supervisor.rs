//! # Supervisor: keeps the worker pool at its configured size.
//!
//! Runs on its own tokio task, started by [`Executor::start`](crate::Executor::start).
//! Every poll tick it reaps finished workers, reports crashes and spawns a
//! replacement while the pool is below `workers_count`.
//!
//! ```text
//! tick (every `delay`)
//!   ├─► reap: is_finished()? join
//!   │     ├─ Ok        → clean exit (worker published WorkerExited)
//!   │     └─ Err(panic) → WorkerCrashed + handler.on_pool_error(WorkerCrash)
//!   ├─► streak: reset on progress, += crashes
//!   │     └─ streak >= respawn_limit → RespawnExhausted + RespawnBackoff, sleep(backoff)
//!   └─► live < workers_count → spawn one worker (WorkerSpawned)
//!
//! stop.cancelled()
//!   ├─► Drain with queued work → top the pool up to workers_count
//!   └─► join workers within grace (a worker crashing mid-drain is replaced)
//!         ├─ all joined → Ok
//!         └─ timeout    → GraceExceeded, cancel task tokens
//!               ├─ abort_stuck off → wait for every worker, Err(GraceExceeded { stuck })
//!               └─ abort_stuck on  → wait one more grace, abort leftovers,
//!                                    report their tasks as Canceled, Err(GraceExceeded)
//! ```
//!
//! ## Rules
//! - At most one worker is spawned per tick while running, so a pool of N fills
//!   within N ticks; on stop the missing workers are spawned at once
//! - The live gauge only counts workers that have not been reaped
//! - A crash streak resets as soon as any worker routes an outcome

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use tokio::task::{JoinError, JoinHandle};
use tokio::time::{self, MissedTickBehavior};
use tokio::{select, time::timeout};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::config::{Config, ShutdownPolicy};
use crate::core::handler::OutcomeHandler;
use crate::core::inflight::InFlightTracker;
use crate::core::queue::TaskQueue;
use crate::core::worker::{Job, Worker, WorkerId};
use crate::error::{ExecutorError, PoolError, TaskError, panic_message};
use crate::events::{Bus, Event, EventKind};
use crate::policies::BackoffPolicy;

/// Supervisor settings derived from [`Config`].
#[derive(Clone, Debug)]
pub(crate) struct SupervisorParams {
    pub workers: usize,
    pub poll: Duration,
    pub grace: Option<Duration>,
    pub abort_stuck: bool,
    pub task_timeout: Option<Duration>,
    pub drain: bool,
    pub respawn_limit: u32,
    pub respawn_backoff: BackoffPolicy,
}

impl SupervisorParams {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            workers: cfg.workers_count,
            poll: cfg.poll_interval(),
            grace: cfg.grace_limit(),
            abort_stuck: cfg.abort_stuck,
            task_timeout: cfg.task_timeout(),
            drain: cfg.shutdown == ShutdownPolicy::Drain,
            respawn_limit: cfg.respawn_limit,
            respawn_backoff: cfg.respawn_backoff,
        }
    }
}

struct WorkerRecord {
    id: WorkerId,
    join: JoinHandle<()>,
}

pub(crate) struct Supervisor<O: Send + 'static> {
    pub params: SupervisorParams,
    pub queue: Arc<TaskQueue<Job<O>>>,
    pub handler: Arc<dyn OutcomeHandler<O>>,
    pub bus: Bus,
    pub tracker: Arc<InFlightTracker>,
    pub live: Arc<AtomicUsize>,
    progress: Arc<AtomicU64>,
    next_worker: u64,
}

impl<O: Send + 'static> Supervisor<O> {
    pub fn new(
        params: SupervisorParams,
        queue: Arc<TaskQueue<Job<O>>>,
        handler: Arc<dyn OutcomeHandler<O>>,
        bus: Bus,
        tracker: Arc<InFlightTracker>,
        live: Arc<AtomicUsize>,
    ) -> Self {
        Self {
            params,
            queue,
            handler,
            bus,
            tracker,
            live,
            progress: Arc::new(AtomicU64::new(0)),
            next_worker: 0,
        }
    }

    /// Maintains the pool until `stop` fires, then joins every worker.
    ///
    /// `cancel` is handed to workers as the parent of all task tokens and is
    /// fired only when the grace period runs out.
    pub async fn run(
        mut self,
        stop: CancellationToken,
        cancel: CancellationToken,
    ) -> Result<(), ExecutorError> {
        let mut workers: Vec<WorkerRecord> = Vec::with_capacity(self.params.workers);
        let mut ticker = time::interval(self.params.poll);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut streak: u32 = 0;
        let mut seen_progress = 0u64;

        loop {
            select! {
                biased;
                _ = stop.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let crashed = self.reap(&mut workers).await;

            let progress = self.progress.load(Ordering::Relaxed);
            if progress != seen_progress {
                seen_progress = progress;
                streak = 0;
            }
            streak = streak.saturating_add(crashed);

            let limit = self.params.respawn_limit;
            if crashed > 0 && limit > 0 && streak >= limit {
                let delay = self.params.respawn_backoff.next(streak - limit);
                self.escalate(streak, delay).await;
                select! {
                    _ = time::sleep(delay) => {}
                    _ = stop.cancelled() => break,
                }
            }

            if workers.len() < self.params.workers {
                self.spawn_worker(&mut workers, &stop, &cancel);
            }
            self.live.store(workers.len(), Ordering::Relaxed);
        }

        if self.params.drain {
            // Stop may arrive before the first tick; queued work still needs hands.
            let missing = self
                .params
                .workers
                .saturating_sub(workers.len())
                .min(self.queue.len());
            for _ in 0..missing {
                self.spawn_worker(&mut workers, &stop, &cancel);
            }
            self.live.store(workers.len(), Ordering::Relaxed);
        }

        let res = self.join_all(workers, &stop, &cancel).await;
        self.live.store(0, Ordering::Relaxed);
        res
    }

    fn spawn_worker(
        &mut self,
        workers: &mut Vec<WorkerRecord>,
        stop: &CancellationToken,
        cancel: &CancellationToken,
    ) {
        self.next_worker += 1;
        let id = WorkerId::new(self.next_worker);
        let worker = Worker {
            id,
            queue: Arc::clone(&self.queue),
            handler: Arc::clone(&self.handler),
            bus: self.bus.clone(),
            tracker: Arc::clone(&self.tracker),
            progress: Arc::clone(&self.progress),
            poll: self.params.poll,
            default_timeout: self.params.task_timeout,
            drain: self.params.drain,
        };
        let join = tokio::spawn(worker.run(stop.clone(), cancel.clone()));
        workers.push(WorkerRecord { id, join });
        self.bus.publish(
            Event::new(EventKind::WorkerSpawned)
                .with_worker(id.as_u64())
                .with_count(workers.len()),
        );
    }

    /// Joins finished workers and returns how many of them crashed.
    async fn reap(&self, workers: &mut Vec<WorkerRecord>) -> u32 {
        let (finished, running): (Vec<_>, Vec<_>) =
            workers.drain(..).partition(|w| w.join.is_finished());
        *workers = running;

        let mut crashed = 0;
        for rec in finished {
            if let Err(err) = rec.join.await {
                if self.report_exit(rec.id, err).await {
                    crashed += 1;
                }
            }
        }
        crashed
    }

    /// Reports an abnormal worker exit; returns `true` if it was a panic.
    async fn report_exit(&self, id: WorkerId, err: JoinError) -> bool {
        if !err.is_panic() {
            return false;
        }
        let reason = panic_message(err.into_panic().as_ref());
        warn!(worker = %id, reason = %reason, "worker crashed");
        self.bus.publish(
            Event::new(EventKind::WorkerCrashed)
                .with_worker(id.as_u64())
                .with_reason(reason.as_str()),
        );
        self.handler
            .on_pool_error(&PoolError::WorkerCrash { worker: id, reason })
            .await;
        true
    }

    async fn escalate(&self, streak: u32, delay: Duration) {
        warn!(crashes = streak, delay_ms = delay.as_millis() as u64, "respawn limit reached");
        self.bus.publish(
            Event::new(EventKind::RespawnBackoff)
                .with_delay(delay)
                .with_count(streak as usize),
        );
        self.handler
            .on_pool_error(&PoolError::RespawnExhausted {
                crashes: streak,
                backoff: delay,
            })
            .await;
    }

    async fn join_all(
        &mut self,
        mut workers: Vec<WorkerRecord>,
        stop: &CancellationToken,
        cancel: &CancellationToken,
    ) -> Result<(), ExecutorError> {
        let Some(grace) = self.params.grace else {
            self.join_in_order(&mut workers, stop, cancel).await;
            return Ok(());
        };

        if timeout(grace, self.join_in_order(&mut workers, stop, cancel))
            .await
            .is_ok()
        {
            return Ok(());
        }

        let stuck = self.tracker.snapshot().await;
        warn!(grace_ms = grace.as_millis() as u64, stuck = ?stuck, "shutdown grace exceeded");
        self.bus.publish(
            Event::new(EventKind::GraceExceeded)
                .with_timeout(grace)
                .with_count(workers.len()),
        );
        cancel.cancel();

        if !self.params.abort_stuck {
            self.join_in_order(&mut workers, stop, cancel).await;
        } else if timeout(grace, self.join_in_order(&mut workers, stop, cancel))
            .await
            .is_err()
        {
            for rec in &workers {
                rec.join.abort();
            }
            for rec in workers {
                let _ = rec.join.await;
            }
            self.report_aborted().await;
        }
        Err(ExecutorError::GraceExceeded { grace, stuck })
    }

    /// Joins workers one by one; cancel-safe between joins.
    ///
    /// Under drain, a worker that crashes while tasks are still queued is
    /// replaced so the queue keeps emptying.
    async fn join_in_order(
        &mut self,
        workers: &mut Vec<WorkerRecord>,
        stop: &CancellationToken,
        cancel: &CancellationToken,
    ) {
        while let Some(last) = workers.last_mut() {
            let res = (&mut last.join).await;
            let Some(rec) = workers.pop() else { break };
            let Err(err) = res else { continue };
            if self.report_exit(rec.id, err).await && self.params.drain && !self.queue.is_empty() {
                self.spawn_worker(workers, stop, cancel);
            }
        }
    }

    /// Routes a `Canceled` outcome for every task whose worker was aborted.
    async fn report_aborted(&self) {
        for info in self.tracker.take_all().await {
            warn!(task = %info, "task aborted at shutdown");
            self.bus.publish(
                Event::new(EventKind::TaskFailed)
                    .with_task(info.name.clone())
                    .with_task_id(info.id.as_u64())
                    .with_reason("aborted"),
            );
            self.handler.on_task_fail(&info, TaskError::Canceled).await;
        }
    }
}
