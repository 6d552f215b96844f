//! # Executor: public facade over the queue, supervisor and workers.
//!
//! The [`Executor`] owns the bounded task queue and the lifecycle state
//! machine. Producers [`submit`](Executor::submit) tasks; a supervisor keeps
//! `workers_count` workers alive; workers route every outcome to the
//! [`OutcomeHandler`].
//!
//! ## Lifecycle
//! ```text
//!   INIT ──start()──► RUNNING ──shutdown()/signal──► STOPPING ──workers joined──► STOPPED
//!     └──────────────────────shutdown()────────────────────────────────────────────┘
//! ```
//!
//! ## Shutdown sequence
//! ```text
//! shutdown(wait)
//!   ├─► state = STOPPING, publish ShutdownRequested
//!   ├─► queue.close()      → blocked and future submissions fail with ExecutorStopped
//!   ├─► stop.cancel()      → supervisor stops respawning, workers stop idling
//!   ├─► Discard policy?    → queued tasks reported as TaskError::Canceled
//!   └─► wait?              → until STOPPED, returns the supervisor's verdict
//!
//! supervisor finished
//!   ├─► leftovers in the queue → TaskError::Canceled
//!   ├─► publish AllStoppedWithin (on success)
//!   ├─► flush subscribers
//!   └─► state = STOPPED
//! ```
//!
//! ## Rules
//! - Every accepted task gets exactly one `on_task_done` / `on_task_fail`;
//!   tasks lost to an aborted worker (`abort_stuck`) are reported as `Canceled`
//! - Under `Drain` nothing is discarded unless `workers_count` is 0
//! - `shutdown` is idempotent; only the first call has effects
//! - `shutdown(true)` must not be awaited from inside a task or handler: the
//!   calling worker would wait for itself

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use tokio::select;
use tokio::sync::{Mutex, broadcast, watch};
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::{Config, DriveMode, ShutdownPolicy};
use crate::core::builder::{ExecutorBuilder, Listener};
use crate::core::handler::OutcomeHandler;
use crate::core::inflight::InFlightTracker;
use crate::core::queue::{PutError, TaskQueue};
use crate::core::shutdown;
use crate::core::supervisor::{Supervisor, SupervisorParams};
use crate::core::worker::Job;
use crate::error::{ExecutorError, TaskError, panic_message};
use crate::events::{Bus, Event, EventKind};
use crate::tasks::{BoxTask, Task, TaskGenerator, TaskId, TaskInfo};

/// Lifecycle state of an [`Executor`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutorState {
    /// Built, not started. Submissions are queued but nothing runs.
    Init,
    /// Supervisor and workers are running.
    Running,
    /// Shutdown requested; no new submissions, workers finishing up.
    Stopping,
    /// Terminal. All workers joined.
    Stopped,
}

struct Shared<O: Send + 'static> {
    cfg: Config,
    queue: Arc<TaskQueue<Job<O>>>,
    handler: Arc<dyn OutcomeHandler<O>>,
    bus: Bus,
    tracker: Arc<InFlightTracker>,
    listener: Mutex<Option<Listener>>,
    state: watch::Sender<ExecutorState>,
    outcome: OnceLock<Result<(), ExecutorError>>,
    stop: CancellationToken,
    cancel: CancellationToken,
    live: Arc<AtomicUsize>,
    next_id: AtomicU64,
}

/// Bounded worker pool with a supervised lifecycle. Cheap to clone; clones
/// share the same pool.
///
/// # Example
/// ```rust,no_run
/// use tokio_util::sync::CancellationToken;
/// use workvisor::{Config, Executor, TaskError, TaskFn};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let exec: Executor<usize> = Executor::new(Config::default());
///     exec.start()?;
///     exec.submit(TaskFn::new("len", |_ctx: CancellationToken| async {
///         Ok::<_, TaskError>("hello".len())
///     }))
///     .await?;
///     exec.shutdown(true).await?;
///     Ok(())
/// }
/// ```
pub struct Executor<O: Send + 'static> {
    shared: Arc<Shared<O>>,
}

impl<O: Send + 'static> Clone for Executor<O> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<O: Send + 'static> Executor<O> {
    /// Starts building an executor with a custom handler or subscribers.
    pub fn builder(cfg: Config) -> ExecutorBuilder<O> {
        ExecutorBuilder::new(cfg)
    }

    /// Builds an executor with a no-op handler and no extra subscribers.
    ///
    /// Must be called within a tokio runtime.
    pub fn new(cfg: Config) -> Self {
        ExecutorBuilder::new(cfg).build()
    }

    pub(crate) fn assemble(
        cfg: Config,
        handler: Arc<dyn OutcomeHandler<O>>,
        bus: Bus,
        tracker: Arc<InFlightTracker>,
        listener: Listener,
    ) -> Self {
        let queue = Arc::new(TaskQueue::new(cfg.queue_capacity()));
        let (state, _) = watch::channel(ExecutorState::Init);
        Self {
            shared: Arc::new(Shared {
                cfg,
                queue,
                handler,
                bus,
                tracker,
                listener: Mutex::new(Some(listener)),
                state,
                outcome: OnceLock::new(),
                stop: CancellationToken::new(),
                cancel: CancellationToken::new(),
                live: Arc::new(AtomicUsize::new(0)),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Configuration this executor was built with.
    pub fn config(&self) -> &Config {
        &self.shared.cfg
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ExecutorState {
        *self.shared.state.borrow()
    }

    /// Workers currently alive (as of the last supervisor tick).
    pub fn live_workers(&self) -> usize {
        self.shared.live.load(Ordering::Relaxed)
    }

    /// Tasks waiting in the queue.
    pub fn queued(&self) -> usize {
        self.shared.queue.len()
    }

    /// Labels (`task-<id>(<name>)`) of tasks being executed right now.
    pub async fn in_flight(&self) -> Vec<String> {
        self.shared.tracker.snapshot().await
    }

    /// Receiver for runtime events published from now on.
    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.shared.bus.subscribe()
    }

    /// Starts the supervisor. Must be called within a tokio runtime.
    ///
    /// # Errors
    /// - [`ExecutorError::AlreadyStarted`] if already running
    /// - [`ExecutorError::ExecutorStopped`] if shutdown already began
    pub fn start(&self) -> Result<(), ExecutorError> {
        let mut verdict = Ok(());
        self.shared.state.send_if_modified(|s| match s {
            ExecutorState::Init => {
                *s = ExecutorState::Running;
                true
            }
            ExecutorState::Running => {
                verdict = Err(ExecutorError::AlreadyStarted);
                false
            }
            ExecutorState::Stopping | ExecutorState::Stopped => {
                verdict = Err(ExecutorError::ExecutorStopped);
                false
            }
        });
        verdict?;

        let s = &self.shared;
        let supervisor = Supervisor::new(
            SupervisorParams::from_config(&s.cfg),
            Arc::clone(&s.queue),
            Arc::clone(&s.handler),
            s.bus.clone(),
            Arc::clone(&s.tracker),
            Arc::clone(&s.live),
        );
        let run = supervisor.run(s.stop.clone(), s.cancel.clone());
        s.bus.publish(
            Event::new(EventKind::ExecutorStarted).with_count(s.cfg.workers_count),
        );

        let me = self.clone();
        tokio::spawn(async move {
            let res = match tokio::spawn(run).await {
                Ok(res) => res,
                Err(err) => {
                    let reason = if err.is_panic() {
                        panic_message(err.into_panic().as_ref())
                    } else {
                        err.to_string()
                    };
                    warn!(reason = %reason, "supervisor lost");
                    Err(ExecutorError::SupervisorLost { reason })
                }
            };
            me.finish(res).await;
        });
        Ok(())
    }

    /// Enqueues a task, waiting while the queue is full.
    ///
    /// # Errors
    /// - [`ExecutorError::ExecutorStopped`] once shutdown began (also wakes a waiting call)
    /// - [`ExecutorError::InvalidTask`] for an empty task name
    pub async fn submit<T: Task<Output = O>>(&self, task: T) -> Result<TaskId, ExecutorError> {
        self.submit_boxed(Box::new(task)).await
    }

    /// [`submit`](Self::submit) for an already boxed task.
    pub async fn submit_boxed(&self, task: BoxTask<O>) -> Result<TaskId, ExecutorError> {
        let job = self.admit(task)?;
        let info = job.info.clone();
        self.announce(&info);
        match self.shared.queue.put(job).await {
            Ok(()) => Ok(info.id),
            Err(_) => Err(self.reject(&info.name, ExecutorError::ExecutorStopped)),
        }
    }

    /// Enqueues a task without waiting.
    ///
    /// # Errors
    /// As [`submit`](Self::submit), plus [`ExecutorError::QueueFull`] when at capacity.
    pub fn try_submit<T: Task<Output = O>>(&self, task: T) -> Result<TaskId, ExecutorError> {
        let job = self.admit(Box::new(task))?;
        let info = job.info.clone();
        match self.shared.queue.try_put(job) {
            Ok(()) => {
                self.announce(&info);
                Ok(info.id)
            }
            Err(PutError::Full(_)) => {
                let capacity = self.shared.queue.capacity().unwrap_or_default();
                Err(self.reject(&info.name, ExecutorError::QueueFull { capacity }))
            }
            Err(PutError::Closed(_)) => Err(self.reject(&info.name, ExecutorError::ExecutorStopped)),
        }
    }

    /// Requests shutdown. With `wait`, resolves once the executor is stopped
    /// and returns the shutdown verdict (e.g. [`ExecutorError::GraceExceeded`]).
    ///
    /// Safe to call repeatedly and from any clone.
    pub async fn shutdown(&self, wait: bool) -> Result<(), ExecutorError> {
        self.begin_shutdown("shutdown").await;
        if !wait {
            return Ok(());
        }
        let mut rx = self.shared.state.subscribe();
        let _ = rx.wait_for(|s| *s == ExecutorState::Stopped).await;
        self.shared.outcome.get().cloned().unwrap_or(Ok(()))
    }

    /// Drives the executor from a generator until done or interrupted.
    ///
    /// Starts the pool (if not started yet), then asks `generator` for a
    /// batch and submits it; in [`DriveMode::Loop`] it repeats every `delay`.
    /// Ends with `shutdown(true)`; an OS termination signal (when
    /// `handle_signals` is set) triggers the same shutdown after calling
    /// [`OutcomeHandler::on_interrupted`].
    pub async fn run<G>(&self, mut generator: G) -> Result<(), ExecutorError>
    where
        G: TaskGenerator<Output = O>,
    {
        match self.start() {
            Ok(()) | Err(ExecutorError::AlreadyStarted) => {}
            Err(e) => return Err(e),
        }

        let drive = self.drive(&mut generator);
        tokio::pin!(drive);
        select! {
            _ = &mut drive => {}
            _ = shutdown::interrupted(self.shared.cfg.handle_signals) => {
                self.begin_shutdown("signal").await;
                self.shared.handler.on_interrupted().await;
                // A submit blocked on a full queue is woken by the close and
                // hands its task back as rejected; let it finish.
                drive.await;
            }
        }
        self.shutdown(true).await
    }

    async fn drive<G>(&self, generator: &mut G)
    where
        G: TaskGenerator<Output = O>,
    {
        let stop = self.shared.stop.clone();
        let pause = self.shared.cfg.poll_interval();
        while !stop.is_cancelled() {
            let batch = generator.generate(stop.child_token()).await;
            self.shared
                .bus
                .publish(Event::new(EventKind::GeneratorPass).with_count(batch.len()));

            for task in batch {
                match self.submit_boxed(task).await {
                    Ok(_) => {}
                    Err(ExecutorError::InvalidTask { reason }) => {
                        warn!(reason = %reason, "generator produced an invalid task");
                    }
                    Err(_) => return,
                }
            }

            if self.shared.cfg.mode == DriveMode::Once {
                return;
            }
            select! {
                _ = time::sleep(pause) => {}
                _ = stop.cancelled() => return,
            }
        }
    }

    /// Validates a task and assigns it an id.
    fn admit(&self, task: BoxTask<O>) -> Result<Job<O>, ExecutorError> {
        if matches!(self.state(), ExecutorState::Stopping | ExecutorState::Stopped) {
            return Err(self.reject(task.name(), ExecutorError::ExecutorStopped));
        }
        if task.name().trim().is_empty() {
            return Err(self.reject(
                task.name(),
                ExecutorError::InvalidTask {
                    reason: "task name is empty".into(),
                },
            ));
        }
        let id = TaskId::new(self.shared.next_id.fetch_add(1, Ordering::Relaxed));
        let info = TaskInfo::new(id, task.name());
        Ok(Job { info, task })
    }

    fn announce(&self, info: &TaskInfo) {
        self.shared.bus.publish(
            Event::new(EventKind::TaskSubmitted)
                .with_task(info.name.clone())
                .with_task_id(info.id.as_u64()),
        );
    }

    fn reject(&self, name: &str, err: ExecutorError) -> ExecutorError {
        debug!(task = name, reason = err.as_label(), "task rejected");
        self.shared.bus.publish(
            Event::new(EventKind::TaskRejected)
                .with_task(name)
                .with_reason(err.as_label()),
        );
        err
    }

    /// First caller moves the executor to STOPPING; later callers return at once.
    async fn begin_shutdown(&self, reason: &'static str) {
        let mut previous = ExecutorState::Init;
        let changed = self.shared.state.send_if_modified(|s| match s {
            ExecutorState::Init | ExecutorState::Running => {
                previous = *s;
                *s = ExecutorState::Stopping;
                true
            }
            ExecutorState::Stopping | ExecutorState::Stopped => false,
        });
        if !changed {
            return;
        }

        self.shared
            .bus
            .publish(Event::new(EventKind::ShutdownRequested).with_reason(reason));
        self.shared.queue.close();
        self.shared.stop.cancel();

        if previous == ExecutorState::Init {
            self.finish(Ok(())).await;
        } else if self.shared.cfg.shutdown == ShutdownPolicy::Discard {
            self.discard_queued().await;
        }
    }

    /// Final step once no worker is left: report leftovers, flush subscribers,
    /// store the verdict.
    async fn finish(&self, res: Result<(), ExecutorError>) {
        self.shared.queue.close();
        self.shared.stop.cancel();
        self.discard_queued().await;
        self.shared.live.store(0, Ordering::Relaxed);
        if res.is_ok() {
            self.shared.bus.publish(Event::new(EventKind::AllStoppedWithin));
        }
        let listener = self.shared.listener.lock().await.take();
        if let Some(listener) = listener {
            listener.close().await;
        }
        let _ = self.shared.outcome.set(res);
        self.shared.state.send_replace(ExecutorState::Stopped);
    }

    async fn discard_queued(&self) {
        for Job { info, task } in self.shared.queue.drain() {
            self.shared.bus.publish(
                Event::new(EventKind::TaskDiscarded)
                    .with_task(info.name.clone())
                    .with_task_id(info.id.as_u64()),
            );
            task.on_fail(&TaskError::Canceled);
            self.shared
                .handler
                .on_task_fail(&info, TaskError::Canceled)
                .await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PoolError;
    use crate::policies::BackoffPolicy;
    use crate::tasks::{GeneratorFn, TaskFn};
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::time::Instant;

    #[derive(Default)]
    struct Recorder {
        done: Mutex<Vec<(TaskId, u32)>>,
        failed: Mutex<Vec<(TaskId, TaskError)>>,
        pool: Mutex<Vec<PoolError>>,
        choke_on: Option<u32>,
        choke_always: bool,
    }

    impl Recorder {
        fn values(&self) -> Vec<u32> {
            let mut v: Vec<u32> = self.done.lock().unwrap().iter().map(|(_, v)| *v).collect();
            v.sort_unstable();
            v
        }

        fn errors(&self) -> Vec<TaskError> {
            self.failed.lock().unwrap().iter().map(|(_, e)| e.clone()).collect()
        }
    }

    #[async_trait]
    impl OutcomeHandler<u32> for Recorder {
        async fn on_task_done(&self, task: &TaskInfo, result: u32) {
            if self.choke_always || self.choke_on == Some(result) {
                panic!("handler choked on {result}");
            }
            self.done.lock().unwrap().push((task.id, result));
        }

        async fn on_task_fail(&self, task: &TaskInfo, error: TaskError) {
            self.failed.lock().unwrap().push((task.id, error));
        }

        async fn on_pool_error(&self, error: &PoolError) {
            self.pool.lock().unwrap().push(error.clone());
        }
    }

    fn cfg(workers: usize, queue: usize) -> Config {
        Config {
            delay: Duration::from_millis(10),
            workers_count: workers,
            queue_size: queue,
            handle_signals: false,
            ..Config::default()
        }
    }

    fn exec(cfg: Config, rec: &Arc<Recorder>) -> Executor<u32> {
        Executor::<u32>::builder(cfg)
            .with_handler(Arc::clone(rec))
            .build()
    }

    fn sleepy(value: u32, ms: u64) -> BoxTask<u32> {
        TaskFn::boxed("sleepy", move |_ctx: CancellationToken| async move {
            time::sleep(Duration::from_millis(ms)).await;
            Ok::<_, TaskError>(value)
        })
    }

    fn quick(value: u32) -> BoxTask<u32> {
        TaskFn::boxed("quick", move |_ctx: CancellationToken| async move {
            if value % 3 == 0 {
                Err(TaskError::fail(format!("{value} is divisible by three")))
            } else {
                Ok(value)
            }
        })
    }

    #[tokio::test(start_paused = true)]
    async fn two_workers_finish_six_tasks_in_parallel() {
        let rec = Arc::new(Recorder::default());
        let ex = exec(cfg(2, 4), &rec);
        let t0 = Instant::now();
        ex.start().unwrap();
        for i in 0..6 {
            ex.submit_boxed(sleepy(i, 50)).await.unwrap();
        }
        ex.shutdown(true).await.unwrap();

        assert_eq!(rec.values(), vec![0, 1, 2, 3, 4, 5]);
        assert!(rec.failed.lock().unwrap().is_empty());
        assert!(t0.elapsed() < Duration::from_millis(250), "took {:?}", t0.elapsed());
        assert_eq!(ex.state(), ExecutorState::Stopped);
        assert_eq!(ex.live_workers(), 0);
    }

    #[tokio::test]
    async fn start_submit_shutdown_drains_without_waiting() {
        let rec = Arc::new(Recorder::default());
        let ex = exec(cfg(2, 8), &rec);
        let mut events = ex.events();
        ex.start().unwrap();
        for i in [1, 2, 4] {
            ex.submit_boxed(quick(i)).await.unwrap();
        }
        ex.shutdown(true).await.unwrap();

        assert_eq!(rec.values(), vec![1, 2, 4]);
        assert!(rec.errors().is_empty());
        while let Ok(ev) = events.try_recv() {
            assert_ne!(ev.kind, EventKind::TaskDiscarded);
        }
    }

    #[tokio::test]
    async fn run_once_on_a_live_runtime_completes_the_batch() {
        let rec = Arc::new(Recorder::default());
        let ex = exec(cfg(3, 4), &rec);
        let generator = GeneratorFn::new(|_ctx: CancellationToken| async {
            (1..=5).map(quick).collect::<Vec<_>>()
        });
        ex.run(generator).await.unwrap();

        assert_eq!(rec.values(), vec![1, 2, 4, 5]);
        assert_eq!(rec.errors(), vec![TaskError::fail("3 is divisible by three")]);
    }

    #[tokio::test(start_paused = true)]
    async fn every_task_gets_exactly_one_outcome() {
        let rec = Arc::new(Recorder::default());
        let ex = exec(cfg(3, 0), &rec);
        ex.start().unwrap();
        let mut ids = HashSet::new();
        for i in 0..20 {
            ids.insert(ex.submit_boxed(quick(i)).await.unwrap());
        }
        ex.shutdown(true).await.unwrap();

        let done = rec.done.lock().unwrap().clone();
        let failed = rec.failed.lock().unwrap().clone();
        assert_eq!(done.len(), 13);
        assert_eq!(failed.len(), 7);
        let seen: HashSet<TaskId> = done
            .iter()
            .map(|(id, _)| *id)
            .chain(failed.iter().map(|(id, _)| *id))
            .collect();
        assert_eq!(seen, ids);
    }

    #[tokio::test(start_paused = true)]
    async fn failing_task_does_not_stop_the_pool() {
        let rec = Arc::new(Recorder::default());
        let ex = exec(cfg(1, 4), &rec);
        ex.start().unwrap();
        ex.submit_boxed(quick(3)).await.unwrap();
        ex.submit_boxed(quick(4)).await.unwrap();
        ex.shutdown(true).await.unwrap();

        assert_eq!(rec.values(), vec![4]);
        assert_eq!(rec.errors(), vec![TaskError::fail("3 is divisible by three")]);
    }

    #[tokio::test(start_paused = true)]
    async fn task_panic_is_reported_as_failure() {
        let rec = Arc::new(Recorder::default());
        let ex = exec(cfg(1, 4), &rec);
        ex.start().unwrap();
        ex.submit(TaskFn::new("explode", |_ctx: CancellationToken| async {
            if true {
                panic!("bad input");
            }
            Ok::<u32, TaskError>(0)
        }))
        .await
        .unwrap();
        ex.submit_boxed(quick(1)).await.unwrap();
        ex.shutdown(true).await.unwrap();

        assert_eq!(
            rec.errors(),
            vec![TaskError::Panicked {
                info: "bad input".into()
            }]
        );
        assert_eq!(rec.values(), vec![1]);
        assert!(rec.pool.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn drain_runs_queued_tasks_before_stopping() {
        let rec = Arc::new(Recorder::default());
        let ex = exec(cfg(1, 8), &rec);
        ex.start().unwrap();
        for i in 0..4 {
            ex.submit_boxed(sleepy(i, 30)).await.unwrap();
        }
        time::sleep(Duration::from_millis(5)).await;
        ex.shutdown(true).await.unwrap();

        assert_eq!(rec.values(), vec![0, 1, 2, 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn discard_cancels_queued_tasks() {
        let rec = Arc::new(Recorder::default());
        let ex = exec(
            Config {
                shutdown: ShutdownPolicy::Discard,
                ..cfg(1, 8)
            },
            &rec,
        );
        let mut events = ex.events();
        ex.start().unwrap();
        for i in 0..4 {
            ex.submit_boxed(sleepy(i, 30)).await.unwrap();
        }
        time::sleep(Duration::from_millis(5)).await;
        ex.shutdown(true).await.unwrap();

        assert_eq!(rec.values(), vec![0]);
        assert_eq!(rec.errors(), vec![TaskError::Canceled; 3]);

        let mut discarded = 0;
        while let Ok(ev) = events.try_recv() {
            if ev.kind == EventKind::TaskDiscarded {
                discarded += 1;
            }
        }
        assert_eq!(discarded, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn lifecycle_errors() {
        let rec = Arc::new(Recorder::default());
        let ex = exec(cfg(1, 4), &rec);
        assert_eq!(ex.state(), ExecutorState::Init);
        ex.start().unwrap();
        assert_eq!(ex.start(), Err(ExecutorError::AlreadyStarted));

        ex.shutdown(true).await.unwrap();
        ex.shutdown(true).await.unwrap();
        ex.shutdown(false).await.unwrap();
        assert_eq!(ex.start(), Err(ExecutorError::ExecutorStopped));
        assert_eq!(
            ex.submit_boxed(quick(1)).await,
            Err(ExecutorError::ExecutorStopped)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_before_start_cancels_queued_tasks() {
        let rec = Arc::new(Recorder::default());
        let ex = exec(cfg(2, 4), &rec);
        ex.submit_boxed(quick(1)).await.unwrap();
        ex.submit_boxed(quick(2)).await.unwrap();
        ex.shutdown(true).await.unwrap();

        assert_eq!(ex.state(), ExecutorState::Stopped);
        assert_eq!(rec.errors(), vec![TaskError::Canceled, TaskError::Canceled]);
        assert!(rec.done.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn empty_name_is_rejected() {
        let ex: Executor<u32> = Executor::new(cfg(1, 4));
        let task = TaskFn::new("  ", |_ctx: CancellationToken| async { Ok::<u32, TaskError>(1) });
        assert!(matches!(
            ex.submit(task).await,
            Err(ExecutorError::InvalidTask { .. })
        ));
        assert_eq!(ex.queued(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn try_submit_reports_queue_full() {
        let ex: Executor<u32> = Executor::new(cfg(1, 2));
        let mk = || TaskFn::new("t", |_ctx: CancellationToken| async { Ok::<u32, TaskError>(1) });
        ex.try_submit(mk()).unwrap();
        ex.try_submit(mk()).unwrap();
        let err = ex.try_submit(mk()).unwrap_err();
        assert_eq!(err, ExecutorError::QueueFull { capacity: 2 });
        assert!(err.is_recoverable());
        assert_eq!(ex.queued(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn submit_waits_for_space() {
        let rec = Arc::new(Recorder::default());
        let ex = exec(cfg(1, 1), &rec);
        ex.submit_boxed(quick(1)).await.unwrap();

        let blocked = {
            let ex = ex.clone();
            tokio::spawn(async move { ex.submit_boxed(quick(2)).await })
        };
        time::sleep(Duration::from_millis(50)).await;
        assert!(!blocked.is_finished());

        ex.start().unwrap();
        assert!(blocked.await.unwrap().is_ok());
        ex.shutdown(true).await.unwrap();
        assert_eq!(rec.values(), vec![1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_wakes_blocked_submitter() {
        let ex: Executor<u32> = Executor::new(cfg(0, 1));
        ex.submit_boxed(quick(1)).await.unwrap();
        let blocked = {
            let ex = ex.clone();
            tokio::spawn(async move { ex.submit_boxed(quick(2)).await })
        };
        time::sleep(Duration::from_millis(20)).await;
        ex.shutdown(false).await.unwrap();
        assert_eq!(blocked.await.unwrap(), Err(ExecutorError::ExecutorStopped));
    }

    #[tokio::test(start_paused = true)]
    async fn pool_heals_after_handler_panic() {
        let rec = Arc::new(Recorder {
            choke_on: Some(13),
            ..Recorder::default()
        });
        let ex = exec(cfg(2, 4), &rec);
        ex.start().unwrap();
        time::sleep(Duration::from_millis(25)).await;
        assert_eq!(ex.live_workers(), 2);

        ex.submit_boxed(quick(13)).await.unwrap();
        time::sleep(Duration::from_millis(50)).await;
        assert_eq!(ex.live_workers(), 2);
        {
            let pool = rec.pool.lock().unwrap();
            assert_eq!(pool.len(), 1);
            assert!(matches!(
                &pool[0],
                PoolError::WorkerCrash { reason, .. } if reason == "handler choked on 13"
            ));
        }

        ex.submit_boxed(quick(7)).await.unwrap();
        ex.shutdown(true).await.unwrap();
        assert_eq!(rec.values(), vec![7]);
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_crashes_escalate_with_backoff() {
        let rec = Arc::new(Recorder {
            choke_always: true,
            ..Recorder::default()
        });
        let backoff = BackoffPolicy {
            first: Duration::from_millis(50),
            ..BackoffPolicy::default()
        };
        let ex = exec(
            Config {
                respawn_limit: 2,
                respawn_backoff: backoff,
                ..cfg(1, 8)
            },
            &rec,
        );
        ex.start().unwrap();
        for i in 1..=4 {
            ex.submit_boxed(sleepy(i, 1)).await.unwrap();
        }
        time::sleep(Duration::from_millis(300)).await;
        ex.shutdown(true).await.unwrap();

        let pool = rec.pool.lock().unwrap();
        let crashes = pool
            .iter()
            .filter(|e| matches!(e, PoolError::WorkerCrash { .. }))
            .count();
        assert_eq!(crashes, 4);
        assert!(pool.contains(&PoolError::RespawnExhausted {
            crashes: 2,
            backoff: Duration::from_millis(50),
        }));
    }

    #[tokio::test(start_paused = true)]
    async fn grace_exceeded_cancels_running_tasks() {
        let rec = Arc::new(Recorder::default());
        let ex = exec(
            Config {
                grace: Duration::from_millis(50),
                ..cfg(1, 4)
            },
            &rec,
        );
        ex.start().unwrap();
        ex.submit(TaskFn::new("stubborn", |ctx: CancellationToken| async move {
            ctx.cancelled().await;
            Err::<u32, _>(TaskError::Canceled)
        }))
        .await
        .unwrap();
        time::sleep(Duration::from_millis(20)).await;
        assert_eq!(ex.in_flight().await, vec!["task-1(stubborn)".to_string()]);

        let err = ex.shutdown(true).await.unwrap_err();
        assert_eq!(
            err,
            ExecutorError::GraceExceeded {
                grace: Duration::from_millis(50),
                stuck: vec!["task-1(stubborn)".into()],
            }
        );
        assert_eq!(rec.errors(), vec![TaskError::Canceled]);
        assert_eq!(ex.shutdown(true).await, Err(err));
    }

    #[tokio::test(start_paused = true)]
    async fn grace_overrun_still_waits_for_uncooperative_tasks() {
        let rec = Arc::new(Recorder::default());
        let ex = exec(
            Config {
                grace: Duration::from_millis(50),
                ..cfg(1, 4)
            },
            &rec,
        );
        ex.start().unwrap();
        ex.submit_boxed(sleepy(9, 300)).await.unwrap();

        let err = ex.shutdown(true).await.unwrap_err();
        assert!(matches!(err, ExecutorError::GraceExceeded { .. }));
        assert_eq!(rec.values(), vec![9]);
        assert!(rec.errors().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn abort_stuck_reports_aborted_tasks_as_canceled() {
        let rec = Arc::new(Recorder::default());
        let ex = exec(
            Config {
                grace: Duration::from_millis(50),
                abort_stuck: true,
                ..cfg(1, 4)
            },
            &rec,
        );
        let mut events = ex.events();
        ex.start().unwrap();
        let id = ex.submit_boxed(sleepy(9, 10_000)).await.unwrap();

        let err = ex.shutdown(true).await.unwrap_err();
        assert_eq!(
            err,
            ExecutorError::GraceExceeded {
                grace: Duration::from_millis(50),
                stuck: vec!["task-1(sleepy)".into()],
            }
        );
        assert!(rec.done.lock().unwrap().is_empty());
        assert_eq!(*rec.failed.lock().unwrap(), vec![(id, TaskError::Canceled)]);
        assert!(ex.in_flight().await.is_empty());

        let mut aborted = 0;
        while let Ok(ev) = events.try_recv() {
            if ev.kind == EventKind::TaskFailed && ev.task_id == Some(id.as_u64()) {
                aborted += 1;
            }
        }
        assert_eq!(aborted, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn config_timeout_applies_to_tasks_without_their_own() {
        let rec = Arc::new(Recorder::default());
        let ex = exec(
            Config {
                timeout: Duration::from_millis(20),
                ..cfg(1, 4)
            },
            &rec,
        );
        ex.start().unwrap();
        ex.submit_boxed(sleepy(1, 100)).await.unwrap();
        ex.submit_boxed(sleepy(2, 5)).await.unwrap();
        ex.shutdown(true).await.unwrap();

        assert_eq!(rec.values(), vec![2]);
        assert_eq!(
            rec.errors(),
            vec![TaskError::Timeout {
                timeout: Duration::from_millis(20)
            }]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn task_events_arrive_in_lifecycle_order() {
        let rec = Arc::new(Recorder::default());
        let ex = exec(cfg(1, 4), &rec);
        let mut events = ex.events();
        ex.start().unwrap();
        let id = ex.submit_boxed(quick(3)).await.unwrap();
        ex.shutdown(true).await.unwrap();

        let mut kinds = Vec::new();
        while let Ok(ev) = events.try_recv() {
            if ev.task_id == Some(id.as_u64()) {
                kinds.push(ev.kind);
            }
        }
        assert_eq!(
            kinds,
            vec![
                EventKind::TaskSubmitted,
                EventKind::TaskStarting,
                EventKind::TaskFailed
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn run_once_submits_a_single_batch() {
        let rec = Arc::new(Recorder::default());
        let ex = exec(cfg(2, 4), &rec);
        let passes = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&passes);
        let generator = GeneratorFn::new(move |_ctx: CancellationToken| {
            counter.fetch_add(1, Ordering::Relaxed);
            async move { (1..=5).map(|i| sleepy(i, 10)).collect::<Vec<_>>() }
        });

        ex.run(generator).await.unwrap();

        assert_eq!(passes.load(Ordering::Relaxed), 1);
        assert_eq!(rec.values(), vec![1, 2, 3, 4, 5]);
        assert_eq!(ex.state(), ExecutorState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn run_loop_repeats_until_shutdown() {
        let rec = Arc::new(Recorder::default());
        let ex = exec(
            Config {
                mode: DriveMode::Loop,
                ..cfg(2, 16)
            },
            &rec,
        );
        let passes = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&passes);
        let generator = GeneratorFn::new(move |_ctx: CancellationToken| {
            counter.fetch_add(1, Ordering::Relaxed);
            async move { vec![quick(1), quick(2)] }
        });

        let driver = {
            let ex = ex.clone();
            tokio::spawn(async move { ex.run(generator).await })
        };
        time::sleep(Duration::from_millis(55)).await;
        ex.shutdown(true).await.unwrap();
        driver.await.unwrap().unwrap();

        let n = passes.load(Ordering::Relaxed);
        assert!(n >= 5, "only {n} passes");
        assert_eq!(rec.done.lock().unwrap().len(), 2 * n);
    }
}
