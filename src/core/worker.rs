//! # Worker: dequeue-and-execute loop.
//!
//! ```text
//! loop {
//!   ├─► stop set?
//!   │     ├─ drain: try_get() ─► task? run it : exit
//!   │     └─ no drain: exit
//!   ├─► get(poll) (races stop.cancelled())
//!   │     └─ None ─► continue (re-check stop)
//!   ├─► publish TaskStarting, tracker.begin()
//!   ├─► run_once(), tracker.end()
//!   │     ├ Ok(v) ─► task.on_done(&v) ─► handler.on_task_done(v)
//!   │     └ Err(e) ─► task.on_fail(&e) ─► handler.on_task_fail(e)
//!   └─► progress += 1
//! }
//! publish WorkerExited
//! ```
//!
//! ## Rules
//! - A claimed task always runs to completion; stop is only checked between tasks
//! - Task errors (including panics) never leave [`run_once`]
//! - A panic in an outcome hook or handler kills the worker; the supervisor
//!   treats that as a crash and replaces it

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::select;
use tokio_util::sync::CancellationToken;

use crate::core::handler::OutcomeHandler;
use crate::core::inflight::InFlightTracker;
use crate::core::queue::TaskQueue;
use crate::core::runner::run_once;
use crate::events::{Bus, Event, EventKind};
use crate::tasks::{BoxTask, TaskInfo};

/// Identity of a worker within one executor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkerId(u64);

impl WorkerId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw numeric id (as carried by events).
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "worker-{}", self.0)
    }
}

/// A submitted task together with its identity.
pub(crate) struct Job<O> {
    pub info: TaskInfo,
    pub task: BoxTask<O>,
}

/// Everything a worker needs besides its tokens.
pub(crate) struct Worker<O: Send + 'static> {
    pub id: WorkerId,
    pub queue: Arc<TaskQueue<Job<O>>>,
    pub handler: Arc<dyn OutcomeHandler<O>>,
    pub bus: Bus,
    pub tracker: Arc<InFlightTracker>,
    /// Bumped after every routed outcome; the supervisor reads it as a health signal.
    pub progress: Arc<AtomicU64>,
    pub poll: Duration,
    pub default_timeout: Option<Duration>,
    pub drain: bool,
}

impl<O: Send + 'static> Worker<O> {
    /// Runs until `stop` is cancelled and (with `drain`) the queue is empty.
    ///
    /// `cancel` is the parent of every task token; it fires when the
    /// shutdown grace period runs out.
    pub async fn run(self, stop: CancellationToken, cancel: CancellationToken) {
        loop {
            let job = if stop.is_cancelled() {
                if !self.drain {
                    break;
                }
                match self.queue.try_get() {
                    Some(job) => job,
                    None => break,
                }
            } else {
                select! {
                    biased;
                    next = self.queue.get(self.poll) => match next {
                        Some(job) => job,
                        None => continue,
                    },
                    _ = stop.cancelled() => continue,
                }
            };
            self.execute(job, &cancel).await;
        }
        self.bus
            .publish(Event::new(EventKind::WorkerExited).with_worker(self.id.as_u64()));
    }

    async fn execute(&self, job: Job<O>, cancel: &CancellationToken) {
        let Job { info, task } = job;
        self.bus.publish(
            Event::new(EventKind::TaskStarting)
                .with_task(info.name.clone())
                .with_task_id(info.id.as_u64())
                .with_worker(self.id.as_u64()),
        );

        self.tracker.begin(&info).await;
        let timeout = task.timeout().or(self.default_timeout);
        let outcome = run_once(task.as_ref(), &info, self.id, cancel, timeout, &self.bus).await;
        self.tracker.end(info.id).await;
        match outcome {
            Ok(value) => {
                task.on_done(&value);
                self.handler.on_task_done(&info, value).await;
            }
            Err(err) => {
                task.on_fail(&err);
                self.handler.on_task_fail(&info, err).await;
            }
        }
        self.progress.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TaskError;
    use crate::tasks::{TaskFn, TaskId};
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Collect {
        done: Mutex<Vec<u32>>,
        failed: Mutex<Vec<TaskError>>,
    }

    #[async_trait]
    impl OutcomeHandler<u32> for Collect {
        async fn on_task_done(&self, _task: &TaskInfo, result: u32) {
            self.done.lock().unwrap().push(result);
        }
        async fn on_task_fail(&self, _task: &TaskInfo, error: TaskError) {
            self.failed.lock().unwrap().push(error);
        }
    }

    fn job(id: u64, value: u32) -> Job<u32> {
        Job {
            info: TaskInfo::new(TaskId::new(id), "job"),
            task: TaskFn::boxed("job", move |_ctx: CancellationToken| async move {
                if value == 0 {
                    Err(TaskError::fail("zero"))
                } else {
                    Ok(value)
                }
            }),
        }
    }

    fn worker(queue: Arc<TaskQueue<Job<u32>>>, handler: Arc<Collect>, drain: bool) -> Worker<u32> {
        Worker {
            id: WorkerId::new(1),
            queue,
            handler,
            bus: Bus::new(64),
            tracker: Arc::new(InFlightTracker::new()),
            progress: Arc::new(AtomicU64::new(0)),
            poll: Duration::from_millis(10),
            default_timeout: None,
            drain,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn drains_queue_after_stop() {
        let queue = Arc::new(TaskQueue::new(Some(8)));
        for (id, v) in [(1, 3), (2, 0), (3, 5)] {
            queue.try_put(job(id, v)).unwrap();
        }
        let handler = Arc::new(Collect::default());
        let w = worker(Arc::clone(&queue), Arc::clone(&handler), true);
        let progress = Arc::clone(&w.progress);

        let stop = CancellationToken::new();
        stop.cancel();
        w.run(stop, CancellationToken::new()).await;

        assert_eq!(*handler.done.lock().unwrap(), vec![3, 5]);
        assert_eq!(*handler.failed.lock().unwrap(), vec![TaskError::fail("zero")]);
        assert_eq!(progress.load(Ordering::Relaxed), 3);
        assert!(queue.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn without_drain_exits_leaving_queue_untouched() {
        let queue = Arc::new(TaskQueue::new(Some(8)));
        queue.try_put(job(1, 1)).unwrap();
        let handler = Arc::new(Collect::default());

        let stop = CancellationToken::new();
        stop.cancel();
        worker(Arc::clone(&queue), Arc::clone(&handler), false)
            .run(stop, CancellationToken::new())
            .await;

        assert!(handler.done.lock().unwrap().is_empty());
        assert_eq!(queue.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn idles_until_work_arrives_then_stops_on_signal() {
        let queue = Arc::new(TaskQueue::new(Some(8)));
        let handler = Arc::new(Collect::default());
        let stop = CancellationToken::new();
        let handle = tokio::spawn(
            worker(Arc::clone(&queue), Arc::clone(&handler), true)
                .run(stop.clone(), CancellationToken::new()),
        );

        tokio::time::sleep(Duration::from_millis(35)).await;
        queue.put(job(9, 42)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(*handler.done.lock().unwrap(), vec![42]);

        stop.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn records_running_task_without_a_bus_listener() {
        let queue = Arc::new(TaskQueue::new(Some(8)));
        queue
            .try_put(Job {
                info: TaskInfo::new(TaskId::new(5), "slow"),
                task: TaskFn::boxed("slow", |_ctx: CancellationToken| async {
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    Ok::<_, TaskError>(1)
                }),
            })
            .unwrap();
        let w = worker(Arc::clone(&queue), Arc::new(Collect::default()), true);
        let tracker = Arc::clone(&w.tracker);

        let stop = CancellationToken::new();
        let handle = tokio::spawn(w.run(stop.clone(), CancellationToken::new()));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(tracker.snapshot().await, vec!["task-5(slow)"]);

        stop.cancel();
        handle.await.unwrap();
        assert!(tracker.is_empty().await);
    }

    #[test]
    fn worker_id_display() {
        assert_eq!(WorkerId::new(3).to_string(), "worker-3");
    }
}
