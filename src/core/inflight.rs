//! # Tracker of tasks currently executing.
//!
//! [`InFlightTracker`] holds the tasks a worker is executing right now. Workers
//! record a task when they claim it and clear it as soon as `run` returns, so
//! the set does not depend on event delivery. The executor always owns one;
//! during shutdown it names the tasks still running when the grace period
//! runs out, and lists the tasks lost when stuck workers are aborted.

use std::collections::BTreeMap;

use tokio::sync::RwLock;

use crate::tasks::{TaskId, TaskInfo};

/// Thread-safe set of in-flight tasks keyed by task id.
#[derive(Default)]
pub struct InFlightTracker {
    running: RwLock<BTreeMap<TaskId, TaskInfo>>,
}

impl InFlightTracker {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a claimed task. Returns `false` if it was already tracked.
    pub async fn begin(&self, task: &TaskInfo) -> bool {
        self.running
            .write()
            .await
            .insert(task.id, task.clone())
            .is_none()
    }

    /// Clears a task whose `run` has returned. Returns `false` if unknown.
    pub async fn end(&self, id: TaskId) -> bool {
        self.running.write().await.remove(&id).is_some()
    }

    /// Returns `task-<id>(<name>)` labels ordered by id.
    pub async fn snapshot(&self) -> Vec<String> {
        self.running
            .read()
            .await
            .values()
            .map(ToString::to_string)
            .collect()
    }

    /// Empties the tracker, returning what was still running.
    pub(crate) async fn take_all(&self) -> Vec<TaskInfo> {
        std::mem::take(&mut *self.running.write().await)
            .into_values()
            .collect()
    }

    /// Number of tasks currently executing.
    pub async fn len(&self) -> usize {
        self.running.read().await.len()
    }

    /// True if no task is executing.
    pub async fn is_empty(&self) -> bool {
        self.running.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(id: u64) -> TaskInfo {
        TaskInfo::new(TaskId::new(id), "job")
    }

    #[tokio::test]
    async fn tracks_claim_and_return() {
        let t = InFlightTracker::new();
        assert!(t.begin(&info(2)).await);
        assert!(t.begin(&info(1)).await);
        assert!(!t.begin(&info(1)).await);
        assert_eq!(t.snapshot().await, vec!["task-1(job)", "task-2(job)"]);

        assert!(t.end(TaskId::new(1)).await);
        assert!(!t.end(TaskId::new(1)).await);
        assert_eq!(t.len().await, 1);
    }

    #[tokio::test]
    async fn take_all_empties_the_set() {
        let t = InFlightTracker::new();
        t.begin(&info(7)).await;
        t.begin(&info(3)).await;
        let ids: Vec<u64> = t.take_all().await.iter().map(|i| i.id.as_u64()).collect();
        assert_eq!(ids, vec![3, 7]);
        assert!(t.is_empty().await);
    }
}
