//! # Function-backed task (`TaskFn`)
//!
//! [`TaskFn`] wraps a closure `F: Fn(CancellationToken) -> Fut`, producing a
//! fresh future per run. Shared state must be captured explicitly (`Arc<...>`).
//!
//! ## Example
//! ```rust
//! use tokio_util::sync::CancellationToken;
//! use workvisor::{BoxTask, TaskFn, TaskError};
//!
//! let t: BoxTask<u64> = TaskFn::boxed("answer", |_ctx: CancellationToken| async move {
//!     Ok::<_, TaskError>(42)
//! });
//! assert_eq!(t.name(), "answer");
//! ```

use std::borrow::Cow;
use std::future::Future;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;
use crate::tasks::task::{BoxTask, Task};

/// Function-backed task implementation.
#[derive(Debug)]
pub struct TaskFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> TaskFn<F> {
    /// Creates a new function-backed task.
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F, Fut, O> TaskFn<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<O, TaskError>> + Send + 'static,
    O: Send + 'static,
{
    /// Creates the task and returns it boxed, ready for submission or a generator batch.
    pub fn boxed(name: impl Into<Cow<'static, str>>, f: F) -> BoxTask<O> {
        Box::new(Self::new(name, f))
    }
}

#[async_trait]
impl<F, Fut, O> Task for TaskFn<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<O, TaskError>> + Send + 'static,
    O: Send + 'static,
{
    type Output = O;

    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, ctx: CancellationToken) -> Result<O, TaskError> {
        (self.f)(ctx).await
    }
}
