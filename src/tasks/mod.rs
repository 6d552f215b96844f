//! # Task abstractions.
//!
//! - [`Task`] - trait for async, cancelable units of work producing a value
//! - [`TaskFn`] - closure-backed task
//! - [`BoxTask`] - owned, type-erased task as stored in the queue
//! - [`TaskId`], [`TaskInfo`] - identity handed to outcome callbacks
//! - [`TaskGenerator`], [`GeneratorFn`] - batch producers for the driving loop

mod generator;
mod task;
mod task_fn;

pub use generator::{GeneratorFn, TaskGenerator};
pub use task::{BoxTask, Task, TaskId, TaskInfo};
pub use task_fn::TaskFn;
