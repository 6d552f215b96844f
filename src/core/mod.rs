//! Runtime core: queue, workers, supervision and the executor facade.
//!
//! The public API from this module is [`Executor`] (with its builder and
//! state), the [`OutcomeHandler`] seam and the [`TaskQueue`] it is built on.
//!
//! Internal modules:
//! - [`queue`]: bounded FIFO with backpressure and close semantics;
//! - [`runner`]: executes one task with timeout, panic capture and events;
//! - [`worker`]: dequeue-and-execute loop routing outcomes;
//! - [`inflight`]: tasks being executed right now, recorded by workers;
//! - [`supervisor`]: keeps the pool at size, reports crashes, joins on stop;
//! - [`executor`]: lifecycle state machine, submission, driving loop;
//! - [`shutdown`]: cross-platform termination signals.

mod builder;
mod executor;
mod handler;
mod inflight;
mod queue;
mod runner;
mod shutdown;
mod supervisor;
mod worker;

pub use builder::ExecutorBuilder;
pub use executor::{Executor, ExecutorState};
pub use handler::{NoopHandler, OutcomeHandler};
pub use inflight::InFlightTracker;
pub use queue::{PutError, TaskQueue};
pub use shutdown::wait_for_shutdown_signal;
pub use worker::WorkerId;
