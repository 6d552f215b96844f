//! Runtime events: types and broadcast bus.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Executor` (lifecycle, submissions, generator passes),
//!   `Supervisor` (worker lifecycle, grace), `Worker` and `runner::run_once`
//!   (task lifecycle).
//! - **Consumers**: the executor's listener (fans out to `SubscriberSet`) and any
//!   receiver from [`Executor::events`](crate::Executor::events).

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
