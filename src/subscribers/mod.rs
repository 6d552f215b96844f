//! # Event subscribers.
//!
//! ```text
//!   Executor / Supervisor / Workers ── publish(Event) ──► Bus
//!                                                          │
//!                                              executor listener
//!                                                          │
//!                                                   SubscriberSet::emit
//!                                                 ┌────────┴────────┐
//!                                                 ▼                 ▼
//!                                             LogWriter           custom
//! ```
//!
//! - **Passive subscribers** observe events (logging, metrics, alerts).
//! - **Stateful subscribers** maintain state from events (counters, gauges).
//!
//! ## Implementing a subscriber
//! ```no_run
//! use async_trait::async_trait;
//! use workvisor::{Event, EventKind, Subscribe};
//!
//! struct FailureCounter;
//!
//! #[async_trait]
//! impl Subscribe for FailureCounter {
//!     async fn on_event(&self, event: &Event) {
//!         if event.kind == EventKind::TaskFailed {
//!             // increment a counter
//!         }
//!     }
//!     fn name(&self) -> &'static str { "failures" }
//! }
//! ```

#[cfg(feature = "logging")]
mod log;
mod set;
mod subscriber;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscriber::Subscribe;
