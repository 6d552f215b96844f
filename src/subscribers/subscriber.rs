//! # Event subscriber trait.
//!
//! Each subscriber gets a dedicated worker task fed by a bounded queue
//! (capacity via [`Subscribe::queue_capacity`]). A slow subscriber only fills
//! its own queue; on overflow the event is dropped for that subscriber alone
//! and a warning is logged. Panics inside `on_event` are caught.

use async_trait::async_trait;

use crate::events::Event;

/// Event subscriber for runtime observability.
///
/// ### Implementation requirements
/// - Use async I/O; avoid blocking the runtime.
/// - Handle errors internally.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Processes a single event. Events arrive in publish order (per subscriber).
    async fn on_event(&self, event: &Event);

    /// Subscriber name used in diagnostics.
    ///
    /// The default uses `type_name::<Self>()`; override with something short.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Preferred queue capacity (clamped to at least 1). Default: 1024.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
