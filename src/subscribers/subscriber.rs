//! # Event subscriber trait.
//!
//! [`Subscribe`] is the extension point for plugging custom event handlers
//! into the runtime. Each subscriber gets a dedicated worker task and a
//! bounded queue; a slow subscriber only affects its own queue, and panics
//! are caught by the worker (isolation).
//!
//! ## Example
//! ```rust
//! use async_trait::async_trait;
//! use reheat::{Event, EventKind, Subscribe};
//!
//! struct FailureCounter;
//!
//! #[async_trait]
//! impl Subscribe for FailureCounter {
//!     async fn on_event(&self, ev: &Event) {
//!         if matches!(ev.kind, EventKind::BuildFailed) {
//!             // increment a counter, push a metric, ...
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "failure-counter" }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Event subscriber for runtime observability.
///
/// ### Implementation requirements
/// - Use async I/O; avoid blocking the executor.
/// - Handle errors internally; do not panic (panics are caught and logged,
///   but the event is lost for this subscriber).
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Processes a single event.
    ///
    /// Called from the subscriber's dedicated worker task, never in the
    /// publisher's context. Events arrive in FIFO order per subscriber.
    async fn on_event(&self, event: &Event);

    /// Short name used when reporting overflow or panics for this subscriber.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Preferred queue capacity (clamped to ≥ 1). When the queue is full,
    /// new events are dropped for this subscriber only.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
