//! Runtime events: types and broadcast bus.
//!
//! The event **data model** and the **bus** used to publish/subscribe to
//! events emitted by the controller, the proxy, and the watch loop. Events
//! are the only channel through which recoverable failures become visible to
//! the operator; no collaborator error escapes as a return value once the
//! watch loop is running.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] — classification and payload metadata
//! - [`Bus`] — thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Controller` (build/kill/start transitions), `Proxy`
//!   (backend reachability), `Supervisor` (proxy startup, file changes).
//! - **Consumers**: the supervisor's listener task, which fans events out to
//!   the [`SubscriberSet`](crate::SubscriberSet).

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
