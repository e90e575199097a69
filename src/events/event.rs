//! # Runtime events emitted by the controller, proxy and watch loop.
//!
//! [`EventKind`] classifies what happened; [`Event`] carries metadata
//! (timestamp, sequence number, optional path/reason payloads).
//!
//! ## Ordering
//! Each event gets a globally unique, monotonically increasing sequence
//! number (`seq`). Publish order on the bus matches `seq` order for a single
//! publisher; use `seq` to restore order when mixing publishers.
//!
//! ## Example
//! ```rust
//! use reheat::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::BuildFailed).with_reason("main.go:3: undefined: foo");
//! assert_eq!(ev.kind, EventKind::BuildFailed);
//! assert!(ev.reason.as_deref().unwrap().contains("undefined"));
//! ```

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Startup ===
    /// Proxy bound its listen address and is accepting connections.
    ///
    /// Sets `reason`: the bound address.
    ProxyStarted,

    // === Watch loop ===
    /// A matching source file changed (one event per debounced batch).
    ///
    /// Sets `path`: the changed file.
    FileChanged,

    // === Rebuild cycle ===
    /// A build attempt failed. Emitted on **every** failed attempt; each
    /// compile error is independently reported.
    ///
    /// Sets `reason`: compiler diagnostics.
    BuildFailed,

    /// First successful build after one or more failures. Emitted exactly
    /// once per failed→successful transition; repeated success is silent.
    BuildRecovered,

    /// Backend process started from a freshly built binary.
    ///
    /// Sets `path`: the binary.
    ProcessStarted,

    /// Backend process could not be started. Not retried; the next trigger
    /// retries naturally.
    ///
    /// Sets `reason`: the start error.
    ProcessStartFailed,

    /// Killing the previous backend process failed. The cycle proceeds; a
    /// dead process is an acceptable state.
    ///
    /// Sets `reason`: the kill error.
    KillFailed,

    // === Proxy data path ===
    /// The proxy exhausted its connect retries for one inbound connection.
    ///
    /// Sets `reason`: the last connect error.
    BackendUnreachable,

    // === Shutdown ===
    /// Terminal shutdown began (cancellation signal observed).
    ShutdownRequested,

    /// Proxy stopped accepting inbound connections.
    ///
    /// Sets `reason` when the close itself failed (logged only; the process
    /// is exiting regardless).
    ProxyClosed,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - `path`/`reason` are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// File or binary path, if applicable.
    pub path: Option<Arc<str>>,
    /// Human-readable reason (compiler output, I/O errors).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with the current timestamp and
    /// the next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            path: None,
            reason: None,
        }
    }

    /// Attaches a file or binary path.
    #[inline]
    pub fn with_path(mut self, path: impl Into<Arc<str>>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// True for kinds that report an operator-actionable failure.
    #[inline]
    pub fn is_failure(&self) -> bool {
        matches!(
            self.kind,
            EventKind::BuildFailed
                | EventKind::ProcessStartFailed
                | EventKind::KillFailed
                | EventKind::BackendUnreachable
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seq_is_monotonic() {
        let a = Event::new(EventKind::BuildFailed);
        let b = Event::new(EventKind::BuildRecovered);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_failure_classification() {
        assert!(Event::new(EventKind::BuildFailed).is_failure());
        assert!(Event::new(EventKind::KillFailed).is_failure());
        assert!(!Event::new(EventKind::BuildRecovered).is_failure());
        assert!(!Event::new(EventKind::ProxyStarted).is_failure());
    }
}
