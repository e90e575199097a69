//! # Controller: serialized kill→build→restart cycles.
//!
//! The [`Controller`] owns the builder, the runner and the proxy, and funnels
//! every rebuild request — watcher callbacks, the eager startup call, timers,
//! anything — through a single async mutex. That one lock is the whole
//! concurrency story:
//!
//! - at most one build/restart sequence is in flight;
//! - cycles triggered concurrently are fully serialized (order among waiters
//!   is whatever the mutex gives us, not FIFO — only exclusion is promised);
//! - shutdown waits for the in-flight cycle, then wins the lock and
//!   terminates.
//!
//! ## Cycle
//! ```text
//! trigger() ─ lock ─► kill old process ─► build ─┬─ ok ──► start new process ─► settle ─ unlock
//!                     (error: report,            │
//!                      keep going)               └─ err ─► report, keep error ─► settle ─ unlock
//! ```
//!
//! A failed build skips the restart: there is nothing new to run, and the
//! previous binary is presumed unsound because its sources changed. The
//! failure is retained so the first success afterwards can be reported as a
//! recovery — once, not on every quiet success.
//!
//! ## State machine
//! Idle → Killing → Building → (Failed | Restarting) → Idle, with Terminated
//! reachable from Idle via [`Controller::shutdown`]. Terminated is absorbing:
//! a trigger arriving after shutdown is a no-op.
//!
//! `trigger` and `shutdown` return nothing and never fail — they are
//! fire-and-forget notification handlers; every collaborator error is
//! converted to an [`Event`] on the bus.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time;

use crate::build::Build;
use crate::error::BuildError;
use crate::events::{Bus, Event, EventKind};
use crate::process::Run;
use crate::proxy::Proxy;

/// Delay between starting the fresh process and releasing the cycle lock.
///
/// This is a synchronization device, not an incidental pause: it gives the
/// new process time to bind its listening port before a proxied request can
/// reach it and before a subsequent trigger is allowed to kill it again. A
/// future redesign could replace it with an explicit readiness probe.
pub const SETTLE_DELAY: Duration = Duration::from_millis(100);

/// State protected by the cycle lock.
struct CycleState {
    /// Error from the most recent failed build; `None` while builds succeed.
    /// The transition `Some → None` is the one-time "recovered" report.
    last_build_error: Option<BuildError>,
    /// Set by [`Controller::shutdown`]; absorbing.
    terminated: bool,
}

/// Serializes rebuild-restart cycles and coordinates teardown.
///
/// Owns its collaborators for their full lifetime: created once at startup,
/// finished by [`Controller::shutdown`].
pub struct Controller {
    builder: Arc<dyn Build>,
    runner: Arc<dyn Run>,
    proxy: Proxy,
    args: Vec<String>,
    bus: Bus,
    settle: Duration,
    state: Mutex<CycleState>,
}

impl Controller {
    /// Creates a controller over the given collaborators.
    ///
    /// `args` are passed to every started backend process.
    pub fn new(
        builder: Arc<dyn Build>,
        runner: Arc<dyn Run>,
        proxy: Proxy,
        args: Vec<String>,
        bus: Bus,
    ) -> Self {
        Self {
            builder,
            runner,
            proxy,
            args,
            bus,
            settle: SETTLE_DELAY,
            state: Mutex::new(CycleState {
                last_build_error: None,
                terminated: false,
            }),
        }
    }

    /// Overrides the settle delay (tests shorten it).
    #[must_use]
    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    /// Runs one kill→build→restart cycle.
    ///
    /// Safe to call concurrently and arbitrarily often from any context;
    /// callers block until their cycle has run (or until the terminated
    /// no-op check). All failures surface as events, never as return values.
    pub async fn trigger(&self) {
        self.cycle(true).await;
    }

    /// Startup validation cycle: kill → build, with the same serialization
    /// and failure bookkeeping as [`Controller::trigger`], but without
    /// starting the backend.
    ///
    /// The supervisor runs this eagerly at startup when the backend should
    /// not start until the first change; the build always happens right
    /// away either way, so a broken tree is reported before anyone waits on
    /// a file save.
    pub async fn prime(&self) {
        self.cycle(false).await;
    }

    async fn cycle(&self, start_backend: bool) {
        let mut state = self.state.lock().await;
        if state.terminated {
            return;
        }

        // A kill error does not abort the sequence: a dead process is an
        // acceptable state, and the build must still produce a fresh binary.
        if let Err(e) = self.runner.kill().await {
            self.bus
                .publish(Event::new(EventKind::KillFailed).with_reason(e.to_string()));
        }

        match self.builder.build().await {
            Err(err) => {
                // every failed attempt is reported; the operator needs to
                // see each compile error
                self.bus
                    .publish(Event::new(EventKind::BuildFailed).with_reason(err.output.clone()));
                state.last_build_error = Some(err);
            }
            Ok(()) => {
                if state.last_build_error.take().is_some() {
                    self.bus.publish(Event::new(EventKind::BuildRecovered));
                }

                if start_backend {
                    let binary = self.builder.binary_path();
                    match self.runner.start(&binary, &self.args).await {
                        Ok(()) => self.bus.publish(
                            Event::new(EventKind::ProcessStarted)
                                .with_path(binary.display().to_string()),
                        ),
                        // no retry here; the next file change retries naturally
                        Err(e) => self.bus.publish(
                            Event::new(EventKind::ProcessStartFailed).with_reason(e.to_string()),
                        ),
                    }
                }
            }
        }

        // Let the fresh process bind its port before the lock is released
        // (applies on the failure path too, which keeps cycle pacing uniform).
        time::sleep(self.settle).await;
        // lock released by guard scope on every path
    }

    /// Terminal teardown: kills the backend and closes the proxy.
    ///
    /// Waits for any in-flight cycle to finish first (same lock as
    /// [`Controller::trigger`]). Shutdown is terminal — the precondition is
    /// that no further operations follow it; calling it again, or triggering
    /// afterwards, is an observable no-op rather than an error.
    pub async fn shutdown(&self) {
        let mut state = self.state.lock().await;
        if state.terminated {
            return;
        }
        state.terminated = true;

        self.bus.publish(Event::new(EventKind::ShutdownRequested));

        if let Err(e) = self.runner.kill().await {
            self.bus
                .publish(Event::new(EventKind::KillFailed).with_reason(e.to_string()));
        }

        // best-effort: the process is exiting, a close failure is log-only
        match self.proxy.close().await {
            Ok(()) => self.bus.publish(Event::new(EventKind::ProxyClosed)),
            Err(e) => self
                .bus
                .publish(Event::new(EventKind::ProxyClosed).with_reason(e.to_string())),
        }
    }
}
