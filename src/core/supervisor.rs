//! # Supervisor: wires the components together and drives the lifetime.
//!
//! [`Supervisor::run`] is the whole program in one method:
//!
//! ```text
//! set_defaults ─► proxy.run ─► Controller ─► first cycle ─► watcher armed
//!                                                                │
//!                    signal ◄───────────────────────────────────┘
//!                       │
//!                       └──► controller.shutdown()  (terminal)
//! ```
//!
//! The first cycle always builds; `cfg.immediate` decides whether it also
//! starts the backend, or leaves the start to the first file change.
//!
//! The supervisor also runs the subscriber listener: one task that receives
//! every bus event and fans it out to the [`SubscriberSet`].
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use reheat::{Config, LogWriter, Supervisor};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), reheat::RuntimeError> {
//!     let cfg = Config { immediate: true, ..Config::default() };
//!     Supervisor::new(cfg, vec![Arc::new(LogWriter)])
//!         .run(vec![])
//!         .await
//! }
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::broadcast;

use crate::build::GoBuilder;
use crate::config::Config;
use crate::core::controller::Controller;
use crate::core::shutdown;
use crate::error::RuntimeError;
use crate::events::{Bus, Event, EventKind};
use crate::process::ProcessRunner;
use crate::proxy::{Proxy, ProxyConfig};
use crate::subscribers::{Subscribe, SubscriberSet};
use crate::watch::{default_patterns, Pattern, Watcher};

/// Bus ring-buffer size; plenty for a single rebuild pipeline.
const BUS_CAPACITY: usize = 256;

/// Owns configuration, the event bus and the subscriber list; builds and
/// runs the whole live-reload pipeline.
pub struct Supervisor {
    cfg: Config,
    bus: Bus,
    subscribers: Vec<Arc<dyn Subscribe>>,
    patterns: Vec<Pattern>,
}

impl Supervisor {
    /// Creates a supervisor with the given config and subscribers.
    pub fn new(cfg: Config, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        Self {
            cfg,
            bus: Bus::new(BUS_CAPACITY),
            subscribers,
            patterns: default_patterns(),
        }
    }

    /// Overrides the watch patterns (default: Go sources up to two
    /// directories deep).
    #[must_use]
    pub fn with_patterns(mut self, patterns: Vec<Pattern>) -> Self {
        self.patterns = patterns;
        self
    }

    /// The event bus; subscribe here for ad-hoc listeners beyond the
    /// [`Subscribe`] set.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Runs until a termination signal arrives, then tears down.
    ///
    /// `args` are passed to every started backend process. Errors returned
    /// here are the fatal startup kind: unresolvable working directory,
    /// proxy bind failure, watcher installation failure. Once the watch
    /// loop is armed, failures only surface as events.
    pub async fn run(mut self, args: Vec<String>) -> Result<(), RuntimeError> {
        self.cfg.set_defaults()?;

        let subs = Arc::new(SubscriberSet::new(std::mem::take(&mut self.subscribers)));
        let listener = self.subscriber_listener(Arc::clone(&subs));

        let builder = Arc::new(GoBuilder::new(self.cfg.path.clone(), self.cfg.bin.clone()));
        // the child learns its port from the environment
        let runner = Arc::new(ProcessRunner::new(vec![(
            "PORT".to_string(),
            self.cfg.app.to_string(),
        )]));

        let proxy = Proxy::new(self.bus.clone());
        let addr = proxy
            .run(&ProxyConfig {
                port: self.cfg.port,
                backend: self.cfg.backend_addr(),
            })
            .await?;
        self.bus
            .publish(Event::new(EventKind::ProxyStarted).with_reason(addr.to_string()));

        let controller = Arc::new(Controller::new(
            builder,
            runner,
            proxy,
            args,
            self.bus.clone(),
        ));

        // eager first cycle, synchronously, before the watcher is armed;
        // a broken tree is reported before anyone waits on a file save
        if self.cfg.immediate {
            controller.trigger().await;
        } else {
            controller.prime().await;
        }

        self.arm_watcher(Arc::clone(&controller))?;

        // registration failures are treated as an immediate shutdown request;
        // there is no safe way to keep running without a cancellation source
        let _ = shutdown::wait_for_shutdown_signal().await;
        controller.shutdown().await;

        // shutdown publishes ProxyClosed last; once the listener has fanned
        // it out we can drain the per-subscriber queues and return
        let _ = listener.await;
        if let Ok(set) = Arc::try_unwrap(subs) {
            set.join().await;
        }
        Ok(())
    }

    /// Forwards every bus event to the subscriber set. The task ends after
    /// fanning out [`EventKind::ProxyClosed`], the last event a shutdown
    /// publishes, so the caller can await it and then drain the set.
    fn subscriber_listener(&self, subs: Arc<SubscriberSet>) -> tokio::task::JoinHandle<()> {
        let mut rx = self.bus.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(ev) => {
                        let terminal = ev.kind == EventKind::ProxyClosed;
                        subs.emit(&ev);
                        if terminal {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    /// Starts the watcher; every debounced matching change publishes
    /// [`EventKind::FileChanged`] and triggers a cycle.
    fn arm_watcher(&self, controller: Arc<Controller>) -> Result<(), RuntimeError> {
        let bus = self.bus.clone();
        Watcher::new(self.cfg.path.clone()).watch(self.patterns.clone(), move |path: PathBuf| {
            let bus = bus.clone();
            let controller = Arc::clone(&controller);
            async move {
                bus.publish(
                    Event::new(EventKind::FileChanged).with_path(path.display().to_string()),
                );
                controller.trigger().await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;

    struct Counter {
        seen: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Subscribe for Counter {
        async fn on_event(&self, _ev: &Event) {
            self.seen.fetch_add(1, Ordering::SeqCst);
        }

        fn name(&self) -> &'static str {
            "counter"
        }
    }

    #[tokio::test]
    async fn test_terminal_events_reach_subscribers_before_drain_completes() {
        let seen = Arc::new(AtomicUsize::new(0));
        let sup = Supervisor::new(Config::default(), vec![]);
        let subs = Arc::new(SubscriberSet::new(vec![Arc::new(Counter {
            seen: Arc::clone(&seen),
        })]));
        let listener = sup.subscriber_listener(Arc::clone(&subs));

        sup.bus.publish(Event::new(EventKind::ShutdownRequested));
        sup.bus.publish(Event::new(EventKind::ProxyClosed));

        // the listener ends on ProxyClosed and releases its set handle
        listener.await.unwrap();
        let set = Arc::try_unwrap(subs).unwrap_or_else(|_| panic!("set still shared"));
        set.join().await;

        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }
}
