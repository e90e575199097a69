//! # reheat
//!
//! **Reheat** is a live-reload supervisor for a locally running network
//! service: it watches source files, rebuilds the service on change,
//! restarts the running process, and fronts it with a TCP reverse proxy so
//! clients connect to a stable address while the backend is repeatedly
//! rebuilt and restarted.
//!
//! ## Architecture
//! ```text
//!   client ──► Proxy (cfg.port) ─────────────────► backend (cfg.app)
//!                                                       ▲
//!                                                 start │ kill
//!                                                       │
//!   sources ──► Watcher ── trigger ──► Controller ──────┤
//!                  │                    │  │            │
//!            (notify, debounce)   (one mutex,       GoBuilder
//!                                  serialized       (go build -o bin)
//!                                  cycles)
//!                  │                    │
//!                  └──── Event ───► Bus ───► listener ───► SubscriberSet
//!                                                            │
//!                                                        LogWriter / custom
//! ```
//!
//! ### Lifecycle
//! ```text
//! Supervisor::run(args)
//!   ├─► Config::set_defaults()          (fatal on unresolvable cwd)
//!   ├─► Proxy::run()                    (fatal on bind failure)
//!   ├─► Controller::new(builder, runner, proxy)
//!   ├─► initial cycle                   (always builds; starts the backend
//!   │                                    too when cfg.immediate)
//!   ├─► Watcher::watch(patterns, ..)    (each change → trigger)
//!   └─► wait_for_shutdown_signal()
//!         ├─► controller.shutdown()     (terminal: kill + proxy close)
//!         └─► drain subscribers         (terminal events reach every
//!                                        subscriber before run returns)
//! ```
//!
//! Every rebuild request funnels through the controller's single mutex:
//! kill → build → restart never interleaves across triggers, a failed build
//! skips the restart and is reported on every attempt, and the first success
//! after failures is reported exactly once as a recovery.
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use reheat::{Config, LogWriter, Supervisor};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), reheat::RuntimeError> {
//!     let cfg = Config {
//!         immediate: true,
//!         ..Config::default()
//!     };
//!     // watches *.go up to two levels deep, rebuilds with `go build`,
//!     // restarts the binary, proxies :8081 → :8080
//!     Supervisor::new(cfg, vec![Arc::new(LogWriter)])
//!         .run(vec![])
//!         .await
//! }
//! ```

mod build;
mod config;
mod core;
mod error;
mod events;
mod process;
mod proxy;
mod subscribers;
mod watch;

// ---- Public re-exports ----

pub use crate::build::{Build, GoBuilder};
pub use crate::config::Config;
pub use crate::core::{Controller, Supervisor, SETTLE_DELAY};
pub use crate::error::{BuildError, RuntimeError};
pub use crate::events::{Bus, Event, EventKind};
pub use crate::process::{ProcessRunner, Run};
pub use crate::proxy::{Proxy, ProxyConfig, RetryPolicy};
pub use crate::subscribers::{LogWriter, Subscribe, SubscriberSet};
pub use crate::watch::{default_patterns, Pattern, Watcher, DEBOUNCE};
