//! Runtime core: rebuild-restart orchestration and lifecycle.
//!
//! Internal modules:
//! - [`controller`]: serializes kill→build→restart cycles, tracks build
//!   failure transitions, performs terminal shutdown;
//! - [`supervisor`]: wires config, builder, runner, proxy, watcher and the
//!   subscriber listener together and drives the process lifetime;
//! - [`shutdown`]: cross-platform termination signal handling.

mod controller;
mod shutdown;
mod supervisor;

pub use controller::{Controller, SETTLE_DELAY};
pub use supervisor::Supervisor;
