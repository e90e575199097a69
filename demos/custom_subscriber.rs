//! Plug a custom subscriber next to the built-in log writer.
//!
//! Counts failed builds and prints a tally on every recovery, showing how
//! the failure/recovery transition events pair up.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use reheat::{Config, Event, EventKind, LogWriter, RuntimeError, Subscribe, Supervisor};

struct FailureTally {
    failures: AtomicUsize,
}

#[async_trait]
impl Subscribe for FailureTally {
    async fn on_event(&self, ev: &Event) {
        match ev.kind {
            EventKind::BuildFailed => {
                self.failures.fetch_add(1, Ordering::Relaxed);
            }
            EventKind::BuildRecovered => {
                let n = self.failures.swap(0, Ordering::Relaxed);
                println!("[tally] recovered after {n} failed build(s)");
            }
            _ => {}
        }
    }

    fn name(&self) -> &'static str {
        "failure-tally"
    }
}

#[tokio::main]
async fn main() -> Result<(), RuntimeError> {
    let cfg = Config {
        immediate: true,
        ..Config::default()
    };

    let tally = Arc::new(FailureTally {
        failures: AtomicUsize::new(0),
    });

    Supervisor::new(cfg, vec![Arc::new(LogWriter), tally])
        .run(vec![])
        .await
}
