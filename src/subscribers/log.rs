//! # Simple logging subscriber.
//!
//! [`LogWriter`] prints one human-readable line per event to stdout. This is
//! the default operator sink; implement [`Subscribe`] for structured logging
//! or metrics.
//!
//! ## Output format
//! ```text
//! [proxy] listening on 127.0.0.1:8081
//! [change] src/handlers.go
//! [build-failed] main.go:12: undefined: foo
//! [build-ok] recovered
//! [started] ./gin-bin
//! [shutdown] closing the proxy
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::Subscribe;

/// Stdout logging subscriber.
pub struct LogWriter;

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        match e.kind {
            EventKind::ProxyStarted => {
                if let Some(addr) = &e.reason {
                    println!("[proxy] listening on {addr}");
                }
            }
            EventKind::FileChanged => {
                if let Some(path) = &e.path {
                    println!("[change] {path}");
                }
            }
            EventKind::BuildFailed => {
                let out = e.reason.as_deref().unwrap_or("(no compiler output)");
                println!("[build-failed] {}", out.trim_end());
            }
            EventKind::BuildRecovered => {
                println!("[build-ok] recovered");
            }
            EventKind::ProcessStarted => {
                if let Some(bin) = &e.path {
                    println!("[started] {bin}");
                }
            }
            EventKind::ProcessStartFailed => {
                println!(
                    "[start-failed] {}",
                    e.reason.as_deref().unwrap_or("unknown")
                );
            }
            EventKind::KillFailed => {
                println!("[kill-failed] {}", e.reason.as_deref().unwrap_or("unknown"));
            }
            EventKind::BackendUnreachable => {
                println!(
                    "[backend-unreachable] {}",
                    e.reason.as_deref().unwrap_or("unknown")
                );
            }
            EventKind::ShutdownRequested => {
                println!("[shutdown] closing the proxy");
            }
            EventKind::ProxyClosed => match &e.reason {
                Some(err) => println!("[proxy-closed] close error: {err}"),
                None => println!("[proxy-closed]"),
            },
        }
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
