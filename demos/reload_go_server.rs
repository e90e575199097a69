//! Supervise a Go web server in the current directory.
//!
//! ```bash
//! cargo run --example reload_go_server
//! ```
//!
//! Then point a client at http://127.0.0.1:8081 and edit any .go file; the
//! server is rebuilt and restarted behind the proxy on every save. The
//! backend reads its own port from the PORT environment variable (8080 by
//! default).

use std::sync::Arc;

use reheat::{Config, LogWriter, RuntimeError, Supervisor};

#[tokio::main]
async fn main() -> Result<(), RuntimeError> {
    let cfg = Config {
        immediate: true,
        ..Config::default()
    };

    Supervisor::new(cfg, vec![Arc::new(LogWriter)])
        .run(std::env::args().skip(1).collect())
        .await
}
