//! # Process runner: child lifecycle for the supervised backend.
//!
//! [`Run`] is the controller's seam to the process lifecycle. The contract
//! the controller relies on:
//!
//! - `kill()` with nothing running is a no-op returning `Ok(())`;
//! - `start()` replaces whatever handle is held (the controller always kills
//!   before it starts, so at most one child is alive).
//!
//! [`ProcessRunner`] spawns the binary with inherited stdio (the backend's
//! output interleaves with the operator log, same terminal) and the
//! configured environment — notably `PORT`, which tells the backend which
//! port to bind.

use std::io;
use std::path::Path;

use async_trait::async_trait;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;

/// Manages a child process lifecycle: start, kill.
#[async_trait]
pub trait Run: Send + Sync + 'static {
    /// Spawns `binary` with `args`. Any previously held handle is replaced.
    async fn start(&self, binary: &Path, args: &[String]) -> io::Result<()>;

    /// Kills the running process, if any. Killing nothing is a no-op.
    async fn kill(&self) -> io::Result<()>;
}

/// Runs the supervised backend as a child process.
pub struct ProcessRunner {
    env: Vec<(String, String)>,
    child: Mutex<Option<Child>>,
}

impl ProcessRunner {
    /// Creates a runner; `env` entries are set on every spawned child.
    pub fn new(env: Vec<(String, String)>) -> Self {
        Self {
            env,
            child: Mutex::new(None),
        }
    }
}

#[async_trait]
impl Run for ProcessRunner {
    async fn start(&self, binary: &Path, args: &[String]) -> io::Result<()> {
        let mut cmd = Command::new(binary);
        cmd.args(args);
        for (key, value) in &self.env {
            cmd.env(key, value);
        }

        let child = cmd.spawn()?;
        *self.child.lock().await = Some(child);
        Ok(())
    }

    async fn kill(&self) -> io::Result<()> {
        let mut slot = self.child.lock().await;
        match slot.take() {
            Some(mut child) => child.kill().await,
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[tokio::test]
    async fn test_kill_without_running_process_is_noop() {
        let runner = ProcessRunner::new(vec![]);
        assert!(runner.kill().await.is_ok());
        assert!(runner.kill().await.is_ok());
    }

    #[tokio::test]
    async fn test_start_missing_binary_fails() {
        let runner = ProcessRunner::new(vec![]);
        let missing = PathBuf::from("/nonexistent/reheat-test-binary");
        assert!(runner.start(&missing, &[]).await.is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_start_then_kill() {
        let runner = ProcessRunner::new(vec![("PORT".to_string(), "8080".to_string())]);
        runner
            .start(Path::new("sleep"), &["5".to_string()])
            .await
            .unwrap();
        assert!(runner.kill().await.is_ok());
        // handle is gone; a second kill is the no-op path again
        assert!(runner.kill().await.is_ok());
    }
}
