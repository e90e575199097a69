//! # Build step: trait seam and the Go implementation.
//!
//! [`Build`] is the controller's seam to the compilation step. It must be
//! safe to call repeatedly; each call recompiles from the current source
//! state. The controller never inspects diagnostics — a failed build is a
//! [`BuildError`] whose output is forwarded to the operator verbatim.
//!
//! [`GoBuilder`] is the concrete implementation: it runs
//! `go build -o <bin>` in the working directory and captures stderr.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::BuildError;

/// Compiles source into a named binary in a working directory.
#[async_trait]
pub trait Build: Send + Sync + 'static {
    /// Runs one compile from the current source state.
    async fn build(&self) -> Result<(), BuildError>;

    /// Path of the binary a successful [`Build::build`] produces.
    fn binary_path(&self) -> PathBuf;
}

/// Builds a Go module with `go build -o <bin>`.
pub struct GoBuilder {
    dir: PathBuf,
    bin: String,
    tool: PathBuf,
}

impl GoBuilder {
    /// Creates a builder for the module at `dir` producing `bin`.
    pub fn new(dir: impl Into<PathBuf>, bin: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            bin: bin.into(),
            tool: PathBuf::from("go"),
        }
    }

    /// Overrides the compiler command (default: `go` from `PATH`).
    #[must_use]
    pub fn with_tool(mut self, tool: impl Into<PathBuf>) -> Self {
        self.tool = tool.into();
        self
    }

    /// The working directory the build runs in.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl Build for GoBuilder {
    async fn build(&self) -> Result<(), BuildError> {
        let output = Command::new(&self.tool)
            .arg("build")
            .arg("-o")
            .arg(&self.bin)
            .current_dir(&self.dir)
            .output()
            .await
            .map_err(|e| {
                BuildError::new(format!("failed to invoke {}: {e}", self.tool.display()))
            })?;

        if output.status.success() {
            Ok(())
        } else {
            Err(BuildError::new(
                String::from_utf8_lossy(&output.stderr).into_owned(),
            ))
        }
    }

    fn binary_path(&self) -> PathBuf {
        self.dir.join(&self.bin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_path_joins_dir_and_bin() {
        let b = GoBuilder::new("/srv/app", "gin-bin");
        assert_eq!(b.binary_path(), PathBuf::from("/srv/app/gin-bin"));
    }

    #[tokio::test]
    async fn test_missing_tool_reports_invocation_failure() {
        let dir = tempfile::tempdir().unwrap();
        let b = GoBuilder::new(dir.path(), "out").with_tool("/nonexistent/compiler");

        let err = b.build().await.unwrap_err();
        assert!(err.output.contains("failed to invoke"));
    }

    #[cfg(unix)]
    mod unix {
        use std::os::unix::fs::PermissionsExt;

        use super::*;

        // Writes a stand-in compiler script and returns its path.
        fn stub_tool(dir: &Path, body: &str) -> PathBuf {
            let path = dir.join("toolc");
            std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        #[tokio::test]
        async fn test_failed_build_surfaces_compiler_stderr() {
            let dir = tempfile::tempdir().unwrap();
            let tool = stub_tool(
                dir.path(),
                "echo 'main.go:3:6: undefined: handleIndex' >&2\nexit 1",
            );
            let b = GoBuilder::new(dir.path(), "out").with_tool(tool);

            let err = b.build().await.unwrap_err();
            assert!(err.output.contains("undefined: handleIndex"));
        }

        #[tokio::test]
        async fn test_successful_build_is_ok() {
            let dir = tempfile::tempdir().unwrap();
            let tool = stub_tool(dir.path(), "exit 0");
            let b = GoBuilder::new(dir.path(), "out").with_tool(tool);

            assert!(b.build().await.is_ok());
        }
    }
}
