//! Error types used by the reheat runtime.
//!
//! Two families:
//!
//! - [`RuntimeError`] — unrecoverable startup errors. Nothing runs after one
//!   of these; `Supervisor::run` returns it and the process is expected to
//!   exit.
//! - [`BuildError`] — a failed compile. Recoverable by design: the error is
//!   retained by the controller, reported on every occurrence, and blocks the
//!   restart for that cycle only.
//!
//! Process kill/start errors stay `std::io::Error` at the collaborator
//! boundary and are converted to events at the controller; they are never
//! returned to callers.

use std::path::PathBuf;

use thiserror::Error;

/// # Fatal startup errors.
///
/// Everything here terminates the supervisor before (or while) the system is
/// being wired up. Once the watch loop is running, no collaborator failure is
/// escalated to a `RuntimeError`.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// The working directory could not be resolved while filling config defaults.
    #[error("working directory unavailable: {source}")]
    WorkingDir {
        /// Underlying I/O error from `current_dir`.
        #[source]
        source: std::io::Error,
    },

    /// The reverse proxy failed to bind its listen address.
    #[error("proxy failed to bind {addr}: {source}")]
    ProxyBind {
        /// The address that could not be bound.
        addr: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file watcher could not be installed on the working directory.
    #[error("failed to watch {path:?}: {source}")]
    Watch {
        /// The directory that could not be watched.
        path: PathBuf,
        /// Underlying watcher error.
        #[source]
        source: notify::Error,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::WorkingDir { .. } => "working_dir_unavailable",
            RuntimeError::ProxyBind { .. } => "proxy_bind_failed",
            RuntimeError::Watch { .. } => "watch_failed",
        }
    }
}

/// # A failed compile.
///
/// Carries the compiler diagnostics verbatim; the controller keeps the most
/// recent one to detect the failed→successful transition.
#[derive(Error, Debug, Clone)]
#[error("build failed:\n{output}")]
pub struct BuildError {
    /// Compiler output (stderr), or a description of why the build tool
    /// could not be invoked at all.
    pub output: String,
}

impl BuildError {
    /// Creates a build error from any displayable diagnostic.
    pub fn new(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_are_stable() {
        let err = RuntimeError::WorkingDir {
            source: std::io::Error::other("boom"),
        };
        assert_eq!(err.as_label(), "working_dir_unavailable");
    }

    #[test]
    fn test_build_error_carries_diagnostics() {
        let err = BuildError::new("main.go:3: undefined: foo");
        assert!(err.to_string().contains("undefined: foo"));
    }
}
