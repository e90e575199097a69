//! # Resolved runtime settings.
//!
//! [`Config`] is constructed once at startup, defaulted with
//! [`Config::set_defaults`], and immutable from then on. The supervisor
//! passes the resolved values into its collaborators by reference; nothing
//! mutates a config after defaulting.
//!
//! ## Sentinel values
//! - `port = 0` / `app = 0` → unset, filled with the defaults below
//! - `bin = ""` → unset
//! - `path = ""` → unset, filled with the current working directory

use std::path::PathBuf;

use crate::error::RuntimeError;

/// Resolved settings for one supervised service.
///
/// ## Field semantics
/// - `path`: working directory; sources are watched and the binary is built here
/// - `port`: public port the proxy listens on (clients connect here)
/// - `app`: backend port the supervised service binds (communicated to the
///   child through the `PORT` environment variable)
/// - `bin`: name of the compiled binary, relative to `path`
/// - `immediate`: start the backend as part of the initial build cycle;
///   the initial build itself always runs before the watcher is armed, and
///   when this is false the first matching file change performs the first
///   start
#[derive(Clone, Debug)]
pub struct Config {
    /// Working directory. Empty means unset.
    pub path: PathBuf,
    /// Proxy listen port. `0` means unset.
    pub port: u16,
    /// Backend port for the supervised service. `0` means unset.
    pub app: u16,
    /// Name of the compiled binary. Empty means unset.
    pub bin: String,
    /// Start the backend in the initial build cycle instead of waiting for
    /// the first change.
    pub immediate: bool,
}

impl Config {
    /// Fills unset fields, in order, each only if unset:
    ///
    /// 1. `port ← 8081`
    /// 2. `app ← 8080`
    /// 3. `bin ← "gin-bin"`
    /// 4. `path ← current working directory`
    ///
    /// Resolving the working directory is the only step that can fail; that
    /// failure is fatal ([`RuntimeError::WorkingDir`]).
    pub fn set_defaults(&mut self) -> Result<(), RuntimeError> {
        if self.port == 0 {
            self.port = 8081;
        }
        if self.app == 0 {
            self.app = 8080;
        }
        if self.bin.is_empty() {
            self.bin = "gin-bin".to_string();
        }
        if self.path.as_os_str().is_empty() {
            self.path =
                std::env::current_dir().map_err(|source| RuntimeError::WorkingDir { source })?;
        }
        Ok(())
    }

    /// Address the proxy forwards to.
    pub fn backend_addr(&self) -> String {
        format!("127.0.0.1:{}", self.app)
    }
}

impl Default for Config {
    /// All fields unset; call [`Config::set_defaults`] before use.
    fn default() -> Self {
        Self {
            path: PathBuf::new(),
            port: 0,
            app: 0,
            bin: String::new(),
            immediate: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_all_unset_fields() {
        let mut cfg = Config::default();
        cfg.set_defaults().unwrap();

        assert_eq!(cfg.port, 8081);
        assert_eq!(cfg.app, 8080);
        assert_eq!(cfg.bin, "gin-bin");
        assert_eq!(cfg.path, std::env::current_dir().unwrap());
    }

    #[test]
    fn test_defaults_preserve_set_fields() {
        let mut cfg = Config {
            path: PathBuf::from("/srv/app"),
            port: 3000,
            app: 3001,
            bin: "server".to_string(),
            immediate: true,
        };
        cfg.set_defaults().unwrap();

        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.app, 3001);
        assert_eq!(cfg.bin, "server");
        assert_eq!(cfg.path, PathBuf::from("/srv/app"));
        assert!(cfg.immediate);
    }

    #[test]
    fn test_backend_addr_uses_app_port() {
        let mut cfg = Config::default();
        cfg.set_defaults().unwrap();
        assert_eq!(cfg.backend_addr(), "127.0.0.1:8080");
    }
}
