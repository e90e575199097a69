//! # File watcher: detects matching source changes and fires a callback.
//!
//! Wraps a `notify` recommended watcher with three layers:
//!
//! 1. a bridge thread that owns the watcher and forwards filesystem events
//!    into an async channel (`notify` callbacks are synchronous),
//! 2. a pattern filter ([`Pattern`]) applied to paths relative to the
//!    watched root,
//! 3. a quiet-window debounce so one save (editors often write several
//!    events) fires one callback.
//!
//! ```text
//! notify ──► bridge thread ──filter──► mpsc ──debounce──► on_change(path)
//! ```
//!
//! The watcher starts buffering before the callback loop consumes anything,
//! so changes made during a long callback are not lost — they coalesce into
//! the next invocation.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{EventKind as FsEventKind, RecursiveMode, Watcher as _};
use tokio::sync::mpsc;
use tokio::time;

use crate::error::RuntimeError;

/// Quiet window between the last filesystem event and the callback firing.
pub const DEBOUNCE: Duration = Duration::from_millis(100);

/// A `*`-wildcard path glob with `/` separators, matched against paths
/// relative to the watched root.
///
/// Each segment matches one path component; `*` inside a segment matches any
/// run of characters within that component (it never crosses a separator).
/// A pattern therefore pins the exact nesting depth: `"*.go"` matches files
/// in the root, `"*/*.go"` one directory down.
#[derive(Clone, Debug)]
pub struct Pattern {
    segments: Vec<String>,
}

impl Pattern {
    /// Parses a pattern like `"*/*.go"`.
    pub fn new(pattern: &str) -> Self {
        Self {
            segments: pattern.split('/').map(str::to_string).collect(),
        }
    }

    /// Matches a root-relative path against this pattern.
    pub fn matches(&self, rel: &Path) -> bool {
        let comps: Vec<_> = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect();
        if comps.len() != self.segments.len() {
            return false;
        }
        self.segments
            .iter()
            .zip(&comps)
            .all(|(seg, comp)| segment_matches(seg, comp))
    }
}

/// Single-`*` wildcard match for one path component.
fn segment_matches(pattern: &str, name: &str) -> bool {
    match pattern.split_once('*') {
        None => pattern == name,
        Some((prefix, suffix)) => {
            name.len() >= prefix.len() + suffix.len()
                && name.starts_with(prefix)
                && name.ends_with(suffix)
        }
    }
}

/// Go sources in the working directory, nested up to two directories deep.
pub fn default_patterns() -> Vec<Pattern> {
    ["*.go", "*/*.go", "*/*/*.go"]
        .into_iter()
        .map(Pattern::new)
        .collect()
}

/// Watches a directory tree for matching changes.
pub struct Watcher {
    root: PathBuf,
    debounce: Duration,
}

impl Watcher {
    /// Creates a watcher rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            debounce: DEBOUNCE,
        }
    }

    /// Overrides the debounce window (tests use a shorter one).
    #[must_use]
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Starts watching and invokes `on_change` once per debounced batch of
    /// matching changes, for the lifetime of the watch.
    ///
    /// The callback receives the last changed path of the batch; its value
    /// is informational — every invocation means "something relevant
    /// changed".
    pub fn watch<F, Fut>(&self, patterns: Vec<Pattern>, on_change: F) -> Result<(), RuntimeError>
    where
        F: Fn(PathBuf) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send,
    {
        let (raw_tx, raw_rx) = std::sync::mpsc::channel::<notify::Result<notify::Event>>();
        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = raw_tx.send(res);
        })
        .map_err(|source| RuntimeError::Watch {
            path: self.root.clone(),
            source,
        })?;
        watcher
            .watch(&self.root, RecursiveMode::Recursive)
            .map_err(|source| RuntimeError::Watch {
                path: self.root.clone(),
                source,
            })?;

        let (tx, mut rx) = mpsc::channel::<PathBuf>(64);
        let root = self.root.clone();

        // The bridge thread owns the notify watcher; dropping it would stop
        // the event stream.
        std::thread::spawn(move || {
            let _watcher = watcher;
            while let Ok(res) = raw_rx.recv() {
                let Ok(event) = res else { continue };
                if !is_mutation(&event.kind) {
                    continue;
                }
                for path in event.paths {
                    let Ok(rel) = path.strip_prefix(&root) else {
                        continue;
                    };
                    if patterns.iter().any(|p| p.matches(rel)) {
                        if tx.blocking_send(path).is_err() {
                            return;
                        }
                        break;
                    }
                }
            }
        });

        let debounce = self.debounce;
        tokio::spawn(async move {
            while let Some(first) = rx.recv().await {
                let mut last = first;
                // absorb the burst: wait until no event arrives for `debounce`
                while let Ok(Some(next)) = time::timeout(debounce, rx.recv()).await {
                    last = next;
                }
                on_change(last).await;
            }
        });

        Ok(())
    }
}

/// Create/modify/remove change the source tree; access events do not.
fn is_mutation(kind: &FsEventKind) -> bool {
    matches!(
        kind,
        FsEventKind::Create(_) | FsEventKind::Modify(_) | FsEventKind::Remove(_)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_depth_is_exact() {
        let p0 = Pattern::new("*.go");
        let p1 = Pattern::new("*/*.go");
        let p2 = Pattern::new("*/*/*.go");

        assert!(p0.matches(Path::new("main.go")));
        assert!(!p0.matches(Path::new("pkg/main.go")));

        assert!(p1.matches(Path::new("pkg/main.go")));
        assert!(!p1.matches(Path::new("main.go")));
        assert!(!p1.matches(Path::new("a/b/main.go")));

        assert!(p2.matches(Path::new("a/b/main.go")));
        assert!(!p2.matches(Path::new("a/b/c/main.go")));
    }

    #[test]
    fn test_pattern_rejects_other_extensions() {
        let patterns = default_patterns();
        assert!(!patterns.iter().any(|p| p.matches(Path::new("notes.txt"))));
        assert!(!patterns.iter().any(|p| p.matches(Path::new("go"))));
        assert!(patterns.iter().any(|p| p.matches(Path::new("a/b/x.go"))));
    }

    #[test]
    fn test_literal_segment_must_match_exactly() {
        let p = Pattern::new("cmd/*.go");
        assert!(p.matches(Path::new("cmd/main.go")));
        assert!(!p.matches(Path::new("lib/main.go")));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_change_fires_callback_once() {
        let dir = tempfile::tempdir().unwrap();
        // canonicalize: notify reports resolved paths on platforms where the
        // temp dir is behind a symlink
        let root = dir.path().canonicalize().unwrap();

        let (tx, mut rx) = mpsc::channel::<PathBuf>(8);
        let watcher = Watcher::new(&root).with_debounce(Duration::from_millis(50));
        watcher
            .watch(default_patterns(), move |path| {
                let tx = tx.clone();
                async move {
                    let _ = tx.send(path).await;
                }
            })
            .unwrap();

        // give the watcher a moment to arm before mutating the tree
        time::sleep(Duration::from_millis(200)).await;
        std::fs::write(root.join("main.go"), "package main\n").unwrap();

        let got = time::timeout(Duration::from_secs(10), rx.recv())
            .await
            .expect("watcher did not report the change")
            .unwrap();
        assert_eq!(got.file_name().unwrap(), "main.go");
    }
}
