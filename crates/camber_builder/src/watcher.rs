//! Polling file watcher.
//!
//! Takes an mtime snapshot of the contributing source files and resolves
//! when any of them changes, appears, or disappears. Polling keeps the
//! builder free of OS-specific notification plumbing; the interval is short
//! enough for interactive editing.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tracing::debug;

/// Watches a fixed set of files for modification.
pub struct Watcher {
    snapshot: BTreeMap<PathBuf, Option<SystemTime>>,
    poll: Duration,
}

impl Watcher {
    /// Snapshots the current state of `files`; changes are detected
    /// relative to this moment.
    pub fn new(files: impl IntoIterator<Item = PathBuf>, poll: Duration) -> Self {
        let snapshot = files
            .into_iter()
            .map(|path| {
                let mtime = Self::mtime(&path);
                (path, mtime)
            })
            .collect();
        Self { snapshot, poll }
    }

    /// Resolves with the first watched path whose mtime or existence
    /// differs from the snapshot.
    pub async fn changed(&self) -> PathBuf {
        let mut tick = tokio::time::interval(self.poll);
        loop {
            tick.tick().await;
            for (path, seen) in &self.snapshot {
                if Self::mtime(path) != *seen {
                    debug!(path = %path.display(), "change detected");
                    return path.clone();
                }
            }
        }
    }

    /// Number of watched files.
    pub fn len(&self) -> usize {
        self.snapshot.len()
    }

    /// Whether the watch set is empty.
    pub fn is_empty(&self) -> bool {
        self.snapshot.is_empty()
    }

    fn mtime(path: &Path) -> Option<SystemTime> {
        std::fs::metadata(path).and_then(|m| m.modified()).ok()
    }
}
