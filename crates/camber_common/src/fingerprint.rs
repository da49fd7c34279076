//! Modification-time fingerprints for cache invalidation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// The coarse content proxy used as the cache key for compiled artifacts.
///
/// A node's fingerprint is the maximum modification time across every source
/// file that contributes to its output. An artifact built against a
/// fingerprint has its own mtime stamped to exactly that value, so freshness
/// is an exact timestamp comparison rather than a content hash.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Fingerprint(SystemTime);

/// Errors raised while computing or applying a fingerprint.
#[derive(Debug, thiserror::Error)]
pub enum FingerprintError {
    /// The contributing file set was empty, so no fingerprint exists.
    #[error("cannot fingerprint an empty file set")]
    EmptyFileSet,

    /// A contributing file could not be inspected or stamped.
    #[error("failed to access {path}: {source}")]
    Io {
        /// The file that failed.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}

impl Fingerprint {
    /// Reads the fingerprint (mtime) of a single file.
    pub fn read(path: &Path) -> Result<Self, FingerprintError> {
        let mtime = std::fs::metadata(path)
            .and_then(|m| m.modified())
            .map_err(|source| FingerprintError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self(mtime))
    }

    /// Computes the fingerprint of a file set as the maximum mtime.
    ///
    /// Any contributing file's modification bumps the result, invalidating
    /// every artifact built against the previous value.
    pub fn of_files<'a>(
        paths: impl IntoIterator<Item = &'a PathBuf>,
    ) -> Result<Self, FingerprintError> {
        let mut max: Option<Self> = None;
        for path in paths {
            let fp = Self::read(path)?;
            max = Some(match max {
                Some(prev) if prev >= fp => prev,
                _ => fp,
            });
        }
        max.ok_or(FingerprintError::EmptyFileSet)
    }

    /// Stamps a file's mtime to exactly this fingerprint value.
    ///
    /// This is what turns the mtime into a deterministic cache key: a stamped
    /// artifact compares equal to the fingerprint it was built against.
    pub fn stamp(&self, path: &Path) -> Result<(), FingerprintError> {
        let io = |source| FingerprintError::Io {
            path: path.to_path_buf(),
            source,
        };
        let file = File::options().append(true).open(path).map_err(io)?;
        file.set_modified(self.0).map_err(io)
    }

    /// Returns the underlying timestamp.
    pub fn as_system_time(&self) -> SystemTime {
        self.0
    }
}

impl From<SystemTime> for Fingerprint {
    fn from(t: SystemTime) -> Self {
        Self(t)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.duration_since(UNIX_EPOCH) {
            Ok(d) => write!(f, "{}.{:09}", d.as_secs(), d.subsec_nanos()),
            Err(_) => write!(f, "pre-epoch"),
        }
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({self})")
    }
}
