//! Error types for artifact cache operations.

use std::path::PathBuf;

/// Errors that can occur while resolving or maintaining cached artifacts.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// An I/O error occurred on a cache path.
    #[error("cache I/O error on {path}: {source}")]
    Io {
        /// The path involved.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A source path had no file stem to derive an artifact basename from.
    #[error("cannot derive artifact name from {0}")]
    BadSourcePath(PathBuf),

    /// A source path was not located under the project root.
    #[error("source {source_path} is outside project root {root}")]
    OutsideProjectRoot {
        /// The offending source file.
        source_path: PathBuf,
        /// The project root it should live under.
        root: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_bad_source_path() {
        let err = CacheError::BadSourcePath(PathBuf::from("/"));
        assert_eq!(format!("{err}"), "cannot derive artifact name from /");
    }

    #[test]
    fn display_outside_root() {
        let err = CacheError::OutsideProjectRoot {
            source_path: PathBuf::from("/elsewhere/part.rs"),
            root: PathBuf::from("/project"),
        };
        assert_eq!(
            format!("{err}"),
            "source /elsewhere/part.rs is outside project root /project"
        );
    }
}
