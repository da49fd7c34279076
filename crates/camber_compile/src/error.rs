//! Error types for external geometry compilation.

use std::path::PathBuf;

/// Errors that can occur while triggering or finishing a compile.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    /// The node could not be assembled before compilation.
    #[error(transparent)]
    Node(#[from] camber_node::NodeError),

    /// A fingerprint could not be computed or applied.
    #[error(transparent)]
    Fingerprint(#[from] camber_common::FingerprintError),

    /// A cached artifact could not be maintained.
    #[error(transparent)]
    Cache(#[from] camber_cache::CacheError),

    /// The external compiler process could not be spawned or awaited.
    #[error("failed to run compiler '{command}': {source}")]
    Spawn {
        /// The compiler command.
        command: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The external compiler exited with a failure status.
    #[error("compiler failed with {status} for {artifact}")]
    CompilerFailed {
        /// The exit status description.
        status: String,
        /// The mesh that was being produced.
        artifact: PathBuf,
    },

    /// The compiler exited successfully but left no artifact behind.
    #[error("compiler produced no artifact at {0}")]
    MissingArtifact(PathBuf),

    /// A lock file could not be read or written.
    #[error("lock file error on {path}: {source}")]
    LockIo {
        /// The lock file path.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_missing_artifact() {
        let err = CompileError::MissingArtifact(PathBuf::from("/b/part.stl"));
        assert_eq!(format!("{err}"), "compiler produced no artifact at /b/part.stl");
    }

    #[test]
    fn display_compiler_failed() {
        let err = CompileError::CompilerFailed {
            status: "exit status: 1".to_string(),
            artifact: PathBuf::from("/b/part.stl"),
        };
        assert!(format!("{err}").contains("exit status: 1"));
    }
}
