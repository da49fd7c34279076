//! Error types for repository operations.

use std::path::PathBuf;

/// Errors that can occur while operating on the project repository.
#[derive(Debug, thiserror::Error)]
pub enum VcsError {
    /// No enclosing git repository was found for a path.
    #[error("no git repository found for {0}")]
    NoRepository(PathBuf),

    /// Spawning the `git` binary failed.
    #[error("failed to run git {command}: {source}")]
    Spawn {
        /// The git subcommand that was attempted.
        command: String,
        /// The underlying launch error.
        #[source]
        source: std::io::Error,
    },

    /// `git` ran but reported failure.
    #[error("git {command} failed: {stderr}")]
    Command {
        /// The git subcommand that failed.
        command: String,
        /// What git printed to stderr.
        stderr: String,
    },
}
