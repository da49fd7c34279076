//! Error types for the builder loop.

use camber_broker::BrokerError;
use camber_compile::CompileError;
use camber_node::{LoadError, NodeError};
use camber_vcs::VcsError;

use crate::state::BuildState;

/// Errors that can occur while running a build pass or supervising one.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// Loading the root node failed.
    #[error(transparent)]
    Load(#[from] LoadError),

    /// Assembling the node tree failed.
    #[error(transparent)]
    Node(#[from] NodeError),

    /// A compile step failed.
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// Talking to the coordination broker failed.
    #[error(transparent)]
    Broker(#[from] BrokerError),

    /// Rolling back the working tree failed.
    #[error(transparent)]
    Vcs(#[from] VcsError),

    /// A background wait task was cancelled or panicked.
    #[error("compile wait task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// The supervised command could not be spawned.
    #[error("failed to spawn '{command}': {source}")]
    Spawn {
        /// The command that failed to start.
        command: String,
        /// The underlying launch error.
        #[source]
        source: std::io::Error,
    },

    /// The supervisor was given an empty command line.
    #[error("empty builder command")]
    EmptyCommand,

    /// A pass attempted an illegal state transition.
    #[error("illegal build state transition: {from} -> {to}")]
    InvalidTransition {
        /// The state the pass was in.
        from: BuildState,
        /// The state it tried to enter.
        to: BuildState,
    },
}
