//! Error types for node rendering and assembly.

use std::path::PathBuf;

use crate::kind::NodeKind;

/// Errors that can occur while rendering or assembling a node.
#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    /// A node's render output violated the composition contract.
    #[error("validation error: {0}")]
    Validation(String),

    /// A node kind that must stay rigid tried to read the animation time.
    #[error("{0} node cannot rely on time, animation belongs on an assembly")]
    TimeNotSupported(NodeKind),

    /// A user render function failed.
    #[error("render failed: {0}")]
    Render(String),

    /// A fingerprint could not be computed or applied.
    #[error(transparent)]
    Fingerprint(#[from] camber_common::FingerprintError),

    /// An artifact path could not be derived or prepared.
    #[error(transparent)]
    Cache(#[from] camber_cache::CacheError),

    /// An I/O error occurred while writing generated output.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// The path involved.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}
