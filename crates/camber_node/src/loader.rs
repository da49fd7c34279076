//! Root-node loading.
//!
//! The original system imported a source module dynamically and scanned it
//! for a node class. Rust links statically, so a project registers a factory
//! per node source path instead; loading resolves the path against the
//! registry and instantiates the node. Everything downstream — assembly,
//! watching, compilation — is identical.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::NodeError;
use crate::node::{Node, Workspace};

/// Errors raised while loading a root node from a source path.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// No node factory is registered for the path.
    #[error("no node registered for {0}")]
    NotRegistered(PathBuf),

    /// The source path could not be resolved on disk.
    #[error("cannot resolve {path}: {source}")]
    Resolve {
        /// The path that failed to resolve.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The registered factory failed to construct the node.
    #[error(transparent)]
    Node(#[from] NodeError),
}

type Factory = Box<dyn Fn(&Workspace) -> Result<Node, NodeError> + Send + Sync>;

/// Maps node source paths to constructors.
///
/// A project registers one entry per loadable root; the builder loads
/// whichever path its configuration names.
#[derive(Default)]
pub struct NodeRegistry {
    factories: HashMap<PathBuf, Factory>,
}

impl NodeRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a factory for a source path.
    ///
    /// Later registrations for the same path replace earlier ones.
    pub fn register<F>(&mut self, source: impl Into<PathBuf>, factory: F)
    where
        F: Fn(&Workspace) -> Result<Node, NodeError> + Send + Sync + 'static,
    {
        self.factories.insert(source.into(), Box::new(factory));
    }

    /// Loads the node registered for `path`.
    ///
    /// The path is canonicalized first so relative and absolute spellings of
    /// the same source resolve to the same entry.
    pub fn load(&self, path: &Path, workspace: &Workspace) -> Result<Node, LoadError> {
        let canonical = path.canonicalize().map_err(|source| LoadError::Resolve {
            path: path.to_path_buf(),
            source,
        })?;
        let factory = self
            .factories
            .get(&canonical)
            .ok_or_else(|| LoadError::NotRegistered(canonical))?;
        Ok(factory(workspace)?)
    }

    /// Number of registered entries.
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}
