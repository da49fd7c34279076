//! Node kinds.
//!
//! One `Node` type parameterized by a kind tag replaces the original's
//! class hierarchy; behavior differences between kinds are selected by tag
//! dispatch in validation, rigidity, and time handling.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of a composition-tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// Terminates the tree; renders geometry for an external compiler.
    Leaf,
    /// Combines children with a union.
    Internal,
    /// A rigid fusion of children into one inseparable unit; forbids
    /// time-dependence.
    Fusion,
    /// A collection of components that can move relative to each other;
    /// exposes animation time and is never cacheable as rigid.
    Assembly,
}

impl NodeKind {
    /// Whether nodes of this kind render children rather than geometry.
    pub fn is_container(self) -> bool {
        !matches!(self, NodeKind::Leaf)
    }

    /// Whether nodes of this kind may read the animation time.
    pub fn supports_time(self) -> bool {
        matches!(self, NodeKind::Assembly)
    }

    /// Whether this kind forces its own rigidity off.
    ///
    /// Rigid children of an assembly may still be cached individually; only
    /// the assembly itself is excluded from mesh caching.
    pub fn forces_non_rigid(self) -> bool {
        matches!(self, NodeKind::Assembly)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::Leaf => "leaf",
            NodeKind::Internal => "internal",
            NodeKind::Fusion => "fusion",
            NodeKind::Assembly => "assembly",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_leaf_is_not_a_container() {
        assert!(!NodeKind::Leaf.is_container());
        assert!(NodeKind::Internal.is_container());
        assert!(NodeKind::Fusion.is_container());
        assert!(NodeKind::Assembly.is_container());
    }

    #[test]
    fn only_assembly_supports_time() {
        assert!(NodeKind::Assembly.supports_time());
        assert!(!NodeKind::Leaf.supports_time());
        assert!(!NodeKind::Fusion.supports_time());
        assert!(!NodeKind::Internal.supports_time());
    }

    #[test]
    fn only_assembly_forces_non_rigid() {
        assert!(NodeKind::Assembly.forces_non_rigid());
        assert!(!NodeKind::Fusion.forces_non_rigid());
    }
}
