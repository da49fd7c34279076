//! The node graph: composition-tree entities and their assembly.
//!
//! A mechanical assembly is described as a tree of geometry nodes. Leaf nodes
//! delegate to an external geometry compiler; container nodes combine their
//! children with a union. Assembling a node produces an intermediate
//! OpenSCAD-style description, substituting cached meshes for rigid subtrees
//! that are already up to date.

#![warn(missing_docs)]

pub mod error;
pub mod geometry;
pub mod kind;
pub mod loader;
pub mod node;
pub mod operation;
pub mod spatial;

pub use error::NodeError;
pub use geometry::Geometry;
pub use kind::NodeKind;
pub use loader::{LoadError, NodeRegistry};
pub use node::{Node, NodeId, Render, RenderContext, Rendered, Workspace};
pub use operation::Operation;
pub use spatial::{Mesh, SpatialError};
