//! Artifact cache for compiled meshes.
//!
//! This crate decides where a node's generated artifacts live on disk and
//! whether a previously compiled mesh is still reusable. Freshness is an
//! exact mtime comparison against the node's fingerprint; there is no
//! content hashing and no manifest — the filesystem itself is the cache.

#![warn(missing_docs)]

pub mod error;
pub mod freshness;
pub mod paths;

pub use error::CacheError;
pub use freshness::{is_fresh, remove_stale};
pub use paths::ArtifactPaths;
