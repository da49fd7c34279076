//! Version-control integration for project rollback.
//!
//! Builds run against a working tree the user is actively editing. When a
//! pass fails, the builder uses this crate to discard the offending changes
//! so the project returns to its last good committed state.

#![warn(missing_docs)]

pub mod error;
pub mod repo;

pub use error::VcsError;
pub use repo::{find_repo_root, Repo};
