//! The incremental build loop.
//!
//! One pass: lock, load, assemble, compile one stale mesh or wait for a
//! source change, exit. The supervisor respawns the pass process forever, so
//! a long-running development session is a sequence of short-lived passes,
//! each seeing the project from scratch.

#![warn(missing_docs)]

pub mod builder;
pub mod error;
pub mod state;
pub mod supervisor;
pub mod watcher;

pub use builder::{Builder, PassOutcome};
pub use error::BuildError;
pub use state::BuildState;
pub use supervisor::Supervisor;
pub use watcher::Watcher;
