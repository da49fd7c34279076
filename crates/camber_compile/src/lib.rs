//! The compile job protocol.
//!
//! Bridges slow external geometry compiles into the builder's control flow.
//! Triggering compilation on a node either returns `Ready` (nothing to do,
//! or someone else is already building it) or `Pending` with a handle to the
//! spawned compiler process. The recursive walk over a tree short-circuits
//! on the first pending job; the caller waits for it and restarts the whole
//! pass, because sibling artifacts may have been invalidated by the same
//! source change.

#![warn(missing_docs)]

pub mod error;
pub mod job;
pub mod lock;

pub use error::CompileError;
pub use job::{compile_node, trigger_compile, Compiler, CompileJob, Outcome};
pub use lock::{is_locked, remove_lock, write_pid_lock};
