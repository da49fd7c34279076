//! The build pass state machine.

use std::fmt;

/// The phase a build pass is in.
///
/// A pass moves strictly forward; the only branches are into `RollingBack`
/// on failure and back to `Watching` after a fully fresh compile check.
/// `Exited` is terminal: a new pass starts in a new process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildState {
    /// Pass created, lock not yet held.
    Idle,
    /// Resolving the root node from its source path.
    Loading,
    /// Assembling the node tree.
    Assembling,
    /// Watching the contributing source files.
    Watching,
    /// Walking the tree for stale artifacts.
    Compiling,
    /// A failure occurred; discarding working tree mutations.
    RollingBack,
    /// The pass is over; the supervisor respawns.
    Exited,
}

impl BuildState {
    /// Whether moving from this state to `next` is legal.
    pub fn can_transition(self, next: BuildState) -> bool {
        use BuildState::*;
        matches!(
            (self, next),
            (Idle, Loading)
                | (Loading, Assembling)
                | (Loading, RollingBack)
                | (Assembling, Watching)
                | (Assembling, RollingBack)
                | (Watching, Compiling)
                | (Watching, Exited)
                | (Compiling, Watching)
                | (Compiling, Exited)
                | (Compiling, RollingBack)
                | (RollingBack, Exited)
        )
    }
}

impl fmt::Display for BuildState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BuildState::Idle => "idle",
            BuildState::Loading => "loading",
            BuildState::Assembling => "assembling",
            BuildState::Watching => "watching",
            BuildState::Compiling => "compiling",
            BuildState::RollingBack => "rolling-back",
            BuildState::Exited => "exited",
        };
        f.write_str(name)
    }
}
