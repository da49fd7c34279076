//! Per-artifact compile lock files.
//!
//! A lock file holds the bare pid of the process compiling its artifact,
//! giving each compile target a mutex independent of the broker's global
//! lock. A lock whose pid is dead or unparseable is treated as released, so
//! a crashed compiler never wedges the artifact.

use std::path::Path;

use crate::error::CompileError;

/// Returns true if the lock file exists, parses to a pid, and that pid is
/// alive.
pub fn is_locked(path: &Path) -> bool {
    let Ok(contents) = std::fs::read_to_string(path) else {
        return false;
    };
    let Ok(pid) = contents.trim().parse::<u32>() else {
        return false;
    };
    pid_alive(pid)
}

/// Writes this process's pid into the lock file.
pub fn write_pid_lock(path: &Path) -> Result<(), CompileError> {
    std::fs::write(path, std::process::id().to_string()).map_err(|source| {
        CompileError::LockIo {
            path: path.to_path_buf(),
            source,
        }
    })
}

/// Removes a lock file, ignoring the case where it is already gone.
pub fn remove_lock(path: &Path) -> Result<(), CompileError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(CompileError::LockIo {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Liveness probe via the proc filesystem.
///
/// Cross-platform process probing is out of scope by design; this runs on
/// the same host family as the rest of the file-change machinery.
fn pid_alive(pid: u32) -> bool {
    Path::new("/proc").join(pid.to_string()).exists()
}
