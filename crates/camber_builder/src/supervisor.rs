//! The exit-and-respawn supervisor.
//!
//! A build pass is one process lifetime. The supervisor relaunches the
//! project's builder command every time it exits, which is how the system
//! reloads: the pass sees an edit, exits, and comes back with fresh state.

use std::time::Duration;

use tokio::process::Command;
use tracing::{info, warn};

use crate::error::BuildError;

/// Relaunches a builder command until interrupted.
pub struct Supervisor {
    command: Vec<String>,
    backoff: Duration,
}

impl Supervisor {
    /// A supervisor for the given command line (program plus arguments).
    pub fn new(command: Vec<String>) -> Self {
        Self {
            command,
            backoff: Duration::from_secs(1),
        }
    }

    /// Overrides the delay inserted after a failed exit.
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Spawns the command, waits for it, and respawns on exit. A failed
    /// exit gets a short backoff so a command that dies instantly cannot
    /// spin. Returns on ctrl-c.
    pub async fn run(&self) -> Result<(), BuildError> {
        let (program, args) = self.command.split_first().ok_or(BuildError::EmptyCommand)?;
        loop {
            let mut child = Command::new(program).args(args).spawn().map_err(|source| {
                BuildError::Spawn {
                    command: program.clone(),
                    source,
                }
            })?;

            tokio::select! {
                status = child.wait() => {
                    let status = status.map_err(|source| BuildError::Spawn {
                        command: program.clone(),
                        source,
                    })?;
                    if status.success() {
                        info!(command = %program, "pass exited, relaunching");
                    } else {
                        warn!(command = %program, %status, "pass failed, backing off");
                        tokio::time::sleep(self.backoff).await;
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("interrupted, stopping");
                    let _ = child.kill().await;
                    return Ok(());
                }
            }
        }
    }

    /// Runs the command for a bounded number of exits. Test harness for the
    /// respawn loop, which otherwise only stops on ctrl-c.
    #[cfg(test)]
    async fn run_times(&self, times: usize) -> Result<(), BuildError> {
        let (program, args) = self.command.split_first().ok_or(BuildError::EmptyCommand)?;
        for _ in 0..times {
            let mut child = Command::new(program).args(args).spawn().map_err(|source| {
                BuildError::Spawn {
                    command: program.clone(),
                    source,
                }
            })?;
            let status = child.wait().await.map_err(|source| BuildError::Spawn {
                command: program.clone(),
                source,
            })?;
            if !status.success() {
                tokio::time::sleep(self.backoff).await;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[tokio::test]
    async fn respawns_the_command() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("runs");
        let script = dir.path().join("pass.sh");
        fs::write(&script, format!("#!/bin/sh\necho run >> {}\n", marker.display())).unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
        }

        let supervisor = Supervisor::new(vec![script.to_str().unwrap().to_string()]);
        supervisor.run_times(3).await.unwrap();

        let runs = fs::read_to_string(&marker).unwrap();
        assert_eq!(runs.lines().count(), 3);
    }

    #[tokio::test]
    async fn empty_command_errors() {
        let supervisor = Supervisor::new(vec![]);
        assert!(matches!(
            supervisor.run().await,
            Err(BuildError::EmptyCommand)
        ));
    }

    #[tokio::test]
    async fn missing_program_errors() {
        let supervisor = Supervisor::new(vec!["/nonexistent/builder".to_string()]);
        assert!(matches!(
            supervisor.run_times(1).await,
            Err(BuildError::Spawn { .. })
        ));
    }
}
