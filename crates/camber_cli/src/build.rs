//! The `camber build` subcommand.

use std::error::Error;

use tokio::process::Command;
use tracing::info;

use crate::{project, GlobalArgs};

/// Runs the project's builder command once and propagates its exit code.
pub async fn run(global: &GlobalArgs) -> Result<i32, Box<dyn Error>> {
    let project = project::locate(global)?;
    let command = &project.config.build.command;
    let (program, args) = command
        .split_first()
        .ok_or("empty build command in camber.toml")?;
    info!(project = %project.config.project.name, command = ?command, "building");

    let status = Command::new(program)
        .args(args)
        .current_dir(&project.root)
        .status()
        .await?;
    Ok(status.code().unwrap_or(1))
}
