//! The `camber watch` subcommand.

use std::error::Error;

use camber_builder::Supervisor;
use tracing::info;

use crate::{project, GlobalArgs};

/// Supervises the project's builder command, relaunching it each time a
/// pass exits. Runs until interrupted.
pub async fn run(global: &GlobalArgs) -> Result<i32, Box<dyn Error>> {
    let project = project::locate(global)?;
    std::env::set_current_dir(&project.root)?;
    info!(
        project = %project.config.project.name,
        command = ?project.config.build.command,
        "watching"
    );

    Supervisor::new(project.config.build.command.clone()).run().await?;
    Ok(0)
}
