//! Locating and loading the project configuration for a CLI invocation.

use std::error::Error;
use std::path::PathBuf;

use camber_config::{find_project_root, load_config, load_config_from_str, ProjectConfig};

use crate::GlobalArgs;

/// A located project: its root directory and parsed configuration.
pub struct Project {
    /// The directory containing `camber.toml`.
    pub root: PathBuf,
    /// The parsed configuration.
    pub config: ProjectConfig,
}

/// Resolves the project from `--config` or by walking up from the current
/// directory.
pub fn locate(global: &GlobalArgs) -> Result<Project, Box<dyn Error>> {
    match &global.config {
        Some(path) => {
            let path = PathBuf::from(path);
            let content = std::fs::read_to_string(&path)?;
            let config = load_config_from_str(&content)?;
            let root = path
                .parent()
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("."));
            Ok(Project { root, config })
        }
        None => {
            let cwd = std::env::current_dir()?;
            let root = find_project_root(&cwd)?;
            let config = load_config(&root)?;
            Ok(Project { root, config })
        }
    }
}
