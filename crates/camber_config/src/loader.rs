//! Configuration file loading and validation.

use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::types::ProjectConfig;

/// Loads and validates a `camber.toml` configuration from a project
/// directory.
pub fn load_config(project_dir: &Path) -> Result<ProjectConfig, ConfigError> {
    let config_path = project_dir.join("camber.toml");
    let content = std::fs::read_to_string(&config_path)?;
    load_config_from_str(&content)
}

/// Parses and validates a `camber.toml` configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<ProjectConfig, ConfigError> {
    let config: ProjectConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Walks up from `start` looking for a directory containing `camber.toml`.
pub fn find_project_root(start: &Path) -> Result<PathBuf, ConfigError> {
    let mut path = if start.is_dir() {
        start.to_path_buf()
    } else {
        start.parent().map(Path::to_path_buf).unwrap_or_default()
    };
    loop {
        if path.join("camber.toml").is_file() {
            return Ok(path);
        }
        if !path.pop() {
            return Err(ConfigError::NoProject(start.to_path_buf()));
        }
    }
}

fn validate_config(config: &ProjectConfig) -> Result<(), ConfigError> {
    if config.project.name.is_empty() {
        return Err(ConfigError::MissingField("project.name".to_string()));
    }
    if config.project.root.is_empty() {
        return Err(ConfigError::MissingField("project.root".to_string()));
    }
    if Path::new(&config.project.root).is_absolute() {
        return Err(ConfigError::ValidationError(
            "project.root must be relative to the project directory".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn parse_minimal_config() {
        let toml = r#"
[project]
name = "gearbox"
root = "src/gearbox.rs"
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.project.name, "gearbox");
        assert_eq!(config.project.root, "src/gearbox.rs");
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
[project]
name = "gearbox"
root = "src/gearbox.rs"

[build]
dir = "target/meshes"
poll_interval_ms = 50

[compiler]
command = "/usr/local/bin/openscad"

[broker]
host = "127.0.0.1"
port = 4191
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.build.dir, "target/meshes");
        assert_eq!(config.build.poll_interval_ms, 50);
        assert_eq!(config.compiler.command, "/usr/local/bin/openscad");
        assert_eq!(config.broker.port, 4191);
    }

    #[test]
    fn missing_name_errors() {
        let toml = r#"
[project]
name = ""
root = "src/gearbox.rs"
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField(_)));
    }

    #[test]
    fn absolute_root_errors() {
        let toml = r#"
[project]
name = "gearbox"
root = "/etc/gearbox.rs"
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn invalid_toml_errors() {
        let err = load_config_from_str("this is not valid toml {{{}}}").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn find_root_walks_up() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("camber.toml"), "").unwrap();
        let nested = dir.path().join("src/parts");
        fs::create_dir_all(&nested).unwrap();
        assert_eq!(find_project_root(&nested).unwrap(), dir.path());
    }

    #[test]
    fn find_root_fails_without_manifest() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            find_project_root(dir.path()),
            Err(ConfigError::NoProject(_))
        ));
    }

    #[test]
    fn io_error_from_nonexistent_dir() {
        let err = load_config(Path::new("/nonexistent/dir")).unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }
}
