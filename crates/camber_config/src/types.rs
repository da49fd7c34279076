//! Configuration types deserialized from `camber.toml`.

use serde::Deserialize;

/// The top-level project configuration parsed from `camber.toml`.
#[derive(Debug, Deserialize)]
pub struct ProjectConfig {
    /// Core project metadata.
    pub project: ProjectMeta,
    /// Build output settings.
    #[serde(default)]
    pub build: BuildConfig,
    /// Mesh compiler settings.
    #[serde(default)]
    pub compiler: CompilerConfig,
    /// Coordination broker endpoint.
    #[serde(default)]
    pub broker: BrokerConfig,
}

/// Core project metadata required in every `camber.toml`.
#[derive(Debug, Deserialize)]
pub struct ProjectMeta {
    /// The project name.
    pub name: String,
    /// Path to the root assembly definition, relative to the project root.
    pub root: String,
}

/// Build output settings.
#[derive(Debug, Deserialize)]
pub struct BuildConfig {
    /// Directory for build artifacts, relative to the project root.
    #[serde(default = "default_build_dir")]
    pub dir: String,
    /// Watcher poll interval in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// The project's builder command, run from the project root. Each run
    /// is one build pass; the supervisor relaunches it on exit.
    #[serde(default = "default_build_command")]
    pub command: Vec<String>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            dir: default_build_dir(),
            poll_interval_ms: default_poll_interval_ms(),
            command: default_build_command(),
        }
    }
}

fn default_build_dir() -> String {
    "_build".to_string()
}

fn default_poll_interval_ms() -> u64 {
    200
}

fn default_build_command() -> Vec<String> {
    vec!["cargo".to_string(), "run".to_string(), "--quiet".to_string()]
}

/// Mesh compiler settings.
#[derive(Debug, Deserialize)]
pub struct CompilerConfig {
    /// The external compiler command invoked as `<command> <src> -o <out>`.
    #[serde(default = "default_compiler_command")]
    pub command: String,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            command: default_compiler_command(),
        }
    }
}

fn default_compiler_command() -> String {
    "openscad".to_string()
}

/// Coordination broker endpoint.
#[derive(Debug, Deserialize)]
pub struct BrokerConfig {
    /// Host the broker binds and clients connect to.
    #[serde(default = "default_broker_host")]
    pub host: String,
    /// TCP port for the broker.
    #[serde(default = "default_broker_port")]
    pub port: u16,
}

impl BrokerConfig {
    /// The broker endpoint as a `host:port` address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: default_broker_host(),
            port: default_broker_port(),
        }
    }
}

fn default_broker_host() -> String {
    "127.0.0.1".to_string()
}

fn default_broker_port() -> u16 {
    4190
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load_config_from_str;

    #[test]
    fn defaults_fill_missing_sections() {
        let toml = r#"
[project]
name = "gearbox"
root = "src/gearbox.rs"
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.build.dir, "_build");
        assert_eq!(config.build.poll_interval_ms, 200);
        assert_eq!(config.build.command, vec!["cargo", "run", "--quiet"]);
        assert_eq!(config.compiler.command, "openscad");
        assert_eq!(config.broker.addr(), "127.0.0.1:4190");
    }

    #[test]
    fn broker_addr_joins_host_and_port() {
        let toml = r#"
[project]
name = "gearbox"
root = "src/gearbox.rs"

[broker]
host = "0.0.0.0"
port = 9000
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.broker.addr(), "0.0.0.0:9000");
    }
}
