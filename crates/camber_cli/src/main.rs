//! Camber CLI — the command-line interface for the Camber build system.
//!
//! Provides `camber broker` to run the host's coordination service,
//! `camber watch` to supervise a project's builder in a reload loop, and
//! `camber build` to run a single build pass.

#![warn(missing_docs)]

mod broker;
mod build;
mod project;
mod watch;

use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Camber — an incremental build system for parametric assemblies.
#[derive(Parser, Debug)]
#[command(name = "camber", version, about = "Camber build system")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a custom `camber.toml` configuration file.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the coordination broker for this host.
    Broker {
        /// Address to bind, overriding the configuration.
        #[arg(long)]
        addr: Option<String>,
    },
    /// Supervise the project's builder command, relaunching it on exit.
    Watch,
    /// Run the project's builder command once.
    Build,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Optional path to a custom config file.
    pub config: Option<String>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .init();

    let global = GlobalArgs { config: cli.config };

    let result = match cli.command {
        Command::Broker { addr } => broker::run(addr, &global).await,
        Command::Watch => watch::run(&global).await,
        Command::Build => build::run(&global).await,
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}
