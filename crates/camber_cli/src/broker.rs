//! The `camber broker` subcommand.

use std::error::Error;

use camber_broker::{BrokerServer, DEFAULT_ADDR};
use tracing::info;

use crate::{project, GlobalArgs};

/// Runs the coordination broker until interrupted.
///
/// The address comes from `--addr`, then the project configuration, then
/// the default. No project is required: a broker can serve a host that has
/// no `camber.toml` in the current directory.
pub async fn run(addr: Option<String>, global: &GlobalArgs) -> Result<i32, Box<dyn Error>> {
    let addr = match addr {
        Some(addr) => addr,
        None => match project::locate(global) {
            Ok(project) => project.config.broker.addr(),
            Err(_) => DEFAULT_ADDR.to_string(),
        },
    };

    let server = BrokerServer::bind(&addr).await?;
    tokio::select! {
        result = server.serve() => result?,
        _ = tokio::signal::ctrl_c() => info!("interrupted, stopping"),
    }
    Ok(0)
}
