use std::net::SocketAddr;
use std::path::PathBuf;

use airgate_config::RoutingMode;
use clap::Parser;

/// Airgate model-aware reverse proxy
#[derive(Debug, Parser)]
#[command(name = "airgate", about = "Routes OpenAI-compatible requests across upstream accounts")]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "airgate.toml", env = "AIRGATE_CONFIG")]
    pub config: PathBuf,

    /// Override the listen address
    #[arg(long, env = "AIRGATE_LISTEN")]
    pub listen: Option<SocketAddr>,

    /// Override the routing mode (`direct` or `alias`)
    #[arg(long, env = "AIRGATE_MODE")]
    pub mode: Option<RoutingMode>,
}
