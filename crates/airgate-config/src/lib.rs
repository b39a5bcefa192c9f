#![allow(clippy::must_use_candidate)]

pub mod accounts;
mod env;
pub mod health;
mod loader;
pub mod routing;
pub mod server;
pub mod telemetry;

use serde::Deserialize;

pub use accounts::*;
pub use health::*;
pub use routing::*;
pub use server::*;
pub use telemetry::*;

/// Top-level Airgate configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Routing, retry, and registry refresh configuration
    #[serde(default)]
    pub routing: RoutingConfig,
    /// Upstream accounts seeding the account store
    #[serde(default)]
    pub accounts: Vec<AccountConfig>,
    /// Model aliases seeding the alias store
    #[serde(default)]
    pub aliases: Vec<AliasConfig>,
    /// Logging configuration
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}
