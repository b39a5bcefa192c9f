//! Programmatic configuration builder for integration tests

use std::net::SocketAddr;

use airgate_config::{AccountConfig, AliasConfig, Config, HealthConfig, RoutingMode, ServerConfig};
use secrecy::SecretString;

/// Builder for constructing test configurations
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder with minimal defaults and a fixed seed
    pub fn new() -> Self {
        let mut config = Config {
            server: ServerConfig {
                listen_address: Some(SocketAddr::from(([127, 0, 0, 1], 0))),
                health: HealthConfig {
                    enabled: true,
                    ..HealthConfig::default()
                },
                ..ServerConfig::default()
            },
            ..Config::default()
        };
        config.routing.seed = Some(42);

        Self { config }
    }

    /// Add an enabled account pointed at a mock upstream
    pub fn with_account(self, id: u64, name: &str, base_url: &str) -> Self {
        self.with_account_ext(id, name, base_url, None)
    }

    /// Add an account with an `ext` family tag
    pub fn with_account_ext(mut self, id: u64, name: &str, base_url: &str, ext: Option<&str>) -> Self {
        self.config.accounts.push(AccountConfig {
            id,
            name: name.to_owned(),
            base_url: base_url.parse().expect("valid URL"),
            api_key: SecretString::from(format!("sk-{name}")),
            enabled: true,
            ext: ext.map(str::to_owned),
            updated_at: 0,
        });
        self
    }

    pub fn with_mode(mut self, mode: RoutingMode) -> Self {
        self.config.routing.mode = mode;
        self
    }

    /// Add an enabled alias
    pub fn with_alias(mut self, id: &str, models: &[&str], family: Option<&str>) -> Self {
        self.config.aliases.push(AliasConfig {
            id: id.to_owned(),
            enabled: true,
            models: models.iter().map(|m| (*m).to_owned()).collect(),
            family: family.map(str::to_owned),
        });
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.config.routing.seed = Some(seed);
        self
    }

    pub fn with_direct_attempts(mut self, attempts: usize) -> Self {
        self.config.routing.direct_attempts = attempts;
        self
    }

    /// Disable health endpoint
    pub fn without_health(mut self) -> Self {
        self.config.server.health.enabled = false;
        self
    }

    /// Build the final config
    pub fn build(self) -> Config {
        self.config
    }
}
