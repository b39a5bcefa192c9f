use std::net::SocketAddr;

use serde::Deserialize;

use crate::health::HealthConfig;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    pub listen_address: Option<SocketAddr>,
    #[serde(default)]
    pub health: HealthConfig,
    #[serde(default)]
    pub models: ModelListingConfig,
    /// Largest accepted request body in bytes
    #[serde(default = "default_max_request_body")]
    pub max_request_body: usize,
    /// Expose the `/api/debug/*` routes
    #[serde(default = "default_admin")]
    pub admin: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: None,
            health: HealthConfig::default(),
            models: ModelListingConfig::default(),
            max_request_body: default_max_request_body(),
            admin: default_admin(),
        }
    }
}

/// Controls what `GET /v1/models` reveals to callers
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelListingConfig {
    /// Model ids containing any of these keywords are hidden by default
    #[serde(default = "default_hidden_keywords")]
    pub hidden_keywords: Vec<String>,
    /// Request header that, when set to `true`, reveals hidden models
    #[serde(default = "default_opt_in_header")]
    pub opt_in_header: String,
}

impl Default for ModelListingConfig {
    fn default() -> Self {
        Self {
            hidden_keywords: default_hidden_keywords(),
            opt_in_header: default_opt_in_header(),
        }
    }
}

fn default_hidden_keywords() -> Vec<String> {
    vec!["claude".to_owned()]
}

fn default_opt_in_header() -> String {
    "x-enable-claude".to_owned()
}

const fn default_max_request_body() -> usize {
    32 * 1024 * 1024
}

const fn default_admin() -> bool {
    true
}
