use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

/// One upstream account seeded into the account store
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccountConfig {
    /// Stable numeric identifier
    pub id: u64,
    /// Display name, unique across accounts
    pub name: String,
    /// Base URL, either a bare host or a host with an API prefix path
    pub base_url: Url,
    /// Upstream API key
    pub api_key: SecretString,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Comma-separated provider families this account may serve natively
    #[serde(default)]
    pub ext: Option<String>,
    /// Last-updated time as seconds since the Unix epoch
    #[serde(default)]
    pub updated_at: u64,
}

/// A logical model name mapped onto concrete model ids or patterns
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AliasConfig {
    pub id: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Literal model ids or wildcard patterns such as `gpt-4*`
    #[serde(default)]
    pub models: Vec<String>,
    /// Provider family used to filter the `/v1/models` listing
    #[serde(default)]
    pub family: Option<String>,
}

#[allow(clippy::missing_const_for_fn)]
fn default_enabled() -> bool {
    true
}
