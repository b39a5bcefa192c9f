use std::{fmt, str::FromStr, time::Duration};

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};

/// How the inbound `model` field is interpreted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoutingMode {
    /// The requested model id is looked up literally
    #[default]
    Direct,
    /// The requested model id names an alias mapping onto concrete ids
    Alias,
}

impl FromStr for RoutingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "direct" => Ok(Self::Direct),
            "alias" => Ok(Self::Alias),
            other => Err(format!("unknown routing mode '{other}', expected 'direct' or 'alias'")),
        }
    }
}

impl fmt::Display for RoutingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct => f.write_str("direct"),
            Self::Alias => f.write_str("alias"),
        }
    }
}

/// Retry, failure suppression, and registry refresh settings
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoutingConfig {
    #[serde(default)]
    pub mode: RoutingMode,
    /// Attempt ceiling for direct-mode requests
    #[serde(default = "default_direct_attempts")]
    pub direct_attempts: usize,
    /// Attempt ceiling for alias-mode requests
    #[serde(default = "default_alias_attempts")]
    pub alias_attempts: usize,
    /// How long a failed account is deprioritized
    #[serde(default = "default_failure_window", deserialize_with = "human_duration")]
    pub failure_window: Duration,
    /// Period of the background model registry refresh
    #[serde(default = "default_refresh_interval", deserialize_with = "human_duration")]
    pub refresh_interval: Duration,
    #[serde(default = "default_connect_timeout", deserialize_with = "human_duration")]
    pub connect_timeout: Duration,
    /// Deadline for one account's model listing fetch, body included
    #[serde(default = "default_discovery_timeout", deserialize_with = "human_duration")]
    pub discovery_timeout: Duration,
    /// Upper bound on an upstream error body held in memory for replay
    #[serde(default = "default_max_error_body_bytes")]
    pub max_error_body_bytes: usize,
    /// Fixed seed for account and pattern selection
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default = "default_native_protocols")]
    pub native_protocols: Vec<NativeProtocolConfig>,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            mode: RoutingMode::default(),
            direct_attempts: default_direct_attempts(),
            alias_attempts: default_alias_attempts(),
            failure_window: default_failure_window(),
            refresh_interval: default_refresh_interval(),
            connect_timeout: default_connect_timeout(),
            discovery_timeout: default_discovery_timeout(),
            max_error_body_bytes: default_max_error_body_bytes(),
            seed: None,
            native_protocols: default_native_protocols(),
        }
    }
}

/// Provider-native API paths that use the family's own auth convention
///
/// When a request path starts with one of `paths` and the chosen account is
/// eligible for `family`, the key is sent in `api_key_header` instead of a
/// bearer token and `headers` are added unless the caller already set them.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NativeProtocolConfig {
    pub family: String,
    pub paths: Vec<String>,
    #[serde(default = "default_api_key_header")]
    pub api_key_header: String,
    #[serde(default)]
    pub headers: IndexMap<String, String>,
}

fn default_native_protocols() -> Vec<NativeProtocolConfig> {
    let mut headers = IndexMap::new();
    headers.insert("anthropic-version".to_owned(), "2023-06-01".to_owned());

    vec![NativeProtocolConfig {
        family: "claude".to_owned(),
        paths: ["/messages", "/messages/batches", "/files", "/skills"]
            .into_iter()
            .map(str::to_owned)
            .collect(),
        api_key_header: default_api_key_header(),
        headers,
    }]
}

fn default_api_key_header() -> String {
    "x-api-key".to_owned()
}

const fn default_direct_attempts() -> usize {
    2
}

const fn default_alias_attempts() -> usize {
    3
}

const fn default_failure_window() -> Duration {
    Duration::from_secs(10 * 60)
}

const fn default_refresh_interval() -> Duration {
    Duration::from_secs(3 * 60 * 60)
}

const fn default_connect_timeout() -> Duration {
    Duration::from_secs(10)
}

const fn default_discovery_timeout() -> Duration {
    Duration::from_secs(30)
}

const fn default_max_error_body_bytes() -> usize {
    1024 * 1024
}

fn human_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    duration_str::parse(&raw).map_err(|e| serde::de::Error::custom(format!("invalid duration '{raw}': {e}")))
}
