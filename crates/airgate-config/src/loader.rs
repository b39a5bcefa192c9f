use std::{collections::HashSet, path::Path};

use http::{HeaderName, HeaderValue};
use secrecy::ExposeSecret;

use crate::Config;

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Reads the file, expands `{{ env.VAR }}` placeholders, then
    /// deserializes and validates the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, expansion or parsing
    /// fails, or the result is inconsistent
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;

        Self::from_toml(&raw)
    }

    /// Parse and validate configuration from TOML text
    ///
    /// # Errors
    ///
    /// Returns an error if expansion or parsing fails, or validation fails
    pub fn from_toml(raw: &str) -> anyhow::Result<Self> {
        let expanded =
            crate::env::expand_env(raw).map_err(|e| anyhow::anyhow!("config variable expansion failed: {e}"))?;

        let config: Self = toml::from_str(&expanded).map_err(|e| anyhow::anyhow!("failed to parse config: {e}"))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate that the configuration is internally consistent
    ///
    /// # Errors
    ///
    /// Returns an error naming the first offending setting
    pub fn validate(&self) -> anyhow::Result<()> {
        self.validate_accounts()?;
        self.validate_aliases()?;
        self.validate_routing()?;
        Ok(())
    }

    fn validate_accounts(&self) -> anyhow::Result<()> {
        let mut ids = HashSet::new();
        let mut names = HashSet::new();

        for account in &self.accounts {
            if !ids.insert(account.id) {
                anyhow::bail!("duplicate account id {}", account.id);
            }
            if account.name.trim().is_empty() {
                anyhow::bail!("account {} has an empty name", account.id);
            }
            if !names.insert(account.name.as_str()) {
                anyhow::bail!("duplicate account name '{}'", account.name);
            }
            if account.api_key.expose_secret().is_empty() {
                anyhow::bail!("account '{}' has an empty api_key", account.name);
            }
            if account.base_url.cannot_be_a_base() {
                anyhow::bail!("account '{}' base_url is not a valid base URL", account.name);
            }
        }

        Ok(())
    }

    fn validate_aliases(&self) -> anyhow::Result<()> {
        let mut ids = HashSet::new();

        for alias in &self.aliases {
            if alias.id.trim().is_empty() {
                anyhow::bail!("alias id must not be empty");
            }
            if !ids.insert(alias.id.as_str()) {
                anyhow::bail!("duplicate alias id '{}'", alias.id);
            }
        }

        Ok(())
    }

    fn validate_routing(&self) -> anyhow::Result<()> {
        let routing = &self.routing;

        if routing.direct_attempts == 0 {
            anyhow::bail!("routing.direct_attempts must be at least 1");
        }
        if routing.alias_attempts == 0 {
            anyhow::bail!("routing.alias_attempts must be at least 1");
        }
        if routing.refresh_interval.is_zero() {
            anyhow::bail!("routing.refresh_interval must be greater than 0");
        }
        if routing.discovery_timeout.is_zero() {
            anyhow::bail!("routing.discovery_timeout must be greater than 0");
        }

        for protocol in &routing.native_protocols {
            if protocol.family.trim().is_empty() {
                anyhow::bail!("native protocol family must not be empty");
            }
            if protocol.paths.is_empty() {
                anyhow::bail!("native protocol '{}' must list at least one path", protocol.family);
            }
            if let Some(path) = protocol.paths.iter().find(|p| !p.starts_with('/')) {
                anyhow::bail!("native protocol '{}' path '{path}' must start with '/'", protocol.family);
            }
            HeaderName::from_bytes(protocol.api_key_header.as_bytes()).map_err(|e| {
                anyhow::anyhow!("native protocol '{}' has an invalid api_key_header: {e}", protocol.family)
            })?;
            for (name, value) in &protocol.headers {
                HeaderName::from_bytes(name.as_bytes())
                    .map_err(|e| anyhow::anyhow!("native protocol '{}' header '{name}': {e}", protocol.family))?;
                HeaderValue::from_str(value)
                    .map_err(|e| anyhow::anyhow!("native protocol '{}' header '{name}': {e}", protocol.family))?;
            }
        }

        Ok(())
    }
}
