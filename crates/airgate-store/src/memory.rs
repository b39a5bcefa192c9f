use airgate_config::Config;
use airgate_core::{Account, ModelAlias};
use async_trait::async_trait;
use indexmap::IndexMap;
use tokio::sync::RwLock;

use crate::{AccountStore, AliasStore, StoreError, StoreResult};

/// Process-local store seeded from configuration
///
/// Contents live only as long as the process; edits made through the
/// mutators are visible to the next registry refresh.
#[derive(Debug, Default)]
pub struct MemoryStore {
    accounts: RwLock<IndexMap<u64, Account>>,
    aliases: RwLock<IndexMap<String, ModelAlias>>,
}

impl MemoryStore {
    pub fn new(accounts: impl IntoIterator<Item = Account>, aliases: impl IntoIterator<Item = ModelAlias>) -> Self {
        Self {
            accounts: RwLock::new(accounts.into_iter().map(|a| (a.id, a)).collect()),
            aliases: RwLock::new(aliases.into_iter().map(|a| (a.id.clone(), a)).collect()),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let accounts = config.accounts.iter().map(|account| Account {
            id: account.id,
            name: account.name.clone(),
            base_url: account.base_url.clone(),
            api_key: account.api_key.clone(),
            enabled: account.enabled,
            ext: account.ext.clone(),
            updated_at: account.updated_at,
        });

        let aliases = config.aliases.iter().map(|alias| ModelAlias {
            id: alias.id.clone(),
            enabled: alias.enabled,
            models: alias.models.clone(),
            family: alias.family.clone(),
        });

        Self::new(accounts, aliases)
    }

    /// Insert or replace an account, keeping its position when it exists
    pub async fn upsert_account(&self, account: Account) {
        self.accounts.write().await.insert(account.id, account);
    }

    /// # Errors
    ///
    /// Returns [`StoreError::AccountNotFound`] for an unknown id
    pub async fn set_account_enabled(&self, id: u64, enabled: bool) -> StoreResult<()> {
        let mut accounts = self.accounts.write().await;
        let account = accounts.get_mut(&id).ok_or(StoreError::AccountNotFound(id))?;
        account.enabled = enabled;
        Ok(())
    }

    pub async fn upsert_alias(&self, alias: ModelAlias) {
        self.aliases.write().await.insert(alias.id.clone(), alias);
    }

    /// # Errors
    ///
    /// Returns [`StoreError::AliasNotFound`] for an unknown id
    pub async fn set_alias_enabled(&self, id: &str, enabled: bool) -> StoreResult<()> {
        let mut aliases = self.aliases.write().await;
        let alias = aliases
            .get_mut(id)
            .ok_or_else(|| StoreError::AliasNotFound(id.to_owned()))?;
        alias.enabled = enabled;
        Ok(())
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn enabled_accounts(&self) -> StoreResult<Vec<Account>> {
        let accounts = self.accounts.read().await;
        Ok(accounts.values().filter(|a| a.enabled).cloned().collect())
    }
}

#[async_trait]
impl AliasStore for MemoryStore {
    async fn alias(&self, id: &str) -> StoreResult<Option<ModelAlias>> {
        Ok(self.aliases.read().await.get(id).cloned())
    }

    async fn enabled_aliases(&self, family: Option<&str>) -> StoreResult<Vec<ModelAlias>> {
        let aliases = self.aliases.read().await;

        Ok(aliases
            .values()
            .filter(|alias| alias.enabled)
            .filter(|alias| match family {
                Some(family) => alias.family.as_deref().is_some_and(|f| f.eq_ignore_ascii_case(family)),
                None => true,
            })
            .cloned()
            .collect())
    }
}
