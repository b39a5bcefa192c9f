//! Account and alias persistence seams
//!
//! The routing engine only reads through these traits; how accounts and
//! aliases are stored and edited lives behind them.

#![allow(clippy::must_use_candidate)]

mod error;
mod memory;

use airgate_core::{Account, ModelAlias};
use async_trait::async_trait;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;

#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Every account currently flagged as enabled, in store order
    async fn enabled_accounts(&self) -> StoreResult<Vec<Account>>;
}

#[async_trait]
pub trait AliasStore: Send + Sync {
    /// Look up an alias by its logical id, enabled or not
    async fn alias(&self, id: &str) -> StoreResult<Option<ModelAlias>>;

    /// Enabled aliases, optionally restricted to one provider family
    async fn enabled_aliases(&self, family: Option<&str>) -> StoreResult<Vec<ModelAlias>>;
}
