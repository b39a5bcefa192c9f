//! Model to account registry
//!
//! Each refresh builds a complete [`Snapshot`] off to the side and swaps it
//! in with a single assignment, so a reader always sees one refresh in its
//! entirety. Readers clone the `Arc` and release the lock before doing any
//! work with it.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::SystemTime;

use airgate_core::Account;
use futures_util::future::join_all;
use tokio::sync::RwLock;

use crate::discovery::ModelSource;
use crate::pattern::{Pattern, PatternError};
use crate::protocol::ModelDescriptor;
use crate::random::RandomSource;

/// Immutable view of one refresh
#[derive(Debug, Default)]
pub struct Snapshot {
    models: BTreeMap<String, Vec<Account>>,
    descriptors: BTreeMap<String, ModelDescriptor>,
    refreshed_at: Option<SystemTime>,
}

impl Snapshot {
    /// Merge per-account listings in order
    ///
    /// An account is recorded at most once per model id, and the first
    /// descriptor seen for an id is kept.
    pub fn build(listings: impl IntoIterator<Item = (Account, Vec<ModelDescriptor>)>) -> Self {
        let mut models: BTreeMap<String, Vec<Account>> = BTreeMap::new();
        let mut descriptors = BTreeMap::new();

        for (account, listing) in listings {
            let mut seen = HashSet::new();

            for descriptor in listing {
                if descriptor.id.is_empty() || !seen.insert(descriptor.id.clone()) {
                    continue;
                }

                let serving = models.entry(descriptor.id.clone()).or_default();
                if !serving.iter().any(|a| a.id == account.id) {
                    serving.push(account.clone());
                }

                descriptors.entry(descriptor.id.clone()).or_insert(descriptor);
            }
        }

        Self {
            models,
            descriptors,
            refreshed_at: Some(SystemTime::now()),
        }
    }

    pub fn accounts_for_model(&self, model_id: &str) -> &[Account] {
        self.models.get(model_id).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn descriptor(&self, model_id: &str) -> Option<&ModelDescriptor> {
        self.descriptors.get(model_id)
    }

    /// Model ids in ascending order
    pub fn model_ids(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }

    pub const fn models(&self) -> &BTreeMap<String, Vec<Account>> {
        &self.models
    }

    pub const fn refreshed_at(&self) -> Option<SystemTime> {
        self.refreshed_at
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

/// Why a model pattern did not resolve
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("pattern '{pattern}' is invalid: {source}")]
    Invalid {
        pattern: String,
        #[source]
        source: PatternError,
    },
    #[error("no models available")]
    NoModels,
    #[error("model '{model}' not found")]
    UnknownModel { model: String },
    #[error("no models found matching pattern '{pattern}'")]
    NoMatch { pattern: String },
}

/// Counts from one refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshSummary {
    pub accounts: usize,
    pub failed: usize,
    pub models: usize,
}

pub struct ModelRegistry {
    snapshot: RwLock<Arc<Snapshot>>,
    random: Arc<RandomSource>,
}

impl ModelRegistry {
    pub fn new(random: Arc<RandomSource>) -> Self {
        Self {
            snapshot: RwLock::new(Arc::new(Snapshot::default())),
            random,
        }
    }

    /// Current snapshot; holding it does not block refreshes
    pub async fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&*self.snapshot.read().await)
    }

    /// Swap in a new snapshot
    pub async fn replace(&self, snapshot: Snapshot) {
        let snapshot = Arc::new(snapshot);
        *self.snapshot.write().await = snapshot;
    }

    /// Fetch every account's listing concurrently and swap in the result
    ///
    /// A failing account is logged and left out; it never aborts the batch.
    /// Accounts are merged in the order given once every fetch has finished.
    pub async fn refresh(&self, source: &dyn ModelSource, accounts: Vec<Account>) -> RefreshSummary {
        let total = accounts.len();

        let fetches = accounts.into_iter().map(|account| async move {
            let result = source.list_models(&account).await;
            (account, result)
        });

        let mut failed = 0;
        let mut listings = Vec::with_capacity(total);

        for (account, result) in join_all(fetches).await {
            match result {
                Ok(listing) => {
                    tracing::debug!(
                        account = %account.name,
                        account_id = account.id,
                        count = listing.len(),
                        "fetched model listing"
                    );
                    listings.push((account, listing));
                }
                Err(e) => {
                    failed += 1;
                    tracing::warn!(
                        account = %account.name,
                        account_id = account.id,
                        error = %e,
                        "failed to fetch model listing"
                    );
                }
            }
        }

        let snapshot = Snapshot::build(listings);
        let summary = RefreshSummary {
            accounts: total,
            failed,
            models: snapshot.models.len(),
        };

        self.replace(snapshot).await;

        tracing::info!(
            accounts = summary.accounts,
            failed = summary.failed,
            models = summary.models,
            "model registry refreshed"
        );

        summary
    }

    /// Accounts serving `model_id`, in listing order; empty when unknown
    pub async fn accounts_for_model(&self, model_id: &str) -> Vec<Account> {
        self.snapshot().await.accounts_for_model(model_id).to_vec()
    }

    pub async fn all_models(&self) -> BTreeMap<String, Vec<Account>> {
        self.snapshot().await.models.clone()
    }

    pub async fn all_descriptors(&self) -> BTreeMap<String, ModelDescriptor> {
        self.snapshot().await.descriptors.clone()
    }

    /// Every account serving at least one model, deduplicated by id
    pub async fn all_accounts(&self) -> Vec<Account> {
        let snapshot = self.snapshot().await;

        let mut seen = HashSet::new();
        let mut accounts: Vec<Account> = snapshot
            .models
            .values()
            .flatten()
            .filter(|account| seen.insert(account.id))
            .cloned()
            .collect();
        accounts.sort_unstable_by_key(|account| account.id);
        accounts
    }

    /// Turn a literal id or wildcard pattern into one known model id
    ///
    /// Several matches are broken uniformly at random.
    ///
    /// # Errors
    ///
    /// Returns a [`ResolveError`] for malformed patterns, an empty registry,
    /// or when nothing matches
    pub async fn resolve_pattern(&self, pattern: &str) -> Result<String, ResolveError> {
        let parsed = Pattern::parse(pattern).map_err(|source| ResolveError::Invalid {
            pattern: pattern.to_owned(),
            source,
        })?;

        let snapshot = self.snapshot().await;
        if snapshot.is_empty() {
            return Err(ResolveError::NoModels);
        }

        if let Pattern::Exact(model) = parsed {
            return if snapshot.models.contains_key(&model) {
                Ok(model)
            } else {
                Err(ResolveError::UnknownModel { model })
            };
        }

        let matches: Vec<&str> = snapshot.model_ids().filter(|id| parsed.matches(id)).collect();

        match matches.as_slice() {
            [] => Err(ResolveError::NoMatch {
                pattern: pattern.to_owned(),
            }),
            [only] => Ok((*only).to_owned()),
            many => Ok(many[self.random.index(many.len())].to_owned()),
        }
    }
}
