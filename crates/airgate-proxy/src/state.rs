//! Shared routing services handed to the HTTP handlers

use std::sync::Arc;
use std::time::Duration;

use airgate_config::{Config, ModelListingConfig, RoutingMode};
use airgate_store::{AccountStore, AliasStore, StoreError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::discovery::{self, HttpModelSource, ModelSource};
use crate::failure::FailureTracker;
use crate::forwarder::{self, Forward, HttpForwarder};
use crate::orchestrator::{Orchestrator, RetryPolicy};
use crate::random::RandomSource;
use crate::registry::{ModelRegistry, RefreshSummary};

/// Everything the proxy needs, built by the caller
///
/// [`ProxyState::from_config`] wires the production implementations; tests
/// swap in their own sources and forwarders.
pub struct ProxyComponents {
    pub registry: Arc<ModelRegistry>,
    pub failures: Arc<FailureTracker>,
    pub random: Arc<RandomSource>,
    pub forwarder: Arc<dyn Forward>,
    pub source: Arc<dyn ModelSource>,
    pub accounts: Arc<dyn AccountStore>,
    pub aliases: Arc<dyn AliasStore>,
    pub policy: RetryPolicy,
    pub refresh_interval: Duration,
    pub listing: ModelListingConfig,
}

#[derive(Clone)]
pub struct ProxyState {
    pub(crate) inner: Arc<ProxyStateInner>,
}

pub(crate) struct ProxyStateInner {
    pub(crate) registry: Arc<ModelRegistry>,
    pub(crate) failures: Arc<FailureTracker>,
    pub(crate) orchestrator: Orchestrator,
    pub(crate) source: Arc<dyn ModelSource>,
    pub(crate) accounts: Arc<dyn AccountStore>,
    pub(crate) aliases: Arc<dyn AliasStore>,
    pub(crate) refresh_interval: Duration,
    pub(crate) listing: ModelListingConfig,
}

impl ProxyState {
    pub fn new(components: ProxyComponents) -> Self {
        let orchestrator = Orchestrator::new(
            Arc::clone(&components.registry),
            Arc::clone(&components.failures),
            components.forwarder,
            Arc::clone(&components.aliases),
            components.random,
            components.policy,
        );

        Self {
            inner: Arc::new(ProxyStateInner {
                registry: components.registry,
                failures: components.failures,
                orchestrator,
                source: components.source,
                accounts: components.accounts,
                aliases: components.aliases,
                refresh_interval: components.refresh_interval,
                listing: components.listing,
            }),
        }
    }

    /// Build the production state: one shared HTTP client for discovery and forwarding
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client or a native protocol cannot be built
    pub fn from_config(
        config: &Config,
        accounts: Arc<dyn AccountStore>,
        aliases: Arc<dyn AliasStore>,
    ) -> anyhow::Result<Self> {
        let routing = &config.routing;
        let client = forwarder::http_client(routing.connect_timeout)?;

        let random = Arc::new(RandomSource::from_seed(routing.seed));
        let registry = Arc::new(ModelRegistry::new(Arc::clone(&random)));
        let forwarder = HttpForwarder::from_config(client.clone(), routing)?;

        Ok(Self::new(ProxyComponents {
            registry,
            failures: Arc::new(FailureTracker::new(routing.failure_window)),
            random,
            forwarder: Arc::new(forwarder),
            source: Arc::new(HttpModelSource::new(client, routing.discovery_timeout)),
            accounts,
            aliases,
            policy: RetryPolicy::from_config(routing),
            refresh_interval: routing.refresh_interval,
            listing: config.server.models.clone(),
        }))
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.inner.registry
    }

    pub fn failures(&self) -> &FailureTracker {
        &self.inner.failures
    }

    pub fn mode(&self) -> RoutingMode {
        self.inner.orchestrator.policy().mode
    }

    /// Rebuild the registry now and wait for it
    ///
    /// # Errors
    ///
    /// Returns the store error; the current snapshot is kept
    pub async fn refresh(&self) -> Result<RefreshSummary, StoreError> {
        discovery::refresh_from_store(
            &self.inner.registry,
            self.inner.source.as_ref(),
            self.inner.accounts.as_ref(),
        )
        .await
    }

    /// Start a refresh in the background and return immediately
    pub fn trigger_refresh(&self) -> JoinHandle<()> {
        let state = self.clone();

        tokio::spawn(async move {
            match state.refresh().await {
                Ok(summary) => tracing::info!(
                    accounts = summary.accounts,
                    failed = summary.failed,
                    models = summary.models,
                    "manual model refresh complete"
                ),
                Err(e) => tracing::warn!(error = %e, "manual model refresh failed"),
            }
        })
    }

    /// Run the periodic refresh until `shutdown` is cancelled
    pub fn spawn_discovery(&self, shutdown: CancellationToken) -> JoinHandle<()> {
        discovery::start_discovery(
            Arc::clone(&self.inner.registry),
            Arc::clone(&self.inner.source),
            Arc::clone(&self.inner.accounts),
            self.inner.refresh_interval,
            shutdown,
        )
    }
}
