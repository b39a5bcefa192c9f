//! Request-level routing: resolve the model, pick accounts, retry, relay

use std::sync::Arc;

use airgate_config::{RoutingConfig, RoutingMode};
use airgate_core::Account;
use airgate_store::AliasStore;
use bytes::Bytes;
use serde_json::Value;

use crate::error::ProxyError;
use crate::failure::FailureTracker;
use crate::forwarder::{AttemptOutcome, Forward, ForwardRequest, UpstreamFailure, UpstreamResponse};
use crate::random::RandomSource;
use crate::registry::ModelRegistry;

/// How many accounts a request may try
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub mode: RoutingMode,
    pub direct_attempts: usize,
    pub alias_attempts: usize,
}

impl RetryPolicy {
    pub const DEFAULT_DIRECT_ATTEMPTS: usize = 2;
    pub const DEFAULT_ALIAS_ATTEMPTS: usize = 3;

    pub const fn new(mode: RoutingMode) -> Self {
        Self {
            mode,
            direct_attempts: Self::DEFAULT_DIRECT_ATTEMPTS,
            alias_attempts: Self::DEFAULT_ALIAS_ATTEMPTS,
        }
    }

    pub const fn from_config(config: &RoutingConfig) -> Self {
        Self {
            mode: config.mode,
            direct_attempts: config.direct_attempts,
            alias_attempts: config.alias_attempts,
        }
    }

    pub const fn ceiling(&self) -> usize {
        match self.mode {
            RoutingMode::Direct => self.direct_attempts,
            RoutingMode::Alias => self.alias_attempts,
        }
    }

    /// Attempts allowed against `candidates` serving accounts
    pub fn budget(&self, candidates: usize) -> usize {
        self.ceiling().min(candidates)
    }
}

/// How a routed request ended
#[derive(Debug)]
pub enum RouteOutcome {
    /// An account answered 2xx; its body is still unread
    Relayed {
        response: UpstreamResponse,
        account: Account,
        model: String,
    },
    /// Every attempt failed; this is the last upstream error response
    Replayed(UpstreamFailure),
}

pub struct Orchestrator {
    registry: Arc<ModelRegistry>,
    failures: Arc<FailureTracker>,
    forwarder: Arc<dyn Forward>,
    aliases: Arc<dyn AliasStore>,
    random: Arc<RandomSource>,
    policy: RetryPolicy,
}

impl Orchestrator {
    pub fn new(
        registry: Arc<ModelRegistry>,
        failures: Arc<FailureTracker>,
        forwarder: Arc<dyn Forward>,
        aliases: Arc<dyn AliasStore>,
        random: Arc<RandomSource>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            registry,
            failures,
            forwarder,
            aliases,
            random,
            policy,
        }
    }

    pub const fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Route one request to an account serving its model
    ///
    /// # Errors
    ///
    /// Returns a [`ProxyError`] when the model cannot be resolved, nobody
    /// serves it, or every attempt failed without an upstream response
    pub async fn route(&self, mut request: ForwardRequest) -> Result<RouteOutcome, ProxyError> {
        let model = self.resolve(&mut request).await?;

        let candidates = self.registry.accounts_for_model(&model).await;
        if candidates.is_empty() {
            return Err(ProxyError::ModelNotFound { model });
        }

        let budget = self.policy.budget(candidates.len());
        let mut last_failure = None;

        for attempt in 1..=budget {
            let account = self.select(&candidates);

            tracing::debug!(
                path = %request.path,
                %model,
                attempt,
                budget,
                account = %account.name,
                account_id = account.id,
                "forwarding request"
            );

            match self.forwarder.forward(account, &request).await {
                AttemptOutcome::Success(response) => {
                    self.failures.remove_failed(account.id);
                    tracing::info!(
                        path = %request.path,
                        %model,
                        attempt,
                        account = %account.name,
                        status = response.status.as_u16(),
                        "upstream accepted request"
                    );

                    return Ok(RouteOutcome::Relayed {
                        response,
                        account: account.clone(),
                        model,
                    });
                }
                AttemptOutcome::Failed(failure) => {
                    self.failures.add_failed(account.id);
                    tracing::warn!(
                        %model,
                        attempt,
                        budget,
                        account = %account.name,
                        status = failure.status.as_u16(),
                        "attempt failed with upstream error"
                    );
                    last_failure = Some(failure);
                }
                AttemptOutcome::Transport(error) => {
                    self.failures.add_failed(account.id);
                    tracing::warn!(
                        %model,
                        attempt,
                        budget,
                        account = %account.name,
                        %error,
                        "attempt failed without a response"
                    );
                }
            }
        }

        match last_failure {
            Some(failure) => Ok(RouteOutcome::Replayed(failure)),
            None => Err(ProxyError::BadGateway { attempts: budget }),
        }
    }

    /// Work out the concrete model id, rewriting the body in alias mode
    async fn resolve(&self, request: &mut ForwardRequest) -> Result<String, ProxyError> {
        let mut body: Value = serde_json::from_slice(&request.body)
            .map_err(|_| ProxyError::InvalidRequest("failed to parse request body as JSON".to_owned()))?;

        let requested = match body.get("model") {
            Some(Value::String(model)) if !model.is_empty() => model.clone(),
            _ => return Err(ProxyError::InvalidRequest("model is required".to_owned())),
        };

        if self.policy.mode == RoutingMode::Direct {
            return Ok(requested);
        }

        let alias = self
            .aliases
            .alias(&requested)
            .await?
            .ok_or_else(|| ProxyError::AliasNotFound {
                alias: requested.clone(),
            })?;

        if !alias.enabled {
            return Err(ProxyError::AliasDisabled { alias: alias.id });
        }
        if alias.models.is_empty() {
            return Err(ProxyError::AliasEmpty { alias: alias.id });
        }

        let entry = &alias.models[self.random.index(alias.models.len())];

        let model = if entry.contains('*') {
            let resolved = self
                .registry
                .resolve_pattern(entry)
                .await
                .map_err(|e| ProxyError::from_resolve(entry, e))?;
            tracing::debug!(alias = %alias.id, pattern = %entry, %resolved, "pattern resolved");
            resolved
        } else {
            entry.clone()
        };

        body["model"] = Value::String(model.clone());
        let rewritten = serde_json::to_vec(&body)
            .map_err(|e| ProxyError::InvalidRequest(format!("failed to rewrite request body: {e}")))?;
        request.body = Bytes::from(rewritten);

        Ok(model)
    }

    /// Random scan for an account outside its failure window
    ///
    /// When every candidate is suppressed one is drawn anyway.
    fn select<'a>(&self, candidates: &'a [Account]) -> &'a Account {
        let mut order: Vec<usize> = (0..candidates.len()).collect();
        self.random.shuffle(&mut order);

        order
            .into_iter()
            .map(|index| &candidates[index])
            .find(|account| !self.failures.is_failed(account.id))
            .unwrap_or_else(|| &candidates[self.random.index(candidates.len())])
    }
}
