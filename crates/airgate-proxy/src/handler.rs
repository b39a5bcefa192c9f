//! Axum handlers for the public `/v1` surface

use airgate_config::RoutingMode;
use airgate_core::{ErrorEnvelope, HttpError};
use axum::extract::{DefaultBodyLimit, Query, State};
use axum::http::{HeaderMap, Method, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing};
use bytes::Bytes;
use serde::Deserialize;

use crate::forwarder::ForwardRequest;
use crate::orchestrator::RouteOutcome;
use crate::protocol::{ModelDescriptor, ModelList};
use crate::state::ProxyState;
use crate::stream;

/// Router for `GET /v1/models` and the catch-all proxy route
pub fn proxy_router(state: ProxyState, max_request_body: usize) -> Router {
    Router::new()
        .route("/v1/models", routing::get(list_models))
        .route("/v1/{*path}", routing::any(proxy))
        .layer(DefaultBodyLimit::max(max_request_body))
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
struct ListModelsQuery {
    family: Option<String>,
}

/// Handle `GET /v1/models`
async fn list_models(
    State(state): State<ProxyState>,
    Query(query): Query<ListModelsQuery>,
    headers: HeaderMap,
) -> Response {
    let listing = &state.inner.listing;
    let reveal_hidden = headers
        .get(listing.opt_in_header.as_str())
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"));

    let models = match state.mode() {
        RoutingMode::Direct => direct_listing(&state).await,
        RoutingMode::Alias => match alias_listing(&state, query.family.as_deref()).await {
            Ok(models) => models,
            Err(e) => return error_response(&e),
        },
    };

    let data = models
        .into_iter()
        .filter(|model| {
            reveal_hidden || {
                let id = model.id.to_lowercase();
                !listing
                    .hidden_keywords
                    .iter()
                    .any(|keyword| id.contains(&keyword.to_lowercase()))
            }
        })
        .collect();

    Json(ModelList::new(data)).into_response()
}

/// Registry models, labelled with the accounts serving them
async fn direct_listing(state: &ProxyState) -> Vec<ModelDescriptor> {
    let snapshot = state.registry().snapshot().await;

    snapshot
        .models()
        .iter()
        .map(|(id, accounts)| {
            let mut descriptor = snapshot
                .descriptor(id)
                .cloned()
                .unwrap_or_else(|| ModelDescriptor::new(id.as_str()));

            if !accounts.is_empty() {
                descriptor.owned_by = accounts
                    .iter()
                    .map(|account| account.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
            }

            descriptor
        })
        .collect()
}

/// Enabled aliases, optionally for a single family
async fn alias_listing(
    state: &ProxyState,
    family: Option<&str>,
) -> Result<Vec<ModelDescriptor>, crate::ProxyError> {
    let mut aliases = state.inner.aliases.enabled_aliases(family).await?;
    aliases.sort_by(|a, b| a.id.cmp(&b.id));

    Ok(aliases
        .into_iter()
        .map(|alias| {
            let mut descriptor = ModelDescriptor::new(alias.id);
            descriptor.owned_by = alias.family.unwrap_or_else(|| "airgate".to_owned());
            descriptor
        })
        .collect())
}

/// Handle `ANY /v1/{*path}`
async fn proxy(State(state): State<ProxyState>, method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Response {
    let path = uri.path().strip_prefix("/v1").unwrap_or(uri.path()).to_owned();

    let request = ForwardRequest {
        method,
        path,
        query: uri.query().map(str::to_owned),
        headers,
        body,
    };

    match state.inner.orchestrator.route(request).await {
        Ok(RouteOutcome::Relayed { response, account, .. }) => stream::relay(response, &account.name),
        Ok(RouteOutcome::Replayed(failure)) => stream::replay(failure),
        Err(e) => {
            tracing::debug!(error = %e, "request rejected");
            error_response(&e)
        }
    }
}

/// OpenAI-style JSON error response
pub fn error_response<E: HttpError + ?Sized>(error: &E) -> Response {
    (error.status_code(), Json(ErrorEnvelope::from_error(error))).into_response()
}
