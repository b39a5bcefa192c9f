//! Operator debug routes under `/api/debug`
//!
//! Nothing here ever serialises an API key; accounts appear by id and name.

use std::collections::{BTreeMap, HashMap};
use std::time::{SystemTime, UNIX_EPOCH};

use airgate_proxy::ProxyState;
use airgate_proxy::protocol::ModelDescriptor;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing};
use http::StatusCode;
use serde::Serialize;

pub fn admin_router(state: ProxyState) -> Router {
    Router::new()
        .route("/api/debug/models", routing::get(dump_models))
        .route("/api/debug/models/reload", routing::post(reload_models))
        .route("/api/debug/failures", routing::get(list_failures))
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct ModelsDump {
    mode: String,
    refreshed_at: Option<u64>,
    model_count: usize,
    account_count: usize,
    models: BTreeMap<String, ModelEntry>,
}

/// One model's merged descriptor and the accounts serving it
#[derive(Debug, Serialize)]
struct ModelEntry {
    #[serde(flatten)]
    descriptor: ModelDescriptor,
    accounts: Vec<AccountRef>,
}

#[derive(Debug, Serialize)]
struct AccountRef {
    id: u64,
    name: String,
}

#[derive(Debug, Serialize)]
struct FailuresDump {
    window_secs: u64,
    failures: Vec<FailureEntry>,
}

#[derive(Debug, Serialize)]
struct FailureEntry {
    account_id: u64,
    account: Option<String>,
    failed_at: u64,
    expires_in_secs: u64,
}

fn unix_secs(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

/// Handle `GET /api/debug/models`
async fn dump_models(State(state): State<ProxyState>) -> Response {
    let registry = state.registry();
    let mut descriptors = registry.all_descriptors().await;

    let models: BTreeMap<String, ModelEntry> = registry
        .all_models()
        .await
        .into_iter()
        .map(|(id, accounts)| {
            // A refresh may land between the two reads
            let descriptor = descriptors
                .remove(&id)
                .unwrap_or_else(|| ModelDescriptor::new(id.clone()));
            let accounts = accounts
                .into_iter()
                .map(|account| AccountRef {
                    id: account.id,
                    name: account.name,
                })
                .collect();
            (id, ModelEntry { descriptor, accounts })
        })
        .collect();

    let dump = ModelsDump {
        mode: state.mode().to_string(),
        refreshed_at: registry.snapshot().await.refreshed_at().map(unix_secs),
        model_count: models.len(),
        account_count: registry.all_accounts().await.len(),
        models,
    };

    Json(dump).into_response()
}

/// Handle `POST /api/debug/models/reload`; the refresh runs in the background
async fn reload_models(State(state): State<ProxyState>) -> Response {
    tracing::info!("model reload requested");
    drop(state.trigger_refresh());

    (
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "status": "reloading" })),
    )
        .into_response()
}

/// Handle `GET /api/debug/failures`
async fn list_failures(State(state): State<ProxyState>) -> Response {
    let now = SystemTime::now();
    let window = state.failures().window();

    let names: HashMap<u64, String> = state
        .registry()
        .all_accounts()
        .await
        .into_iter()
        .map(|account| (account.id, account.name))
        .collect();

    let failures = state
        .failures()
        .failed_accounts_at(now)
        .into_iter()
        .map(|(account_id, failed_at)| {
            let elapsed = now.duration_since(failed_at).unwrap_or_default();
            FailureEntry {
                account_id,
                account: names.get(&account_id).cloned(),
                failed_at: unix_secs(failed_at),
                expires_in_secs: window.saturating_sub(elapsed).as_secs(),
            }
        })
        .collect();

    Json(FailuresDump {
        window_secs: window.as_secs(),
        failures,
    })
    .into_response()
}
