//! Background model listing discovery
//!
//! Fetches each enabled account's `/models` listing and rebuilds the
//! registry, once before serving and then on a fixed period.

use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

use airgate_core::Account;
use airgate_store::{AccountStore, StoreError};
use async_trait::async_trait;
use bytes::Bytes;
use flate2::read::GzDecoder;
use http::{StatusCode, header};
use reqwest::Client;
use secrecy::ExposeSecret;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::forwarder::build_target_url;
use crate::protocol::{ModelDescriptor, UpstreamModelList};
use crate::registry::{ModelRegistry, RefreshSummary};

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("unexpected status code: {0}")]
    Status(StatusCode),
    #[error("failed to parse response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("listing not received within {0:?}")]
    Timeout(Duration),
}

/// Where model listings come from
#[async_trait]
pub trait ModelSource: Send + Sync {
    async fn list_models(&self, account: &Account) -> Result<Vec<ModelDescriptor>, FetchError>;
}

/// Fetches `GET {base}/models` with the account's bearer key
///
/// Each fetch, body included, must finish within `timeout`; a stalled
/// account counts as failed instead of holding up the whole refresh.
pub struct HttpModelSource {
    client: Client,
    timeout: Duration,
}

impl HttpModelSource {
    pub const fn new(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    async fn fetch(&self, account: &Account) -> Result<Vec<ModelDescriptor>, FetchError> {
        let url = build_target_url(&account.base_url, "/models", None);
        tracing::debug!(account = %account.name, %url, "fetching model listing");

        let response = self
            .client
            .get(&url)
            .header(header::ACCEPT_ENCODING, "identity")
            .bearer_auth(account.api_key.expose_secret())
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            return Err(FetchError::Status(response.status()));
        }

        let gzipped = response
            .headers()
            .get(header::CONTENT_ENCODING)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("gzip"));

        let raw = response.bytes().await?;
        let body = if gzipped { gunzip_or_raw(raw) } else { raw };

        let listing: UpstreamModelList = serde_json::from_slice(&body)?;
        Ok(listing.data)
    }
}

#[async_trait]
impl ModelSource for HttpModelSource {
    async fn list_models(&self, account: &Account) -> Result<Vec<ModelDescriptor>, FetchError> {
        tokio::time::timeout(self.timeout, self.fetch(account))
            .await
            .map_err(|_| FetchError::Timeout(self.timeout))?
    }
}

/// Decompress a gzip body, falling back to the bytes as received
///
/// Some upstreams label plain JSON as gzip.
fn gunzip_or_raw(raw: Bytes) -> Bytes {
    let mut decoded = Vec::new();

    match GzDecoder::new(raw.as_ref()).read_to_end(&mut decoded) {
        Ok(_) => Bytes::from(decoded),
        Err(e) => {
            tracing::debug!(error = %e, "gzip decode failed, using raw body");
            raw
        }
    }
}

/// Rebuild the registry from the store's enabled accounts
///
/// # Errors
///
/// Returns the store error; the current snapshot is left in place
pub async fn refresh_from_store(
    registry: &ModelRegistry,
    source: &dyn ModelSource,
    accounts: &dyn AccountStore,
) -> Result<RefreshSummary, StoreError> {
    let enabled = accounts.enabled_accounts().await?;

    if enabled.is_empty() {
        tracing::warn!("no enabled accounts, model registry is empty");
    }

    Ok(registry.refresh(source, enabled).await)
}

/// Spawn the periodic refresh loop
///
/// The first tick fires one `period` from now; the startup refresh is the
/// caller's job. The task ends when `shutdown` is cancelled, abandoning a
/// refresh that is still in flight.
pub fn start_discovery(
    registry: Arc<ModelRegistry>,
    source: Arc<dyn ModelSource>,
    accounts: Arc<dyn AccountStore>,
    period: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                _ = interval.tick() => {
                    tokio::select! {
                        () = shutdown.cancelled() => break,
                        result = refresh_from_store(&registry, source.as_ref(), accounts.as_ref()) => {
                            if let Err(e) = result {
                                tracing::warn!(error = %e, "scheduled model refresh failed");
                            }
                        }
                    }
                }
            }
        }

        tracing::debug!("model discovery stopped");
    })
}
