//! One upstream HTTP call for one account

use std::io;
use std::pin::Pin;
use std::time::Duration;

use airgate_config::{NativeProtocolConfig, RoutingConfig};
use airgate_core::{Account, headers::upstream_request_headers};
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures_util::{Stream, StreamExt};
use http::header::{self, HeaderMap, HeaderName, HeaderValue};
use http::{Method, StatusCode};
use reqwest::Client;
use secrecy::ExposeSecret;
use url::Url;

/// Body of a relayed upstream response
pub type BodyStream = Pin<Box<dyn Stream<Item = Result<Bytes, io::Error>> + Send>>;

/// Inbound request as handed to an upstream account
#[derive(Debug, Clone)]
pub struct ForwardRequest {
    pub method: Method,
    /// Path below `/v1`, starting with `/`
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// A 2xx response whose body has not been read yet
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: BodyStream,
}

impl std::fmt::Debug for UpstreamResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// A non-2xx response read into memory for a possible replay
#[derive(Debug, Clone)]
pub struct UpstreamFailure {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

#[derive(Debug)]
pub enum AttemptOutcome {
    Success(UpstreamResponse),
    Failed(UpstreamFailure),
    /// No response at all
    Transport(String),
}

/// Issues a request to a single account
#[async_trait]
pub trait Forward: Send + Sync {
    async fn forward(&self, account: &Account, request: &ForwardRequest) -> AttemptOutcome;
}

/// Join an account base URL and an API path
///
/// A base URL that carries its own path (`/v1`, `/api/openai`, ...) gets the
/// request path appended directly; a bare host gets `/v1` in between.
pub fn build_target_url(base: &Url, path: &str, query: Option<&str>) -> String {
    let root = base.as_str().trim_end_matches('/');
    let has_path = !matches!(base.path(), "" | "/");
    let path = path.trim_start_matches('/');

    let mut url = if has_path {
        format!("{root}/{path}")
    } else {
        format!("{root}/v1/{path}")
    };

    if let Some(query) = query.filter(|q| !q.is_empty()) {
        url.push('?');
        url.push_str(query);
    }

    url
}

/// Shared upstream client: a connect timeout only, so long streams are never cut
///
/// # Errors
///
/// Returns an error if the TLS backend cannot be initialised
pub fn http_client(connect_timeout: Duration) -> anyhow::Result<Client> {
    Client::builder()
        .connect_timeout(connect_timeout)
        .pool_idle_timeout(Duration::from_secs(90))
        .pool_max_idle_per_host(100)
        .build()
        .map_err(|e| anyhow::anyhow!("failed to build HTTP client: {e}"))
}

/// Provider-native paths and how such requests authenticate
#[derive(Debug, Clone)]
pub struct NativeProtocol {
    family: String,
    paths: Vec<String>,
    api_key_header: HeaderName,
    headers: Vec<(HeaderName, HeaderValue)>,
}

impl NativeProtocol {
    /// # Errors
    ///
    /// Returns an error for invalid header names or values
    pub fn from_config(config: &NativeProtocolConfig) -> anyhow::Result<Self> {
        let api_key_header = HeaderName::from_bytes(config.api_key_header.as_bytes())?;

        let headers = config
            .headers
            .iter()
            .map(|(name, value)| -> anyhow::Result<_> {
                Ok((HeaderName::from_bytes(name.as_bytes())?, HeaderValue::from_str(value)?))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        Ok(Self {
            family: config.family.clone(),
            paths: config.paths.clone(),
            api_key_header,
            headers,
        })
    }

    /// Whether `path` is one of the protocol's paths or lies below one
    pub fn matches_path(&self, path: &str) -> bool {
        self.paths.iter().any(|prefix| {
            path.strip_prefix(prefix.as_str())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('/') || prefix.ends_with('/'))
        })
    }

    pub fn family(&self) -> &str {
        &self.family
    }
}

pub struct HttpForwarder {
    client: Client,
    native: Vec<NativeProtocol>,
    max_error_body: usize,
}

impl HttpForwarder {
    pub const fn new(client: Client, native: Vec<NativeProtocol>, max_error_body: usize) -> Self {
        Self {
            client,
            native,
            max_error_body,
        }
    }

    /// # Errors
    ///
    /// Returns an error if a native protocol is misconfigured
    pub fn from_config(client: Client, config: &RoutingConfig) -> anyhow::Result<Self> {
        let native = config
            .native_protocols
            .iter()
            .map(NativeProtocol::from_config)
            .collect::<anyhow::Result<Vec<_>>>()?;

        Ok(Self::new(client, native, config.max_error_body_bytes))
    }

    /// Headers for one attempt: the caller's, minus framing, plus the account's credentials
    fn headers_for(&self, account: &Account, request: &ForwardRequest) -> Result<HeaderMap, String> {
        let mut headers = upstream_request_headers(&request.headers);
        headers.insert(header::ACCEPT_ENCODING, HeaderValue::from_static("identity"));

        let native = self
            .native
            .iter()
            .find(|protocol| protocol.matches_path(&request.path) && account.supports_family(&protocol.family));

        if let Some(protocol) = native {
            let mut key = HeaderValue::from_str(account.api_key.expose_secret())
                .map_err(|_| format!("account '{}' has an API key that is not a valid header value", account.name))?;
            key.set_sensitive(true);

            headers.remove(header::AUTHORIZATION);
            headers.insert(protocol.api_key_header.clone(), key);

            for (name, value) in &protocol.headers {
                if !headers.contains_key(name) {
                    headers.insert(name.clone(), value.clone());
                }
            }
        } else {
            let mut bearer = HeaderValue::from_str(&format!("Bearer {}", account.api_key.expose_secret()))
                .map_err(|_| format!("account '{}' has an API key that is not a valid header value", account.name))?;
            bearer.set_sensitive(true);

            headers.insert(header::AUTHORIZATION, bearer);
        }

        Ok(headers)
    }

    /// Read at most `max_error_body` bytes of a failed response
    async fn read_error_body(&self, mut response: reqwest::Response) -> Bytes {
        let mut body = BytesMut::new();

        loop {
            match response.chunk().await {
                Ok(Some(chunk)) => {
                    let room = self.max_error_body.saturating_sub(body.len());
                    body.extend_from_slice(&chunk[..chunk.len().min(room)]);
                    if chunk.len() >= room {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::debug!(error = %e, "upstream error body ended early");
                    break;
                }
            }
        }

        body.freeze()
    }
}

#[async_trait]
impl Forward for HttpForwarder {
    async fn forward(&self, account: &Account, request: &ForwardRequest) -> AttemptOutcome {
        let url = build_target_url(&account.base_url, &request.path, request.query.as_deref());

        let headers = match self.headers_for(account, request) {
            Ok(headers) => headers,
            Err(message) => return AttemptOutcome::Transport(message),
        };

        let response = match self
            .client
            .request(request.method.clone(), &url)
            .headers(headers)
            .body(request.body.clone())
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(account = %account.name, account_id = account.id, error = %e, "upstream request failed");
                return AttemptOutcome::Transport(e.to_string());
            }
        };

        let status = response.status();
        let headers = response.headers().clone();

        if status.is_success() {
            let body = response.bytes_stream().map(|chunk| chunk.map_err(io::Error::other));
            return AttemptOutcome::Success(UpstreamResponse {
                status,
                headers,
                body: Box::pin(body),
            });
        }

        let body = self.read_error_body(response).await;
        tracing::warn!(
            account = %account.name,
            account_id = account.id,
            status = status.as_u16(),
            body = %String::from_utf8_lossy(&body),
            "upstream returned an error"
        );

        AttemptOutcome::Failed(UpstreamFailure { status, headers, body })
    }
}
