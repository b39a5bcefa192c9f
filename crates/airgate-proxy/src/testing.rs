use std::collections::HashMap;
use std::sync::Mutex;

use airgate_core::Account;
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream;
use http::{HeaderMap, Method, StatusCode};
use secrecy::SecretString;
use url::Url;

use crate::forwarder::{AttemptOutcome, Forward, ForwardRequest, UpstreamFailure, UpstreamResponse};
use crate::protocol::ModelDescriptor;

pub fn account(id: u64, name: &str) -> Account {
    Account {
        id,
        name: name.to_owned(),
        base_url: Url::parse("https://api.example.com").unwrap(),
        api_key: SecretString::from("sk-test"),
        enabled: true,
        ext: None,
        updated_at: 0,
    }
}

pub fn listing(ids: &[&str]) -> Vec<ModelDescriptor> {
    ids.iter().map(|id| ModelDescriptor::new(*id)).collect()
}

pub fn request(model: &str) -> ForwardRequest {
    ForwardRequest {
        method: Method::POST,
        path: "/chat/completions".to_owned(),
        query: None,
        headers: HeaderMap::new(),
        body: Bytes::from(format!(r#"{{"model":"{model}","messages":[{{"role":"user","content":"hi"}}]}}"#)),
    }
}

/// Answers each account with a fixed status; unscripted accounts never respond
pub struct ScriptedForwarder {
    statuses: HashMap<u64, u16>,
    calls: Mutex<Vec<u64>>,
    bodies: Mutex<Vec<Bytes>>,
}

impl ScriptedForwarder {
    pub fn new(statuses: HashMap<u64, u16>) -> Self {
        Self {
            statuses,
            calls: Mutex::new(Vec::new()),
            bodies: Mutex::new(Vec::new()),
        }
    }

    /// Account ids in the order they were tried
    pub fn calls(&self) -> Vec<u64> {
        self.calls.lock().unwrap().clone()
    }

    pub fn bodies(&self) -> Vec<Bytes> {
        self.bodies.lock().unwrap().clone()
    }
}

#[async_trait]
impl Forward for ScriptedForwarder {
    async fn forward(&self, account: &Account, request: &ForwardRequest) -> AttemptOutcome {
        self.calls.lock().unwrap().push(account.id);
        self.bodies.lock().unwrap().push(request.body.clone());

        let Some(&code) = self.statuses.get(&account.id) else {
            return AttemptOutcome::Transport(format!("connection refused by {}", account.name));
        };
        let status = StatusCode::from_u16(code).unwrap();

        if status.is_success() {
            let body = Bytes::from(format!("served by {}", account.name));
            AttemptOutcome::Success(UpstreamResponse {
                status,
                headers: HeaderMap::new(),
                body: Box::pin(stream::iter([Ok::<_, std::io::Error>(body)])),
            })
        } else {
            AttemptOutcome::Failed(UpstreamFailure {
                status,
                headers: HeaderMap::new(),
                body: Bytes::from(format!("error from {}", account.name)),
            })
        }
    }
}
