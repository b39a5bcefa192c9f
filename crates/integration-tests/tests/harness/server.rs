//! Test server wrapper that starts Airgate on a random port

use std::net::SocketAddr;
use std::sync::Arc;

use airgate_config::Config;
use airgate_server::Server;
use airgate_store::{AccountStore, MemoryStore};
use tokio_util::sync::CancellationToken;

/// A running test server instance
pub struct TestServer {
    addr: SocketAddr,
    shutdown: CancellationToken,
    client: reqwest::Client,
}

impl TestServer {
    /// Start a test server with the given configuration
    ///
    /// Binds to port 0 for automatic port assignment
    pub async fn start(config: Config) -> anyhow::Result<Self> {
        let store = Arc::new(MemoryStore::from_config(&config));
        Self::start_with_store(config, store).await
    }

    /// Start a test server reading accounts and aliases from `store`
    pub async fn start_with_store(config: Config, store: Arc<MemoryStore>) -> anyhow::Result<Self> {
        let server = Server::with_stores(config, Arc::clone(&store) as Arc<dyn AccountStore>, store).await?;
        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        // Bind the listener here so we know the actual port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        tokio::spawn(async move {
            axum::serve(listener, server.into_router())
                .with_graceful_shutdown(async move {
                    shutdown_clone.cancelled().await;
                })
                .await
                .ok();
        });

        let client = reqwest::Client::new();

        Ok(Self { addr, shutdown, client })
    }

    /// Base URL of the running test server
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// Get a reference to the HTTP client
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Send a chat completion for `model`
    pub async fn chat(&self, model: &str) -> reqwest::Response {
        self.client
            .post(self.url("/v1/chat/completions"))
            .json(&serde_json::json!({
                "model": model,
                "messages": [{"role": "user", "content": "Hello"}]
            }))
            .send()
            .await
            .expect("request reaches the gateway")
    }

    /// Server address
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
