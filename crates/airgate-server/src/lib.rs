mod admin;
mod health;

use std::net::SocketAddr;
use std::sync::Arc;

use airgate_config::Config;
use airgate_proxy::ProxyState;
use airgate_store::{AccountStore, AliasStore, MemoryStore};
use axum::Router;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

/// Assembled server with all routes and middleware
pub struct Server {
    router: Router,
    state: ProxyState,
    listen_address: SocketAddr,
}

impl Server {
    /// Build the server with an in-memory store seeded from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the proxy state cannot be built
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = Arc::new(MemoryStore::from_config(&config));
        Self::with_stores(config, Arc::clone(&store) as Arc<dyn AccountStore>, store).await
    }

    /// Build the server on top of caller-provided stores
    ///
    /// The model registry is populated once before this returns.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client or a native protocol cannot be built
    pub async fn with_stores(
        config: Config,
        accounts: Arc<dyn AccountStore>,
        aliases: Arc<dyn AliasStore>,
    ) -> anyhow::Result<Self> {
        let listen_address = config
            .server
            .listen_address
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

        let state = ProxyState::from_config(&config, accounts, aliases)?;

        match state.refresh().await {
            Ok(summary) => tracing::info!(
                mode = %state.mode(),
                accounts = summary.accounts,
                failed = summary.failed,
                models = summary.models,
                "model registry ready"
            ),
            Err(e) => tracing::warn!(error = %e, "initial model refresh failed, starting with an empty registry"),
        }

        let mut app = Router::new();

        // Health check
        if config.server.health.enabled {
            app = app.route(&config.server.health.path, axum::routing::get(health::health_handler));
        }

        // Operator routes
        if config.server.admin {
            app = app.merge(admin::admin_router(state.clone()));
        }

        // Proxy routes
        app = app.merge(airgate_proxy::proxy_router(state.clone(), config.server.max_request_body));

        app = app.layer(TraceLayer::new_for_http());

        Ok(Self {
            router: app,
            state,
            listen_address,
        })
    }

    /// Get the configured listen address
    #[must_use]
    pub const fn listen_address(&self) -> SocketAddr {
        self.listen_address
    }

    /// Shared proxy state, for starting discovery outside [`Server::serve`]
    #[must_use]
    pub fn state(&self) -> ProxyState {
        self.state.clone()
    }

    /// Consume the server and return the inner router
    ///
    /// Useful for testing when the caller manages the listener
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Start serving requests and refreshing the registry
    ///
    /// Blocks until the cancellation token is triggered.
    ///
    /// # Errors
    ///
    /// Returns an error if binding the TCP listener or serving fails
    pub async fn serve(self, shutdown: CancellationToken) -> anyhow::Result<()> {
        let discovery = self.state.spawn_discovery(shutdown.child_token());

        let listener = tokio::net::TcpListener::bind(self.listen_address).await?;
        let local_addr = listener.local_addr()?;
        tracing::info!(%local_addr, "server listening");

        let signal = shutdown.clone();
        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                signal.cancelled().await;
                tracing::info!("graceful shutdown initiated");
            })
            .await?;

        shutdown.cancel();
        if let Err(e) = discovery.await {
            tracing::warn!(error = %e, "model discovery task ended abnormally");
        }

        Ok(())
    }
}
