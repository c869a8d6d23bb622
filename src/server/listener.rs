//! SSE server listener
//!
//! Binds the HTTP listener, starts the built-in producers and serves the
//! router until shutdown.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;

use super::config::ServerConfig;
use super::routes::build_router;
use super::state::AppState;
use crate::error::Result;
use crate::manager::StreamManager;
use crate::registry::RegistryConfig;

/// SSE fan-out server
pub struct StreamServer {
    state: Arc<AppState>,
}

impl StreamServer {
    /// Create a new server with the given configuration
    pub fn new(config: ServerConfig) -> Self {
        Self::with_registry_config(config, RegistryConfig::default())
    }

    /// Create a new server with custom registry configuration
    pub fn with_registry_config(config: ServerConfig, registry_config: RegistryConfig) -> Self {
        let manager = Arc::new(StreamManager::with_config(registry_config));
        Self {
            state: Arc::new(AppState::new(config, manager)),
        }
    }

    /// Get a reference to the stream manager
    pub fn manager(&self) -> &Arc<StreamManager> {
        &self.state.manager
    }

    /// Get the bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.state.config.bind_addr
    }

    /// Build the HTTP router over this server's state
    pub fn router(&self) -> Router {
        build_router(Arc::clone(&self.state))
    }

    /// Run the server with graceful shutdown
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.state.config.bind_addr).await?;
        self.run_on(listener, shutdown).await
    }

    /// Serve on an already bound listener
    pub async fn run_on<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(addr = %addr, "SSE server listening");

        if self.state.config.producers_enabled {
            self.state.producers.start().await;
        }

        // Open streams never end on their own, so shutdown must disconnect
        // every client before the server can drain.
        let state = Arc::clone(&self.state);
        let graceful = async move {
            shutdown.await;
            tracing::info!("Shutdown signal received");

            state.producers.stop().await;
            let disconnected = state.manager.disconnect_all().await;
            tracing::info!(clients = disconnected, "Clients disconnected");
        };

        let result = axum::serve(listener, self.router())
            .with_graceful_shutdown(graceful)
            .await;

        self.state.producers.stop().await;
        tracing::info!("SSE server stopped");

        result.map_err(Into::into)
    }
}
