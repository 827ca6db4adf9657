//! API service - binds the listener and serves the REST routes until shutdown.

use crate::domain::config::ServerConfig;
use crate::domain::error::ServiceError;
use crate::middleware::{create_cors_layer, TimeoutLayer, TracingLayer};
use crate::routes::{api_routes, AppState};
use axum::{extract::DefaultBodyLimit, Router};
use product_contract::{ProductRegistry, RpcProductRegistry};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tower::ServiceBuilder;
use tracing::info;

/// Router with the full middleware stack.
pub fn build_router(registry: Arc<dyn ProductRegistry>, config: &ServerConfig) -> Router {
    let middleware = ServiceBuilder::new()
        .layer(create_cors_layer(&config.cors))
        .layer(TracingLayer::new())
        .layer(TimeoutLayer::new(config.timeouts.request));

    api_routes(AppState::new(registry))
        .layer(DefaultBodyLimit::max(config.limits.max_request_size))
        .layer(middleware)
}

/// Stops a running [`ApiService`].
pub struct ShutdownHandle(oneshot::Sender<()>);

impl ShutdownHandle {
    pub fn shutdown(self) {
        let _ = self.0.send(());
    }
}

/// REST API service
pub struct ApiService {
    config: ServerConfig,
    registry: Arc<dyn ProductRegistry>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    shutdown_rx: oneshot::Receiver<()>,
}

impl ApiService {
    pub fn new(config: ServerConfig, registry: Arc<dyn ProductRegistry>) -> Result<Self, ServiceError> {
        config.validate()?;
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        Ok(Self {
            config,
            registry,
            shutdown_tx: Some(shutdown_tx),
            shutdown_rx,
        })
    }

    /// Service backed by the JSON-RPC contract binding.
    pub fn from_config(config: ServerConfig) -> Result<Self, ServiceError> {
        config.validate()?;
        let registry =
            RpcProductRegistry::new(config.blockchain.url.clone(), config.registry_config()?)?;
        Self::new(config, Arc::new(registry))
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Handle for a graceful stop; only the first call returns one.
    pub fn shutdown_handle(&mut self) -> Option<ShutdownHandle> {
        self.shutdown_tx.take().map(ShutdownHandle)
    }

    pub fn router(&self) -> Router {
        build_router(Arc::clone(&self.registry), &self.config)
    }

    /// Bind the configured address and serve.
    pub async fn start(self) -> Result<(), ServiceError> {
        let addr = self.config.http_addr();
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServiceError::Bind { addr, source })?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener until Ctrl-C or the shutdown handle fires.
    pub async fn serve(self, listener: TcpListener) -> Result<(), ServiceError> {
        let local_addr: SocketAddr = listener.local_addr()?;
        let router = self.router();
        let shutdown_rx = self.shutdown_rx;

        if let Err(e) = self.registry.ping().await {
            tracing::warn!(error = %e, url = %self.config.blockchain.url, "Blockchain node not reachable yet");
        }

        info!(addr = %local_addr, "DigiSeal API listening");

        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                tokio::select! {
                    _ = shutdown_rx => info!("Received shutdown signal"),
                    _ = tokio::signal::ctrl_c() => info!("Received Ctrl-C"),
                }
            })
            .await?;

        info!("DigiSeal API stopped");
        Ok(())
    }
}
