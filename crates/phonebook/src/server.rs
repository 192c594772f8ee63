//! Phonebook HTTP server

use std::sync::Arc;
use anyhow::Result;
use axum::{extract::DefaultBodyLimit, middleware, Router};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use crate::access_log::access_log;
use crate::api::{create_router, ApiState};
use crate::config::ServerConfig;
use crate::directory::Directory;
use crate::metrics::DirectoryMetrics;

pub struct PhonebookServer {
    config: ServerConfig,
    directory: Arc<Directory>,
    metrics: Arc<DirectoryMetrics>,
    shutdown_tx: watch::Sender<bool>,
}

impl PhonebookServer {
    /// Create a server whose directory is seeded according to the config
    pub fn new(config: ServerConfig) -> Result<Self> {
        let directory = if config.seed {
            Directory::seeded()
        } else {
            Directory::new()
        };
        Self::with_directory(config, Arc::new(directory))
    }

    /// Create a server around an existing directory
    pub fn with_directory(config: ServerConfig, directory: Arc<Directory>) -> Result<Self> {
        config.validate()?;

        let metrics = Arc::new(DirectoryMetrics::new()?);
        metrics.set_contacts(directory.len());
        let (shutdown_tx, _) = watch::channel(false);

        Ok(Self {
            config,
            directory,
            metrics,
            shutdown_tx,
        })
    }

    pub fn directory(&self) -> Arc<Directory> {
        Arc::clone(&self.directory)
    }

    pub fn metrics(&self) -> Arc<DirectoryMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Build the fully layered router
    pub fn router(&self) -> Router {
        let state = ApiState {
            directory: self.directory.clone(),
            metrics: self.metrics.clone(),
            max_body_bytes: self.config.max_body_bytes,
        };

        let mut app = create_router(state.clone())
            .layer(middleware::from_fn_with_state(state, access_log))
            .layer(DefaultBodyLimit::max(self.config.max_body_bytes))
            .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()));

        if self.config.cors_enabled {
            app = app.layer(CorsLayer::permissive());
        }

        app
    }

    /// Bind the configured address and serve until shutdown
    pub async fn run(&self) -> Result<()> {
        let addr = self.config.listen_addr()?;
        let listener = TcpListener::bind(addr).await?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener until shutdown
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        let shutdown_rx = self.shutdown_tx.subscribe();
        info!("Server running on {}", listener.local_addr()?);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(Self::shutdown_signal(shutdown_rx))
            .await?;

        info!("Server stopped");
        Ok(())
    }

    /// Resolves on SIGINT, on SIGTERM, or once [`PhonebookServer::shutdown`] is called
    async fn shutdown_signal(mut shutdown: watch::Receiver<bool>) {
        let requested = async move {
            // With the sender gone no request can arrive
            let closed = shutdown.wait_for(|stop| *stop).await.is_err();
            if closed {
                std::future::pending::<()>().await;
            }
        };

        tokio::select! {
            _ = interrupt() => info!("Received SIGINT, starting graceful shutdown"),
            _ = terminate() => info!("Received SIGTERM, starting graceful shutdown"),
            _ = requested => info!("Shutdown requested"),
        }
    }

    /// Request a graceful stop. Takes effect even before `serve` starts.
    pub fn shutdown(&self) {
        self.shutdown_tx.send_replace(true);
    }
}

async fn interrupt() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Cannot listen for SIGINT: {}", e);
        std::future::pending::<()>().await;
    }
}

#[cfg(unix)]
async fn terminate() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            warn!("Cannot listen for SIGTERM: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_respects_seed_flag() {
        let server = PhonebookServer::new(ServerConfig::default()).unwrap();
        assert_eq!(server.directory().len(), 4);

        let config = ServerConfig {
            seed: false,
            ..ServerConfig::default()
        };
        let server = PhonebookServer::new(config).unwrap();
        assert!(server.directory().is_empty());
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = ServerConfig {
            port: 0,
            ..ServerConfig::default()
        };
        assert!(PhonebookServer::new(config).is_err());
    }

    #[test]
    fn test_contacts_gauge_initialised() {
        let server = PhonebookServer::new(ServerConfig::default()).unwrap();
        assert_eq!(server.metrics().contacts.get(), 4.0);
    }

    #[tokio::test]
    async fn test_shutdown_stops_serving() {
        let server = Arc::new(PhonebookServer::new(ServerConfig::default()).unwrap());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();

        let handle = {
            let server = Arc::clone(&server);
            tokio::spawn(async move { server.serve(listener).await })
        };

        tokio::task::yield_now().await;
        server.shutdown();

        let result = handle.await.unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_shutdown_requested_before_serving() {
        let server = PhonebookServer::new(ServerConfig::default()).unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();

        server.shutdown();
        assert!(server.serve(listener).await.is_ok());
    }
}
