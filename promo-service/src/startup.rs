//! Application startup and lifecycle management.

use service_core::error::AppError;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;

use crate::config::{ApplierMode, PromoConfig, StorageBackend};
use crate::services::{
    CodeApplier, HttpCodeApplier, InMemoryStore, MockCodeApplier, PromoDb, Stores, SystemClock,
};
use crate::{build_router, AppState};

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Connect storage, pick the code applier and bind the listener.
    pub async fn build(config: PromoConfig) -> Result<Self, AppError> {
        let stores = match config.storage.backend {
            StorageBackend::MongoDb => {
                let db = PromoDb::connect(
                    &config.storage.mongodb.uri,
                    &config.storage.mongodb.database,
                )
                .await
                .map_err(|e| {
                    tracing::error!("Failed to connect to MongoDB: {}", e);
                    AppError::from(e)
                })?;
                db.initialize_indexes().await.map_err(|e| {
                    tracing::error!("Failed to initialize database indexes: {}", e);
                    AppError::from(e)
                })?;
                tracing::info!(database = %config.storage.mongodb.database, "MongoDB storage ready");
                Stores::from_backend(Arc::new(db))
            }
            StorageBackend::Memory => {
                tracing::warn!("Using in-memory storage; data is lost on restart");
                Stores::from_backend(Arc::new(InMemoryStore::new()))
            }
        };

        let applier: Arc<dyn CodeApplier> = match config.applier.mode {
            ApplierMode::Http => {
                let endpoint = config.applier.endpoint.clone().ok_or_else(|| {
                    AppError::ConfigError(anyhow::anyhow!(
                        "APPLIER_ENDPOINT is required when APPLIER_MODE=http"
                    ))
                })?;
                tracing::info!(endpoint = %endpoint, "Using HTTP code applier");
                Arc::new(
                    HttpCodeApplier::new(endpoint, config.applier.api_key.clone())
                        .map_err(AppError::ConfigError)?,
                )
            }
            ApplierMode::Mock => {
                tracing::warn!("Using mock code applier; promo codes are not applied anywhere");
                Arc::new(MockCodeApplier::succeeding())
            }
        };

        let addr = config.common.bind_addr();
        let state = AppState::new(config, stores, applier, Arc::new(SystemClock));

        // Port 0 = random port for testing
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Promo service listening on port {}", port);

        Ok(Self {
            port,
            listener,
            state,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Serve until SIGINT/SIGTERM.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let app = build_router(self.state);

        axum::serve(
            self.listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => tracing::error!("Failed to install SIGTERM handler: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining connections");
}
