//! Server assembly and lifecycle

use anyhow::{Context, Result};
use axum::Router;
use lectern_config::LecternConfig;
use lectern_storage::{DatabaseConnection, SeaOrmSecurityStore};
use lectern_web::{SecurityPipeline, SecurityStores};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::routes::{build_router, default_policies, AppState};

/// Build the pipeline for `config` over `stores`
pub fn build_pipeline(config: &LecternConfig, stores: SecurityStores) -> SecurityPipeline {
    if config.security.jwt_secret.is_none() {
        error!("No JWT secret configured (security.jwt_secret / LECTERN_JWT_SECRET); authenticated requests will fail with 500");
    }
    if !config.security.rate_limit.enabled {
        warn!("Rate limiting is disabled");
    }
    info!(
        scope_enforcement = %config.security.scope_enforcement,
        public_paths = config.security.public_paths.len(),
        "Security pipeline configured"
    );

    SecurityPipeline::new(config.security.clone(), stores).with_policies(default_policies())
}

/// Connect storage, assemble the application and serve until shutdown
pub async fn serve(config: LecternConfig) -> Result<()> {
    let database = DatabaseConnection::new(config.database.clone())
        .await
        .context("Failed to connect to database")?;

    if config.database.run_migrations {
        database.migrate().await.context("Failed to run migrations")?;
    }

    let store = Arc::new(SeaOrmSecurityStore::new(database.get_connection().clone()));
    let pipeline = Arc::new(build_pipeline(&config, SecurityStores::shared(store.clone())));
    let app: Router = build_router(AppState { pipeline, audit: store }, Router::new());

    let address = config.server.socket_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    info!("Lectern listening on {}", address);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Lectern stopped");
    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
