pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod openapi;
pub mod repositories;
pub mod services;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

use std::net::SocketAddr;
use std::sync::Arc;

use totvs::TotvsSource;

pub use api::create_router;
pub use config::Config;
pub use db::create_pool;
pub use error::{AppError, AppResult};
pub use state::AppState;

/// ERP source for the configured url. A failed connection is logged and
/// the application runs without ERP features.
pub async fn connect_totvs(config: &Config) -> Option<Arc<dyn TotvsSource>> {
    let url = config.totvs_database_url.as_deref()?;
    match totvs::connect(url).await {
        Ok(client) => {
            tracing::info!("Connected to ERP database");
            Some(client)
        }
        Err(e) => {
            tracing::warn!("ERP database unavailable: {}", e);
            None
        }
    }
}

/// Migrate, seed and serve until Ctrl+C or SIGTERM.
pub async fn run_server(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    let pool = create_pool(&config.database_url, config.max_connections).await?;
    db::run_migrations(&pool).await?;
    services::seed::run(&pool, &config.super_user_password).await;

    let totvs = connect_totvs(&config).await;
    let state = AppState::new(pool.clone(), config, totvs);
    let app = create_router(state);

    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
        tracing::info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                tracing::info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
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
}
