use std::sync::Arc;

mod auth;
mod config;
mod errors;
mod routes;
mod status;
mod storage;

use auth::ApiKey;
use config::{AppConfig, StorageKind};
use storage::{InMemoryStorage, LocalFileStorage, Storage};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;

    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .init();

    if config.username.is_some() || config.password.is_some() {
        tracing::debug!("USERNAME/PASSWORD are set but no route uses them");
    }

    let storage: Arc<dyn Storage> = match config.storage_type {
        StorageKind::Memory => Arc::new(InMemoryStorage::new()),
        StorageKind::Local => Arc::new(LocalFileStorage::new(config.storage_path.clone())?),
    };
    tracing::info!(
        storage = ?config.storage_type,
        path = %config.storage_path.display(),
        "storage ready"
    );

    let app = routes::router(
        storage,
        ApiKey(Arc::from(config.api_key.as_str())),
        config.max_upload_bytes,
    );

    let addr = config.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Server running on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
