use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use common::storage::ObjectStore;
use common::storage::filesystem::FilesystemObjectStore;
use common::storage::s3::S3ObjectStore;
use sea_orm::DatabaseConnection;
use tracing::{Level, info, warn};

use photolog::config::{AppConfig, StorageBackend, StorageConfig};
use photolog::records::{MemoryRecordStore, RecordStore, SeaOrmRecordStore};
use photolog::state::AppState;
use photolog::{build_router, database};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("Failed to load configuration")?;

    let level = config.log.level.parse::<Level>().unwrap_or(Level::INFO);
    tracing_subscriber::fmt().with_max_level(level).init();

    let (records, db) = open_record_store(&config).await?;
    let objects = open_object_store(&config.storage).await?;

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let state = AppState {
        records,
        objects,
        config,
    };
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server running at http://{}", addr);
    info!("Swagger UI at http://{}/swagger-ui", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(db) = db {
        db.close().await?;
        info!("Database connection closed");
    }

    Ok(())
}

async fn open_record_store(
    config: &AppConfig,
) -> anyhow::Result<(Arc<dyn RecordStore>, Option<DatabaseConnection>)> {
    if config.database.url.is_empty() {
        warn!("No database URL configured, records are kept in memory");
        return Ok((Arc::new(MemoryRecordStore::new()), None));
    }

    let db = database::init_db(&config.database.url, config.database.max_connections)
        .await
        .context("Failed to connect to database")?;
    info!("Connected to database");
    Ok((Arc::new(SeaOrmRecordStore::new(db.clone())), Some(db)))
}

async fn open_object_store(config: &StorageConfig) -> anyhow::Result<Arc<dyn ObjectStore>> {
    match config.backend {
        StorageBackend::Filesystem => {
            let store =
                FilesystemObjectStore::new(PathBuf::from(&config.root), &config.public_base_url)
                    .await
                    .with_context(|| format!("Failed to open blob directory {}", config.root))?;
            info!(root = %config.root, "Using filesystem object store");
            Ok(Arc::new(store))
        }
        StorageBackend::S3 => {
            let s3 = config
                .s3
                .as_ref()
                .context("storage.backend is \"s3\" but storage.s3 is not configured")?;
            let store = S3ObjectStore::new(s3, &config.public_base_url)?;
            info!(bucket = %s3.bucket, "Using S3 object store");
            Ok(Arc::new(store))
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
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
                warn!("Failed to listen for SIGTERM: {}", e);
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
