use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use common::storage::filesystem::FilesystemBagStorage;
use common::storage::resolver::FilesystemFileResolver;
use tracing::info;
use tracing_subscriber::EnvFilter;

use bagit_server::activity::{AuditEventEmitter, TracingActivityPublisher};
use bagit_server::config::AppConfig;
use bagit_server::database::init_db;
use bagit_server::locks::KeyLocks;
use bagit_server::service::{BagConfig, BagLifecycleManager, BagManagerDeps};
use bagit_server::state::AppState;
use bagit_server::store::SeaOrmBagStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;

    let db = init_db(&config.database.url)
        .await
        .context("Failed to connect to database")?;
    info!("Database ready");

    let resolver = Arc::new(FilesystemFileResolver::new(&config.storage.data_dir));
    let storage = FilesystemBagStorage::new(
        config.storage.data_dir.clone(),
        config.storage.max_payload_size,
        resolver.clone(),
    )
    .await
    .context("Failed to initialize bag storage")?;
    info!(data_dir = %config.storage.data_dir.display(), "Bag storage ready");

    let manager = BagLifecycleManager::new(
        BagManagerDeps {
            store: Arc::new(SeaOrmBagStore::new(db)),
            storage: Arc::new(storage),
            emitter: AuditEventEmitter::new(resolver, Arc::new(TracingActivityPublisher)),
        },
        BagConfig {
            default_hash: config.bag.default_hash,
            audit: config.audit,
        },
    );

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let state = AppState {
        manager,
        locks: KeyLocks::new(),
        config,
    };
    let app = bagit_server::build_router(state);

    info!("Server running at http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
    }
    info!("Shutting down");
}
