use std::sync::Arc;

use migration::MigratorTrait;
use sea_orm::Database;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use offers_backend::clock::SystemClock;
use offers_backend::config::Config;
use offers_backend::jobs::offer_sync_job::start_offer_sync_job;
use offers_backend::services::offer_sync::OfferSynchronizer;
use offers_backend::services::token_cache::TokenCache;
use offers_backend::services::upstream::PriceApiClient;
use offers_backend::store::db::{DbSnapshotStore, DbTokenStore};
use offers_backend::store::{SnapshotStore, TokenStore};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,offers_backend=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();
    let config = Config::from_env();

    // Connect to database
    tracing::info!("Connecting to database...");
    let db = Database::connect(&config.database_url)
        .await
        .expect("Failed to connect to database");

    // Run migrations
    tracing::info!("Running migrations...");
    migration::Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    // Wire the synchronization core
    let upstream = Arc::new(PriceApiClient::new(
        config.api_url.clone(),
        config.token_secret.clone(),
    ));
    let token_store: Arc<dyn TokenStore> = Arc::new(DbTokenStore::new(db.clone()));
    let snapshot_store: Arc<dyn SnapshotStore> = Arc::new(DbSnapshotStore::new(db.clone()));
    let clock = Arc::new(SystemClock);

    let tokens = Arc::new(TokenCache::new(
        upstream.clone(),
        token_store,
        clock.clone(),
    ));
    let synchronizer = Arc::new(OfferSynchronizer::new(
        upstream,
        tokens,
        snapshot_store.clone(),
        clock,
    ));

    // Start the periodic offer sync job
    start_offer_sync_job(synchronizer, snapshot_store);

    tracing::info!("offers-backend started");

    tokio::signal::ctrl_c()
        .await
        .expect("Failed to listen for shutdown signal");
    tracing::info!("Shutting down");
}
