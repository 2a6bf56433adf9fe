//! Periodic offer sync job
//!
//! Invokes the synchronizer for every known product at a fixed interval.
//! One product's failure is logged and skipped; it never aborts the sweep.
//! Supports graceful shutdown via SIGTERM/SIGINT signals.

use std::env;
use std::sync::Arc;

use tokio::time::{Duration as TokioDuration, interval};
use tracing::{info, warn};

use crate::services::offer_sync::OfferSynchronizer;
use crate::store::SnapshotStore;

/// Default sweep interval in seconds
const DEFAULT_SYNC_INTERVAL_SECS: u64 = 60;

/// Environment variable for the sweep interval
const ENV_SYNC_INTERVAL: &str = "OFFER_SYNC_INTERVAL_SECS";

/// Resolve the sweep interval from the environment.
pub fn sync_interval_secs() -> u64 {
    env::var(ENV_SYNC_INTERVAL)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_SYNC_INTERVAL_SECS)
}

/// Start the periodic offer sync job.
///
/// Spawns a background task that enumerates products from the store at the
/// configured interval and syncs each one.
pub fn start_offer_sync_job(synchronizer: Arc<OfferSynchronizer>, store: Arc<dyn SnapshotStore>) {
    let interval_secs = sync_interval_secs();

    info!(interval_secs = interval_secs, "starting offer sync job");

    tokio::spawn(async move {
        let mut interval = interval(TokioDuration::from_secs(interval_secs));

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("shutdown signal received, stopping offer sync job gracefully");
                    break;
                }
                _ = interval.tick() => {
                    run_sweep(&synchronizer, store.as_ref()).await;
                }
            }
        }

        info!("offer sync job stopped");
    });
}

/// One sweep over every known product. Per-product failures are isolated.
pub async fn run_sweep(synchronizer: &OfferSynchronizer, store: &dyn SnapshotStore) {
    let products = match store.all_products().await {
        Ok(products) => products,
        Err(e) => {
            warn!(error = %e, "could not enumerate products, skipping sweep");
            return;
        }
    };

    info!(count = products.len(), "starting offer sync sweep");

    let mut synced = 0;
    for product in &products {
        match synchronizer.sync(product).await {
            Ok(offers) => {
                synced += 1;
                tracing::debug!(
                    product_id = %product.id,
                    offers = offers.len(),
                    "product synced"
                );
            }
            Err(e) => {
                warn!(product_id = %product.id, error = %e, "offer sync failed, skipping product");
            }
        }
    }

    info!(synced = synced, total = products.len(), "offer sync sweep completed");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_interval() {
        assert_eq!(DEFAULT_SYNC_INTERVAL_SECS, 60);
    }

    #[test]
    fn env_var_name() {
        assert_eq!(ENV_SYNC_INTERVAL, "OFFER_SYNC_INTERVAL_SECS");
    }
}
