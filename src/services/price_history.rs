//! Price history and price diff engine
//!
//! Answers history/diff queries from persisted fetch snapshots only; no
//! upstream calls. Per-fetch statistics are computed on first request and
//! memoized in the store.

use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use crate::error::OfferSyncError;
use crate::models::{OfferPriceDiff, OfferSummary};
use crate::store::{FetchRecord, SnapshotStore};

pub struct PriceHistoryService {
    store: Arc<dyn SnapshotStore>,
}

impl PriceHistoryService {
    pub fn new(store: Arc<dyn SnapshotStore>) -> Self {
        Self { store }
    }

    /// Summaries for every fetch with time inclusive-between `from` and
    /// `to`, most recent first. An empty result is valid: the product exists
    /// but nothing was fetched in the range.
    pub async fn get_history(
        &self,
        product_id: Uuid,
        from: f64,
        to: f64,
    ) -> Result<Vec<OfferSummary>, OfferSyncError> {
        check_range(from, to)?;
        self.check_product(product_id).await?;

        let fetches = self.store.fetches_in_range(product_id, from, to).await?;
        debug!(
            product_id = %product_id,
            count = fetches.len(),
            "summarizing fetches in range"
        );

        let mut summaries = Vec::with_capacity(fetches.len());
        for fetch in &fetches {
            summaries.push(self.summary_for(fetch).await?);
        }
        Ok(summaries)
    }

    /// Percentage change per statistic between the most recent fetch at or
    /// before `from` and the most recent fetch at or before `to`.
    pub async fn get_price_change(
        &self,
        product_id: Uuid,
        from: f64,
        to: f64,
    ) -> Result<OfferPriceDiff, OfferSyncError> {
        check_range(from, to)?;
        self.check_product(product_id).await?;

        let start_fetch = self
            .store
            .latest_fetch_at_or_before(product_id, from)
            .await?
            .ok_or_else(|| {
                OfferSyncError::EntityNotFound(format!(
                    "no baseline snapshot at or before {} for product {}",
                    from, product_id
                ))
            })?;

        let end_fetch = self
            .store
            .latest_fetch_at_or_before(product_id, to)
            .await?
            .ok_or_else(|| {
                OfferSyncError::EntityNotFound(format!(
                    "no snapshot at or before {} for product {}",
                    to, product_id
                ))
            })?;

        // Identical boundary fetches would report a spurious 0% change
        if start_fetch.id == end_fetch.id {
            return Err(OfferSyncError::UndefinedPriceChange(format!(
                "no distinct snapshot between {} and {}",
                from, to
            )));
        }

        let start = self.summary_for(&start_fetch).await?;
        let end = self.summary_for(&end_fetch).await?;

        OfferPriceDiff::between(&start, &end)
    }

    async fn check_product(&self, product_id: Uuid) -> Result<(), OfferSyncError> {
        if !self.store.product_exists(product_id).await? {
            return Err(OfferSyncError::EntityNotFound(format!(
                "product {} not found",
                product_id
            )));
        }
        Ok(())
    }

    /// Memoized per-fetch summary: load if already computed, otherwise
    /// compute from the stored-order prices and save.
    async fn summary_for(&self, fetch: &FetchRecord) -> Result<OfferSummary, OfferSyncError> {
        if let Some(summary) = self.store.load_summary(fetch.id).await? {
            return Ok(summary);
        }

        let prices = self.store.offer_prices(fetch.id).await?;
        let summary = OfferSummary::from_prices(fetch.time, &prices);
        self.store.save_summary(fetch.id, &summary).await?;

        debug!(fetch_id = %fetch.id, count = summary.count, "summary memoized");
        Ok(summary)
    }
}

fn check_range(from: f64, to: f64) -> Result<(), OfferSyncError> {
    if from > to {
        return Err(OfferSyncError::InvalidTimeRange(format!(
            "start {} is after end {}",
            from, to
        )));
    }
    Ok(())
}
