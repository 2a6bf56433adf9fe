//! Storage contracts for the offer synchronization core
//!
//! The core coordinates no shared mutable state of its own apart from the
//! token refresh lock; everything else is delegated to these traits. The
//! SeaORM implementations live in [`db`], in-memory ones in [`memory`].

pub mod db;
pub mod memory;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::OfferSyncError;
use crate::models::{AuthToken, Offer, OfferSummary, Product};

/// One persisted fetch snapshot row.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRecord {
    pub id: Uuid,
    pub product_id: Uuid,
    /// Snapshot time (Unix seconds)
    pub time: f64,
}

/// Holds the single current upstream bearer token.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn load(&self) -> Result<Option<AuthToken>, OfferSyncError>;

    /// Replace any previously stored token. At most one token exists
    /// afterwards; readers observe either the old or the new value, never a
    /// partially written one.
    async fn replace(&self, token: &AuthToken) -> Result<(), OfferSyncError>;
}

/// Persists products, fetch snapshots, offers and memoized summaries.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn insert_product(&self, product: &Product) -> Result<(), OfferSyncError>;

    async fn all_products(&self) -> Result<Vec<Product>, OfferSyncError>;

    async fn product_exists(&self, product_id: Uuid) -> Result<bool, OfferSyncError>;

    /// Atomically create a fetch stamped `time`, upsert each offer by id
    /// (price/stock refreshed in place, identity preserved) and link every
    /// offer to the new fetch in the given order. All of it succeeds or none
    /// of it does.
    async fn record_fetch(
        &self,
        product_id: Uuid,
        time: f64,
        offers: &[Offer],
    ) -> Result<FetchRecord, OfferSyncError>;

    /// Fetches with `time` inclusive-between `from` and `to`, most recent
    /// first.
    async fn fetches_in_range(
        &self,
        product_id: Uuid,
        from: f64,
        to: f64,
    ) -> Result<Vec<FetchRecord>, OfferSyncError>;

    async fn latest_fetch_at_or_before(
        &self,
        product_id: Uuid,
        time: f64,
    ) -> Result<Option<FetchRecord>, OfferSyncError>;

    /// Offer prices for a fetch, in the order the offers were linked.
    async fn offer_prices(&self, fetch_id: Uuid) -> Result<Vec<i64>, OfferSyncError>;

    async fn load_summary(&self, fetch_id: Uuid) -> Result<Option<OfferSummary>, OfferSyncError>;

    async fn save_summary(
        &self,
        fetch_id: Uuid,
        summary: &OfferSummary,
    ) -> Result<(), OfferSyncError>;
}
