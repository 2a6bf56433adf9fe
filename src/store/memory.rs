//! In-memory store implementations
//!
//! Used by the test suite and usable for single-instance deployments that do
//! not need restart survival. Each write takes one lock, which gives the
//! same all-or-nothing behavior the database store gets from a transaction.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::error::OfferSyncError;
use crate::models::{AuthToken, Offer, OfferSummary, Product};
use crate::store::{FetchRecord, SnapshotStore, TokenStore};

/// Single-slot token store.
#[derive(Default)]
pub struct InMemoryTokenStore {
    current: RwLock<Option<AuthToken>>,
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn load(&self) -> Result<Option<AuthToken>, OfferSyncError> {
        Ok(self.current.read().clone())
    }

    async fn replace(&self, token: &AuthToken) -> Result<(), OfferSyncError> {
        *self.current.write() = Some(token.clone());
        Ok(())
    }
}

#[derive(Default)]
struct SnapshotData {
    products: HashMap<Uuid, Product>,
    offers: HashMap<Uuid, Offer>,
    fetches: Vec<FetchRecord>,
    /// fetch id -> linked offer ids, in insertion order
    links: HashMap<Uuid, Vec<Uuid>>,
    summaries: HashMap<Uuid, OfferSummary>,
}

#[derive(Default)]
pub struct InMemorySnapshotStore {
    data: RwLock<SnapshotData>,
}

#[async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    async fn insert_product(&self, product: &Product) -> Result<(), OfferSyncError> {
        self.data
            .write()
            .products
            .insert(product.id, product.clone());
        Ok(())
    }

    async fn all_products(&self) -> Result<Vec<Product>, OfferSyncError> {
        Ok(self.data.read().products.values().cloned().collect())
    }

    async fn product_exists(&self, product_id: Uuid) -> Result<bool, OfferSyncError> {
        Ok(self.data.read().products.contains_key(&product_id))
    }

    async fn record_fetch(
        &self,
        product_id: Uuid,
        time: f64,
        offers: &[Offer],
    ) -> Result<FetchRecord, OfferSyncError> {
        let mut data = self.data.write();

        if !data.products.contains_key(&product_id) {
            return Err(OfferSyncError::Storage(format!(
                "product {} does not exist",
                product_id
            )));
        }

        let fetch = FetchRecord {
            id: Uuid::new_v4(),
            product_id,
            time,
        };

        let mut linked = Vec::with_capacity(offers.len());
        for offer in offers {
            data.offers.insert(offer.id, offer.clone());
            linked.push(offer.id);
        }

        data.links.insert(fetch.id, linked);
        data.fetches.push(fetch.clone());

        Ok(fetch)
    }

    async fn fetches_in_range(
        &self,
        product_id: Uuid,
        from: f64,
        to: f64,
    ) -> Result<Vec<FetchRecord>, OfferSyncError> {
        let mut fetches: Vec<FetchRecord> = self
            .data
            .read()
            .fetches
            .iter()
            .filter(|f| f.product_id == product_id && f.time >= from && f.time <= to)
            .cloned()
            .collect();
        fetches.sort_by(|a, b| b.time.total_cmp(&a.time));
        Ok(fetches)
    }

    async fn latest_fetch_at_or_before(
        &self,
        product_id: Uuid,
        time: f64,
    ) -> Result<Option<FetchRecord>, OfferSyncError> {
        Ok(self
            .data
            .read()
            .fetches
            .iter()
            .filter(|f| f.product_id == product_id && f.time <= time)
            .max_by(|a, b| a.time.total_cmp(&b.time))
            .cloned())
    }

    async fn offer_prices(&self, fetch_id: Uuid) -> Result<Vec<i64>, OfferSyncError> {
        let data = self.data.read();
        let linked = data.links.get(&fetch_id).ok_or_else(|| {
            OfferSyncError::Storage(format!("fetch {} does not exist", fetch_id))
        })?;
        Ok(linked
            .iter()
            .filter_map(|id| data.offers.get(id).map(|o| o.price))
            .collect())
    }

    async fn load_summary(&self, fetch_id: Uuid) -> Result<Option<OfferSummary>, OfferSyncError> {
        Ok(self.data.read().summaries.get(&fetch_id).cloned())
    }

    async fn save_summary(
        &self,
        fetch_id: Uuid,
        summary: &OfferSummary,
    ) -> Result<(), OfferSyncError> {
        self.data.write().summaries.insert(fetch_id, summary.clone());
        Ok(())
    }
}

impl InMemorySnapshotStore {
    /// Current stored state of an offer, if any. Test helper.
    pub fn offer(&self, offer_id: Uuid) -> Option<Offer> {
        self.data.read().offers.get(&offer_id).cloned()
    }

    pub fn offer_count(&self) -> usize {
        self.data.read().offers.len()
    }
}
