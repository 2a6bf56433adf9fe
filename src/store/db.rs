//! SeaORM-backed store implementations
//!
//! All writes belonging to one `record_fetch` call run inside a single
//! database transaction, so a sync either persists its whole snapshot or
//! nothing.

use async_trait::async_trait;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use uuid::Uuid;

use crate::entities::{auth_tokens, fetches, offer_fetch, offer_summaries, offers, products};
use crate::error::OfferSyncError;
use crate::models::{AuthToken, Offer, OfferSummary, Product};
use crate::store::{FetchRecord, SnapshotStore, TokenStore};

#[derive(Clone)]
pub struct DbTokenStore {
    db: DatabaseConnection,
}

impl DbTokenStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TokenStore for DbTokenStore {
    async fn load(&self) -> Result<Option<AuthToken>, OfferSyncError> {
        let row = auth_tokens::Entity::find().one(&self.db).await?;
        Ok(row.map(|row| AuthToken {
            token: row.token,
            expires: row.expiration,
        }))
    }

    async fn replace(&self, token: &AuthToken) -> Result<(), OfferSyncError> {
        // Delete-then-insert in one transaction keeps the single-row
        // invariant even when the token string (the PK) changes.
        let txn = self.db.begin().await?;
        auth_tokens::Entity::delete_many().exec(&txn).await?;
        auth_tokens::ActiveModel {
            token: Set(token.token.clone()),
            expiration: Set(token.expires),
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct DbSnapshotStore {
    db: DatabaseConnection,
}

impl DbSnapshotStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SnapshotStore for DbSnapshotStore {
    async fn insert_product(&self, product: &Product) -> Result<(), OfferSyncError> {
        products::ActiveModel {
            id: Set(product.id),
            name: Set(product.name.clone()),
            description: Set(product.description.clone()),
        }
        .insert(&self.db)
        .await?;
        Ok(())
    }

    async fn all_products(&self) -> Result<Vec<Product>, OfferSyncError> {
        let rows = products::Entity::find().all(&self.db).await?;
        Ok(rows
            .into_iter()
            .map(|row| Product {
                id: row.id,
                name: row.name,
                description: row.description,
            })
            .collect())
    }

    async fn product_exists(&self, product_id: Uuid) -> Result<bool, OfferSyncError> {
        let row = products::Entity::find_by_id(product_id).one(&self.db).await?;
        Ok(row.is_some())
    }

    async fn record_fetch(
        &self,
        product_id: Uuid,
        time: f64,
        offers_to_store: &[Offer],
    ) -> Result<FetchRecord, OfferSyncError> {
        let txn = self.db.begin().await?;

        let fetch = FetchRecord {
            id: Uuid::new_v4(),
            product_id,
            time,
        };

        fetches::ActiveModel {
            id: Set(fetch.id),
            product_id: Set(product_id),
            time: Set(time),
        }
        .insert(&txn)
        .await?;

        for offer in offers_to_store {
            // Upsert by offer id: a known offer keeps its identity and gets
            // its price/stock refreshed.
            offers::Entity::insert(offers::ActiveModel {
                id: Set(offer.id),
                price: Set(offer.price),
                items_in_stock: Set(offer.items_in_stock),
                product_id: Set(product_id),
            })
            .on_conflict(
                OnConflict::column(offers::Column::Id)
                    .update_columns([offers::Column::Price, offers::Column::ItemsInStock])
                    .to_owned(),
            )
            .exec(&txn)
            .await?;

            offer_fetch::ActiveModel {
                offer_id: Set(offer.id),
                fetch_id: Set(fetch.id),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
        }

        txn.commit().await?;
        Ok(fetch)
    }

    async fn fetches_in_range(
        &self,
        product_id: Uuid,
        from: f64,
        to: f64,
    ) -> Result<Vec<FetchRecord>, OfferSyncError> {
        let rows = fetches::Entity::find()
            .filter(fetches::Column::ProductId.eq(product_id))
            .filter(fetches::Column::Time.gte(from))
            .filter(fetches::Column::Time.lte(to))
            .order_by_desc(fetches::Column::Time)
            .all(&self.db)
            .await?;
        Ok(rows
            .into_iter()
            .map(|row| FetchRecord {
                id: row.id,
                product_id: row.product_id,
                time: row.time,
            })
            .collect())
    }

    async fn latest_fetch_at_or_before(
        &self,
        product_id: Uuid,
        time: f64,
    ) -> Result<Option<FetchRecord>, OfferSyncError> {
        let row = fetches::Entity::find()
            .filter(fetches::Column::ProductId.eq(product_id))
            .filter(fetches::Column::Time.lte(time))
            .order_by_desc(fetches::Column::Time)
            .one(&self.db)
            .await?;
        Ok(row.map(|row| FetchRecord {
            id: row.id,
            product_id: row.product_id,
            time: row.time,
        }))
    }

    async fn offer_prices(&self, fetch_id: Uuid) -> Result<Vec<i64>, OfferSyncError> {
        // Link-id order is the order offers were attached during the sync.
        let rows = offer_fetch::Entity::find()
            .filter(offer_fetch::Column::FetchId.eq(fetch_id))
            .order_by_asc(offer_fetch::Column::Id)
            .find_also_related(offers::Entity)
            .all(&self.db)
            .await?;
        Ok(rows
            .into_iter()
            .filter_map(|(_, offer)| offer.map(|o| o.price))
            .collect())
    }

    async fn load_summary(&self, fetch_id: Uuid) -> Result<Option<OfferSummary>, OfferSyncError> {
        let row = offer_summaries::Entity::find_by_id(fetch_id)
            .find_also_related(fetches::Entity)
            .one(&self.db)
            .await?;
        Ok(row.map(|(summary, fetch)| OfferSummary {
            time: fetch.map(|f| f.time).unwrap_or_default(),
            min: summary.min_price,
            max: summary.max_price,
            avg: summary.avg_price,
            median: summary.median_price,
            count: summary.offer_count,
        }))
    }

    async fn save_summary(
        &self,
        fetch_id: Uuid,
        summary: &OfferSummary,
    ) -> Result<(), OfferSyncError> {
        offer_summaries::Entity::insert(offer_summaries::ActiveModel {
            fetch_id: Set(fetch_id),
            min_price: Set(summary.min),
            max_price: Set(summary.max),
            avg_price: Set(summary.avg),
            median_price: Set(summary.median),
            offer_count: Set(summary.count),
        })
        .on_conflict(
            OnConflict::column(offer_summaries::Column::FetchId)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(&self.db)
        .await?;
        Ok(())
    }
}
