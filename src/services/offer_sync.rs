//! Offer synchronizer
//!
//! Keeps one product's offer snapshot aligned with the upstream API. When
//! upstream has no record of the product yet it self-heals: register, then
//! retry the fetch exactly once. A second "unknown product" reply is a hard
//! failure, which bounds the retry depth if upstream is inconsistent.

use std::sync::Arc;

use tracing::{debug, info};

use crate::clock::Clock;
use crate::error::OfferSyncError;
use crate::models::{Offer, Product};
use crate::services::token_cache::TokenCache;
use crate::services::upstream::{OffersReply, UpstreamApi};
use crate::store::SnapshotStore;

pub struct OfferSynchronizer {
    upstream: Arc<dyn UpstreamApi>,
    tokens: Arc<TokenCache>,
    store: Arc<dyn SnapshotStore>,
    clock: Arc<dyn Clock>,
}

impl OfferSynchronizer {
    pub fn new(
        upstream: Arc<dyn UpstreamApi>,
        tokens: Arc<TokenCache>,
        store: Arc<dyn SnapshotStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            upstream,
            tokens,
            store,
            clock,
        }
    }

    /// Submit the product's public fields to the upstream registration
    /// endpoint. The caller decides whether to retry on failure.
    pub async fn register_product(&self, product: &Product) -> Result<(), OfferSyncError> {
        let token = self.tokens.get_valid_token().await?;
        self.upstream
            .register_product(&token.token, product)
            .await?;
        info!(product_id = %product.id, "product registered upstream");
        Ok(())
    }

    /// Fetch the product's current offers, self-healing on an "unknown
    /// product" reply, and persist them as a new fetch snapshot.
    pub async fn sync(&self, product: &Product) -> Result<Vec<Offer>, OfferSyncError> {
        info!(product_id = %product.id, "syncing offers");

        let token = self.tokens.get_valid_token().await?;
        let reply = self
            .upstream
            .fetch_offers(&token.token, product.id)
            .await?;

        let dtos = match reply {
            OffersReply::Offers(dtos) => dtos,
            OffersReply::ProductUnknown => {
                info!(
                    product_id = %product.id,
                    "product unknown upstream, registering and retrying"
                );
                self.register_product(product).await?;

                let token = self.tokens.get_valid_token().await?;
                match self
                    .upstream
                    .fetch_offers(&token.token, product.id)
                    .await?
                {
                    OffersReply::Offers(dtos) => dtos,
                    OffersReply::ProductUnknown => {
                        return Err(OfferSyncError::OffersFetch(format!(
                            "product {} still unknown upstream after registration",
                            product.id
                        )));
                    }
                }
            }
        };

        let offers: Vec<Offer> = dtos.into_iter().map(Offer::from).collect();

        let fetch = self
            .store
            .record_fetch(product.id, self.clock.now_unix(), &offers)
            .await?;

        debug!(
            fetch_id = %fetch.id,
            count = offers.len(),
            "offer snapshot recorded"
        );

        Ok(offers)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use jsonwebtoken::{Algorithm, EncodingKey, Header};
    use parking_lot::Mutex;
    use uuid::Uuid;

    use super::*;
    use crate::clock::FixedClock;
    use crate::services::upstream::OfferDto;
    use crate::store::memory::{InMemorySnapshotStore, InMemoryTokenStore};

    fn bearer_token() -> String {
        jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &serde_json::json!({"expires": i64::MAX}),
            &EncodingKey::from_secret(b"upstream-secret"),
        )
        .unwrap()
    }

    /// Upstream whose fetch-offers replies are scripted in order.
    struct ScriptedUpstream {
        replies: Mutex<Vec<Result<OffersReply, OfferSyncError>>>,
        fetch_calls: AtomicUsize,
        register_calls: AtomicUsize,
        register_result: Result<(), OfferSyncError>,
    }

    impl ScriptedUpstream {
        fn new(replies: Vec<Result<OffersReply, OfferSyncError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies),
                fetch_calls: AtomicUsize::new(0),
                register_calls: AtomicUsize::new(0),
                register_result: Ok(()),
            })
        }

        fn failing_registration(replies: Vec<Result<OffersReply, OfferSyncError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies),
                fetch_calls: AtomicUsize::new(0),
                register_calls: AtomicUsize::new(0),
                register_result: Err(OfferSyncError::ProductRegistration(
                    "registration endpoint returned 500".into(),
                )),
            })
        }
    }

    #[async_trait]
    impl UpstreamApi for ScriptedUpstream {
        async fn authenticate(&self) -> Result<String, OfferSyncError> {
            Ok(bearer_token())
        }

        async fn register_product(
            &self,
            _bearer: &str,
            _product: &Product,
        ) -> Result<(), OfferSyncError> {
            self.register_calls.fetch_add(1, Ordering::SeqCst);
            self.register_result.clone()
        }

        async fn fetch_offers(
            &self,
            _bearer: &str,
            _product_id: Uuid,
        ) -> Result<OffersReply, OfferSyncError> {
            self.fetch_calls.fetch_add(1, Ordering::SeqCst);
            let mut replies = self.replies.lock();
            assert!(!replies.is_empty(), "unexpected fetch_offers call");
            replies.remove(0)
        }
    }

    fn dto(id: Uuid, price: i64, stock: i32) -> OfferDto {
        OfferDto {
            id,
            price,
            items_in_stock: stock,
        }
    }

    fn offers_reply(prices: &[i64]) -> Result<OffersReply, OfferSyncError> {
        Ok(OffersReply::Offers(
            prices.iter().map(|p| dto(Uuid::new_v4(), *p, 1)).collect(),
        ))
    }

    fn product() -> Product {
        Product {
            id: Uuid::new_v4(),
            name: "Widget".into(),
            description: "A widget".into(),
        }
    }

    fn synchronizer(
        upstream: Arc<ScriptedUpstream>,
        store: Arc<InMemorySnapshotStore>,
        clock: Arc<FixedClock>,
    ) -> OfferSynchronizer {
        let tokens = Arc::new(TokenCache::new(
            upstream.clone(),
            Arc::new(InMemoryTokenStore::default()),
            clock.clone(),
        ));
        OfferSynchronizer::new(upstream, tokens, store, clock)
    }

    #[tokio::test]
    async fn sync_records_a_snapshot_at_the_clock_time() {
        let upstream = ScriptedUpstream::new(vec![offers_reply(&[10, 20, 30])]);
        let store = Arc::new(InMemorySnapshotStore::default());
        let clock = FixedClock::at(100.0);
        let product = product();
        store.insert_product(&product).await.unwrap();

        let sync = synchronizer(upstream.clone(), store.clone(), clock);
        let offers = sync.sync(&product).await.unwrap();

        assert_eq!(offers.len(), 3);
        let fetches = store
            .fetches_in_range(product.id, 0.0, 1_000.0)
            .await
            .unwrap();
        assert_eq!(fetches.len(), 1);
        assert_eq!(fetches[0].time, 100.0);
        assert_eq!(
            store.offer_prices(fetches[0].id).await.unwrap(),
            vec![10, 20, 30]
        );
        assert_eq!(upstream.register_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unknown_product_is_registered_and_the_fetch_retried_once() {
        let upstream = ScriptedUpstream::new(vec![
            Ok(OffersReply::ProductUnknown),
            offers_reply(&[42]),
        ]);
        let store = Arc::new(InMemorySnapshotStore::default());
        let product = product();
        store.insert_product(&product).await.unwrap();

        let sync = synchronizer(upstream.clone(), store.clone(), FixedClock::at(100.0));
        let offers = sync.sync(&product).await.unwrap();

        assert_eq!(offers.len(), 1);
        assert_eq!(offers[0].price, 42);
        assert_eq!(upstream.register_calls.load(Ordering::SeqCst), 1);
        assert_eq!(upstream.fetch_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn second_unknown_reply_is_a_hard_failure_without_a_third_fetch() {
        let upstream = ScriptedUpstream::new(vec![
            Ok(OffersReply::ProductUnknown),
            Ok(OffersReply::ProductUnknown),
        ]);
        let store = Arc::new(InMemorySnapshotStore::default());
        let product = product();
        store.insert_product(&product).await.unwrap();

        let sync = synchronizer(upstream.clone(), store.clone(), FixedClock::at(100.0));
        let err = sync.sync(&product).await.unwrap_err();

        assert!(matches!(err, OfferSyncError::OffersFetch(_)));
        assert_eq!(upstream.register_calls.load(Ordering::SeqCst), 1);
        assert_eq!(upstream.fetch_calls.load(Ordering::SeqCst), 2);

        // failed sync leaves no snapshot behind
        let fetches = store
            .fetches_in_range(product.id, 0.0, 1_000.0)
            .await
            .unwrap();
        assert!(fetches.is_empty());
    }

    #[tokio::test]
    async fn registration_failure_aborts_the_sync() {
        let upstream =
            ScriptedUpstream::failing_registration(vec![Ok(OffersReply::ProductUnknown)]);
        let store = Arc::new(InMemorySnapshotStore::default());
        let product = product();
        store.insert_product(&product).await.unwrap();

        let sync = synchronizer(upstream.clone(), store.clone(), FixedClock::at(100.0));
        let err = sync.sync(&product).await.unwrap_err();

        assert!(matches!(err, OfferSyncError::ProductRegistration(_)));
        assert_eq!(upstream.fetch_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn resyncing_an_offer_updates_it_in_place() {
        let offer_id = Uuid::new_v4();
        let upstream = ScriptedUpstream::new(vec![
            Ok(OffersReply::Offers(vec![dto(offer_id, 10, 3)])),
            Ok(OffersReply::Offers(vec![dto(offer_id, 25, 8)])),
        ]);
        let store = Arc::new(InMemorySnapshotStore::default());
        let clock = FixedClock::at(100.0);
        let product = product();
        store.insert_product(&product).await.unwrap();

        let sync = synchronizer(upstream, store.clone(), clock.clone());
        sync.sync(&product).await.unwrap();
        clock.set(200.0);
        sync.sync(&product).await.unwrap();

        assert_eq!(store.offer_count(), 1);
        let stored = store.offer(offer_id).unwrap();
        assert_eq!(stored.price, 25);
        assert_eq!(stored.items_in_stock, 8);

        // both fetches reference the same offer row
        let fetches = store
            .fetches_in_range(product.id, 0.0, 1_000.0)
            .await
            .unwrap();
        assert_eq!(fetches.len(), 2);
        for fetch in fetches {
            assert_eq!(store.offer_prices(fetch.id).await.unwrap(), vec![25]);
        }
    }
}
