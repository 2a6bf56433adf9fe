//! Expiry-aware upstream token cache
//!
//! Hands callers a token valid at the moment of return while issuing at most
//! one authenticate call to the upstream authority at a time. Refresh is a
//! critical section behind an internal mutex; callers that blocked behind a
//! refresh re-validate the cache and reuse the fresh token without another
//! network call.
//!
//! Scope is one service instance. Multiple instances sharing a persisted
//! token store can still race refreshes against each other; coordinating
//! that is out of scope here.

use std::sync::Arc;

use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::error::OfferSyncError;
use crate::models::AuthToken;
use crate::services::upstream::UpstreamApi;
use crate::store::TokenStore;

/// Expiry claim embedded in the upstream token payload.
#[derive(Debug, Deserialize)]
struct ExpiryClaims {
    expires: i64,
}

pub struct TokenCache {
    upstream: Arc<dyn UpstreamApi>,
    store: Arc<dyn TokenStore>,
    clock: Arc<dyn Clock>,
    refresh_lock: Mutex<()>,
}

impl TokenCache {
    pub fn new(
        upstream: Arc<dyn UpstreamApi>,
        store: Arc<dyn TokenStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            upstream,
            store,
            clock,
            refresh_lock: Mutex::new(()),
        }
    }

    /// Return a token guaranteed valid at the moment of return.
    ///
    /// The token can still expire between return and use; the caller's own
    /// request failing then triggers a fresh cycle on the next call. No
    /// failure is retried internally.
    pub async fn get_valid_token(&self) -> Result<AuthToken, OfferSyncError> {
        if let Some(token) = self.store.load().await? {
            if token.is_valid_at(self.clock.now_unix()) {
                return Ok(token);
            }
        }

        // One refresh in flight at a time; everyone else queues here.
        let _refresh = self.refresh_lock.lock().await;

        // A refresh that completed while we waited is reused as-is.
        if let Some(token) = self.store.load().await? {
            if token.is_valid_at(self.clock.now_unix()) {
                return Ok(token);
            }
        }

        info!("no valid cached token, requesting a new one");

        let access_token = self.upstream.authenticate().await?;
        let expires = decode_expiry_claim(&access_token)?;

        let token = AuthToken {
            token: access_token,
            expires,
        };

        debug!(expires = token.expires, "storing refreshed token");
        self.store.replace(&token).await?;

        Ok(token)
    }
}

/// Decode the `expires` claim from the token payload without verifying the
/// signature; the signing key belongs to the upstream authority, not to this
/// service. Decode failure is distinct from authentication failure.
fn decode_expiry_claim(token: &str) -> Result<i64, OfferSyncError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.required_spec_claims.clear();

    let data = jsonwebtoken::decode::<ExpiryClaims>(
        token,
        &DecodingKey::from_secret(&[]),
        &validation,
    )
    .map_err(|e| OfferSyncError::TokenDecode(e.to_string()))?;

    Ok(data.claims.expires)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use jsonwebtoken::{EncodingKey, Header};
    use uuid::Uuid;

    use super::*;
    use crate::clock::FixedClock;
    use crate::models::Product;
    use crate::services::upstream::OffersReply;
    use crate::store::memory::InMemoryTokenStore;

    fn make_token(expires: i64) -> String {
        let claims = serde_json::json!({
            "token": "f276da53-f937-477e-a4a1-8e9968cb4f23",
            "expires": expires,
        });
        jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"upstream-secret"),
        )
        .unwrap()
    }

    struct CountingUpstream {
        auth_calls: AtomicUsize,
        issued_expiry: i64,
    }

    impl CountingUpstream {
        fn issuing(expires: i64) -> Arc<Self> {
            Arc::new(Self {
                auth_calls: AtomicUsize::new(0),
                issued_expiry: expires,
            })
        }
    }

    #[async_trait]
    impl UpstreamApi for CountingUpstream {
        async fn authenticate(&self) -> Result<String, OfferSyncError> {
            self.auth_calls.fetch_add(1, Ordering::SeqCst);
            // Yield so concurrent callers pile up on the refresh lock
            tokio::task::yield_now().await;
            Ok(make_token(self.issued_expiry))
        }

        async fn register_product(
            &self,
            _bearer: &str,
            _product: &Product,
        ) -> Result<(), OfferSyncError> {
            unreachable!("token cache never registers products")
        }

        async fn fetch_offers(
            &self,
            _bearer: &str,
            _product_id: Uuid,
        ) -> Result<OffersReply, OfferSyncError> {
            unreachable!("token cache never fetches offers")
        }
    }

    fn cache_with(
        upstream: Arc<CountingUpstream>,
        store: Arc<InMemoryTokenStore>,
        clock: Arc<FixedClock>,
    ) -> Arc<TokenCache> {
        Arc::new(TokenCache::new(upstream, store, clock))
    }

    #[test]
    fn expiry_claim_is_decoded() {
        let token = make_token(1_499_999_999);
        assert_eq!(decode_expiry_claim(&token).unwrap(), 1_499_999_999);
    }

    #[test]
    fn malformed_token_is_a_decode_error() {
        let err = decode_expiry_claim("invalid_token").unwrap_err();
        assert!(matches!(err, OfferSyncError::TokenDecode(_)));
    }

    #[test]
    fn missing_expires_claim_is_a_decode_error() {
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &serde_json::json!({"sub": "nobody"}),
            &EncodingKey::from_secret(b"upstream-secret"),
        )
        .unwrap();
        let err = decode_expiry_claim(&token).unwrap_err();
        assert!(matches!(err, OfferSyncError::TokenDecode(_)));
    }

    #[tokio::test]
    async fn valid_cached_token_is_served_without_refresh() {
        let upstream = CountingUpstream::issuing(0);
        let store = Arc::new(InMemoryTokenStore::default());
        store
            .replace(&AuthToken {
                token: "cached".into(),
                expires: 200,
            })
            .await
            .unwrap();

        let cache = cache_with(upstream.clone(), store, FixedClock::at(100.0));
        let token = cache.get_valid_token().await.unwrap();

        assert_eq!(token.token, "cached");
        assert_eq!(upstream.auth_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn token_expiring_exactly_now_triggers_exactly_one_refresh() {
        let upstream = CountingUpstream::issuing(500);
        let store = Arc::new(InMemoryTokenStore::default());
        store
            .replace(&AuthToken {
                token: "stale".into(),
                expires: 100,
            })
            .await
            .unwrap();

        let cache = cache_with(upstream.clone(), store, FixedClock::at(100.0));
        let token = cache.get_valid_token().await.unwrap();

        assert_eq!(token.expires, 500);
        assert_ne!(token.token, "stale");
        assert_eq!(upstream.auth_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn concurrent_callers_share_a_single_refresh() {
        let upstream = CountingUpstream::issuing(500);
        let store = Arc::new(InMemoryTokenStore::default());
        let cache = cache_with(upstream.clone(), store, FixedClock::at(100.0));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move { cache.get_valid_token().await }));
        }

        for handle in handles {
            let token = handle.await.unwrap().unwrap();
            assert_eq!(token.expires, 500);
        }

        assert_eq!(upstream.auth_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn authentication_failure_propagates_unchanged() {
        struct RejectingUpstream;

        #[async_trait]
        impl UpstreamApi for RejectingUpstream {
            async fn authenticate(&self) -> Result<String, OfferSyncError> {
                Err(OfferSyncError::AuthenticationFailed(
                    "Invalid secret".into(),
                ))
            }

            async fn register_product(
                &self,
                _bearer: &str,
                _product: &Product,
            ) -> Result<(), OfferSyncError> {
                unreachable!()
            }

            async fn fetch_offers(
                &self,
                _bearer: &str,
                _product_id: Uuid,
            ) -> Result<OffersReply, OfferSyncError> {
                unreachable!()
            }
        }

        let cache = TokenCache::new(
            Arc::new(RejectingUpstream),
            Arc::new(InMemoryTokenStore::default()),
            FixedClock::at(100.0),
        );

        let err = cache.get_valid_token().await.unwrap_err();
        assert_eq!(
            err,
            OfferSyncError::AuthenticationFailed("Invalid secret".into())
        );
    }
}
