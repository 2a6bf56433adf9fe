//! Upstream price-comparison API client
//!
//! Thin transport wrapper over the three remote operations: authenticate,
//! register-product and fetch-offers. The offers response is decoded as a
//! tagged variant: either the offer array or the structured "product does
//! not exist" marker; anything else is a decode error, never a silent
//! fallthrough.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};
use uuid::Uuid;

use crate::error::OfferSyncError;
use crate::models::{Offer, Product};

/// Body marker upstream uses to signal an unregistered product.
pub const PRODUCT_NOT_FOUND_MARKER: &str = "Product does not exist";

/// Request timeout for all upstream calls
const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Deserialize)]
pub struct OfferDto {
    pub id: Uuid,
    pub price: i64,
    pub items_in_stock: i32,
}

impl From<OfferDto> for Offer {
    fn from(dto: OfferDto) -> Self {
        Offer {
            id: dto.id,
            price: dto.price,
            items_in_stock: dto.items_in_stock,
        }
    }
}

/// Outcome of a fetch-offers call that reached upstream and produced a
/// recognized body.
#[derive(Debug)]
pub enum OffersReply {
    Offers(Vec<OfferDto>),
    /// Upstream has no record of the product; triggers the self-heal path
    ProductUnknown,
}

/// The three remote operations the core consumes.
#[async_trait]
pub trait UpstreamApi: Send + Sync {
    /// Returns the raw access token string on success.
    async fn authenticate(&self) -> Result<String, OfferSyncError>;

    async fn register_product(
        &self,
        bearer: &str,
        product: &Product,
    ) -> Result<(), OfferSyncError>;

    async fn fetch_offers(
        &self,
        bearer: &str,
        product_id: Uuid,
    ) -> Result<OffersReply, OfferSyncError>;
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OffersBody {
    Offers(Vec<OfferDto>),
    Marker(ErrorBody),
}

#[derive(Debug, Serialize)]
struct RegisterProductDto<'a> {
    id: Uuid,
    name: &'a str,
    description: &'a str,
}

#[derive(Clone)]
pub struct PriceApiClient {
    client: Client,
    base_url: String,
    token_secret: String,
}

impl PriceApiClient {
    pub fn new(base_url: String, token_secret: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()
                .unwrap(),
            base_url,
            token_secret,
        }
    }
}

#[async_trait]
impl UpstreamApi for PriceApiClient {
    async fn authenticate(&self) -> Result<String, OfferSyncError> {
        let url = format!("{}/auth", self.base_url);
        debug!(url = %url, "requesting new token");

        let response = self
            .client
            .post(&url)
            .header("Bearer", &self.token_secret)
            .send()
            .await
            .map_err(|e| OfferSyncError::ApiRequest(format!("auth request failed: {}", e)))?;

        let status = response.status();

        // A 400 is upstream rejecting the pre-shared secret, not transport
        if status == StatusCode::BAD_REQUEST {
            let detail = response
                .json::<ErrorBody>()
                .await
                .map(|body| body.detail)
                .unwrap_or_else(|_| "credentials rejected".to_string());
            error!(detail = %detail, "upstream rejected authentication");
            return Err(OfferSyncError::AuthenticationFailed(detail));
        }

        if !status.is_success() {
            return Err(OfferSyncError::ApiRequest(format!(
                "auth endpoint returned {}",
                status
            )));
        }

        let body: AuthResponse = response.json().await.map_err(|e| {
            OfferSyncError::ApiRequest(format!("response does not contain an access token: {}", e))
        })?;

        Ok(body.access_token)
    }

    async fn register_product(
        &self,
        bearer: &str,
        product: &Product,
    ) -> Result<(), OfferSyncError> {
        let url = format!("{}/products/register", self.base_url);
        debug!(url = %url, product_id = %product.id, "registering product upstream");

        let response = self
            .client
            .post(&url)
            .header("Bearer", bearer)
            .json(&RegisterProductDto {
                id: product.id,
                name: &product.name,
                description: &product.description,
            })
            .send()
            .await
            .map_err(|e| {
                OfferSyncError::ProductRegistration(format!("registration request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %body, "unsuccessful product registration");
            return Err(OfferSyncError::ProductRegistration(format!(
                "registration endpoint returned {}",
                status
            )));
        }

        Ok(())
    }

    async fn fetch_offers(
        &self,
        bearer: &str,
        product_id: Uuid,
    ) -> Result<OffersReply, OfferSyncError> {
        let url = format!("{}/products/{}/offers", self.base_url, product_id);
        debug!(url = %url, "fetching offers");

        let response = self
            .client
            .get(&url)
            .header("Bearer", bearer)
            .send()
            .await
            .map_err(|e| OfferSyncError::OffersFetch(format!("offers request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| OfferSyncError::OffersFetch(format!("reading offers body failed: {}", e)))?;

        parse_offers_body(status, &body)
    }
}

/// Decode the offers body. The "not found" signal is a body-level marker, so
/// the body is parsed regardless of the HTTP status.
fn parse_offers_body(status: StatusCode, body: &str) -> Result<OffersReply, OfferSyncError> {
    match serde_json::from_str::<OffersBody>(body) {
        Ok(OffersBody::Offers(offers)) => Ok(OffersReply::Offers(offers)),
        Ok(OffersBody::Marker(marker)) if marker.detail == PRODUCT_NOT_FOUND_MARKER => {
            Ok(OffersReply::ProductUnknown)
        }
        Ok(OffersBody::Marker(marker)) => Err(OfferSyncError::OffersFetch(format!(
            "upstream reported: {}",
            marker.detail
        ))),
        Err(_) if !status.is_success() => Err(OfferSyncError::OffersFetch(format!(
            "offers endpoint returned {}",
            status
        ))),
        Err(e) => Err(OfferSyncError::OffersFetch(format!(
            "unrecognized offers response: {}",
            e
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offers_array_decodes() {
        let body = r#"[{"id":"f276da53-f937-477e-a4a1-8e9968cb4f23","price":120,"items_in_stock":4}]"#;
        let reply = parse_offers_body(StatusCode::OK, body).unwrap();
        match reply {
            OffersReply::Offers(offers) => {
                assert_eq!(offers.len(), 1);
                assert_eq!(offers[0].price, 120);
                assert_eq!(offers[0].items_in_stock, 4);
            }
            other => panic!("expected offers, got {:?}", other),
        }
    }

    #[test]
    fn empty_offers_array_decodes() {
        let reply = parse_offers_body(StatusCode::OK, "[]").unwrap();
        assert!(matches!(reply, OffersReply::Offers(offers) if offers.is_empty()));
    }

    #[test]
    fn not_found_marker_is_recognized() {
        let body = r#"{"detail": "Product does not exist"}"#;
        let reply = parse_offers_body(StatusCode::NOT_FOUND, body).unwrap();
        assert!(matches!(reply, OffersReply::ProductUnknown));
    }

    #[test]
    fn other_marker_detail_is_an_error() {
        let body = r#"{"detail": "Rate limit exceeded"}"#;
        let err = parse_offers_body(StatusCode::OK, body).unwrap_err();
        assert!(matches!(err, OfferSyncError::OffersFetch(msg) if msg.contains("Rate limit")));
    }

    #[test]
    fn unrecognized_shape_is_a_decode_error() {
        let err = parse_offers_body(StatusCode::OK, r#"{"offers": 7}"#).unwrap_err();
        assert!(matches!(err, OfferSyncError::OffersFetch(_)));
    }

    #[test]
    fn non_success_status_with_garbage_body_reports_the_status() {
        let err = parse_offers_body(StatusCode::BAD_GATEWAY, "<html>").unwrap_err();
        assert!(matches!(err, OfferSyncError::OffersFetch(msg) if msg.contains("502")));
    }
}
