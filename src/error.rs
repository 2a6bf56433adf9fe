//! Error taxonomy for the offer synchronization core
//!
//! Every failure leaving the token cache, the synchronizer or the price
//! history engine is one of these kinds, so callers can map them to an
//! external response without string matching.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum OfferSyncError {
    /// Upstream rejected our credentials or returned a non-success auth status
    AuthenticationFailed(String),
    /// The token payload was malformed or missing the `expires` claim
    TokenDecode(String),
    /// Generic transport failure talking to the upstream API
    ApiRequest(String),
    /// Fetching offers for a product failed (transport, decode, or a product
    /// still unknown upstream after re-registration)
    OffersFetch(String),
    /// Registering a product upstream failed
    ProductRegistration(String),
    /// A referenced entity (product, baseline fetch) does not exist
    EntityNotFound(String),
    /// Caller passed a range with `from > to`
    InvalidTimeRange(String),
    /// A price diff is mathematically undefined for the requested range
    /// (same fetch at both ends, or a zero baseline statistic)
    UndefinedPriceChange(String),
    /// Persistence read/write error
    Storage(String),
}

impl fmt::Display for OfferSyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OfferSyncError::AuthenticationFailed(msg) => {
                write!(f, "Authentication failed: {}", msg)
            }
            OfferSyncError::TokenDecode(msg) => write!(f, "Token decode failed: {}", msg),
            OfferSyncError::ApiRequest(msg) => write!(f, "API request failed: {}", msg),
            OfferSyncError::OffersFetch(msg) => write!(f, "Offers fetch failed: {}", msg),
            OfferSyncError::ProductRegistration(msg) => {
                write!(f, "Product registration failed: {}", msg)
            }
            OfferSyncError::EntityNotFound(msg) => write!(f, "Entity not found: {}", msg),
            OfferSyncError::InvalidTimeRange(msg) => write!(f, "Invalid time range: {}", msg),
            OfferSyncError::UndefinedPriceChange(msg) => {
                write!(f, "Undefined price change: {}", msg)
            }
            OfferSyncError::Storage(msg) => write!(f, "Storage error: {}", msg),
        }
    }
}

impl std::error::Error for OfferSyncError {}

impl From<sea_orm::DbErr> for OfferSyncError {
    fn from(err: sea_orm::DbErr) -> Self {
        OfferSyncError::Storage(err.to_string())
    }
}
