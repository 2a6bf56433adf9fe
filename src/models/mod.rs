pub mod offer;
pub mod summary;

pub use offer::{AuthToken, Offer, Product};
pub use summary::{OfferPriceDiff, OfferSummary};
