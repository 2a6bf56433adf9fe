pub use super::auth_tokens::Entity as AuthTokens;
pub use super::fetches::Entity as Fetches;
pub use super::offer_fetch::Entity as OfferFetch;
pub use super::offer_summaries::Entity as OfferSummaries;
pub use super::offers::Entity as Offers;
pub use super::products::Entity as Products;
