// src/lib.rs

pub mod entities {
    pub mod prelude;

    pub mod auth_tokens;
    pub mod fetches;
    pub mod offer_fetch;
    pub mod offer_summaries;
    pub mod offers;
    pub mod products;
}

pub mod services {
    pub mod offer_sync;
    pub mod price_history;
    pub mod token_cache;
    pub mod upstream;
}

pub mod clock;
pub mod config;
pub mod error;
pub mod jobs;
pub mod models;
pub mod store;
