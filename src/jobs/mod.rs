pub mod offer_sync_job;
