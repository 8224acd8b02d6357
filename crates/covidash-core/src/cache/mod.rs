//! Local caching module.
//!
//! `CacheManager` wraps an expensive async fetch with a time-to-live so that
//! repeat calls inside the freshness window are served from durable storage
//! without the caller knowing. Entries are stored as JSON envelopes
//! `{ "value": ..., "storedAt": <unix millis> }` in a `KvStore`.
//!
//! Storage faults (corrupt records, failed writes) never reach the caller;
//! only the fetcher's own error does.

pub mod clock;
pub mod manager;
pub mod store;

pub use clock::{Clock, SystemClock};
pub use manager::{CacheManager, CachedData};
pub use store::{FileStore, KvStore, MemoryStore, StoreError};

/// Cache name for the deduplicated region list.
pub const REGIONS_CACHE_KEY: &str = "covid_regions_cache_v2";

/// Cache name for the worldwide totals.
pub const SUMMARY_CACHE_KEY: &str = "covid_reports_total_cache";
