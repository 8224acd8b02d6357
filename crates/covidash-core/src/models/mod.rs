//! Data models for covid-api.com entities.
//!
//! - `GlobalStats`: worldwide totals from `/reports/total`
//! - `Region`: a country entry from `/regions`, unique by ISO code
//! - `CountryReport`, `ReportRegion`, `City`: per-province reports for one
//!   country from `/reports?iso=XXX`

pub mod region;
pub mod report;
pub mod summary;

pub use region::{dedup_by_iso, Region, RegionDedup};
pub use report::{City, CountryReport, FatalityLevel, ReportRegion};
pub use summary::GlobalStats;

use serde::Deserialize;

/// Every covid-api.com endpoint wraps its payload in `{ "data": ... }`.
#[derive(Debug, Deserialize)]
pub struct DataEnvelope<T> {
    pub data: T,
}
