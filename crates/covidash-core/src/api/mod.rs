//! REST API client module for covid-api.com.
//!
//! `ApiClient` fetches the worldwide totals, the region list and the
//! per-province reports for one country. The dashboard talks to it through
//! the `ReportSource` trait so tests can substitute a fake.

pub mod client;
pub mod error;

pub use client::{ApiClient, ReportSource};
pub use error::ApiError;
