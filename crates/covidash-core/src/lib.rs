//! Core library for covidash.
//!
//! Everything here is presentation-agnostic: the terminal front-end (and any
//! other renderer) consumes the state exposed by [`dashboard::Dashboard`].
//!
//! - `api`: covid-api.com client and transport errors
//! - `cache`: TTL read-through cache over a durable key-value store
//! - `search`: hierarchical location index and the combobox state machine
//! - `models`: report, region and summary types
//! - `dashboard`: page-level controller tying the pieces together

pub mod api;
pub mod cache;
pub mod config;
pub mod dashboard;
pub mod models;
pub mod search;
pub mod utils;

pub use api::{ApiClient, ApiError, ReportSource};
pub use cache::{CacheManager, CachedData};
pub use config::Config;
pub use dashboard::{Dashboard, DashboardSettings, SearchTarget, Selection};
